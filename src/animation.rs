//! Keyframe animation: clips, tracks and a blending mixer.
//!
//! A glTF animation becomes an [`AnimationClip`]: a named list of [`Track`]s,
//! each animating the translation, rotation or scale of one node. The
//! [`AnimationMixer`] owns one action per clip. Actions can be played, reset
//! and faded against each other; every frame the mixer advances their local
//! time and fade weights and writes the weighted blend into a [`NodeTree`].
//!
//! Blending follows the usual scene-graph mixer rules:
//!
//! - each animated property accumulates the weighted samples of all running
//!   actions that touch it
//! - if the accumulated weight is below one, the remainder is filled with the
//!   node's rest pose, so a fully faded-out property snaps back to rest
//! - a completed fade-out to zero disables its action
//!
//! Clips always loop.

use cgmath::{InnerSpace, VectorSpace};

use crate::data_structures::{instance::Instance, scene_graph::NodeTree};

type Vec3 = cgmath::Vector3<f32>;
type Quat = cgmath::Quaternion<f32>;

#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// Hermite spline. Each key stores `[in_tangent, value, out_tangent]`.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(interpolation: gltf::animation::Interpolation) -> Self {
        match interpolation {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

/// A sampled value of a single track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

#[derive(Clone, Debug)]
pub struct Track {
    pub node: usize,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
    pub interpolation: Interpolation,
}

impl Track {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Value of the track at `time`, clamped to the first and last key.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let cursor = Cursor::locate(&self.timestamps, time)?;
        match &self.keyframes {
            Keyframes::Translation(values) => {
                sample_values(values, cursor, self.interpolation).map(Sample::Translation)
            }
            Keyframes::Rotation(values) => sample_values(values, cursor, self.interpolation)
                .map(|q| Sample::Rotation(q.normalize())),
            Keyframes::Scale(values) => {
                sample_values(values, cursor, self.interpolation).map(Sample::Scale)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::duration).fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Cursor {
    Key(usize),
    Between { index: usize, factor: f32, span: f32 },
}

impl Cursor {
    fn locate(timestamps: &[f32], time: f32) -> Option<Self> {
        let last = timestamps.len().checked_sub(1)?;
        if time <= timestamps[0] {
            return Some(Cursor::Key(0));
        }
        if time >= timestamps[last] {
            return Some(Cursor::Key(last));
        }
        let next = timestamps.partition_point(|&t| t <= time);
        let index = next - 1;
        let span = timestamps[next] - timestamps[index];
        if span <= f32::EPSILON {
            return Some(Cursor::Key(next));
        }
        Some(Cursor::Between {
            index,
            factor: (time - timestamps[index]) / span,
            span,
        })
    }
}

trait Animatable: Copy {
    fn interpolate(self, other: Self, t: f32) -> Self;
    fn scaled(self, factor: f32) -> Self;
    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32) -> Self;
}

impl Animatable for Vec3 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }

    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32) -> Self {
        let (a, b, c, d) = hermite_basis(t);
        p0 * a + m0 * b + p1 * c + m1 * d
    }
}

impl Animatable for Quat {
    fn interpolate(self, other: Self, t: f32) -> Self {
        slerp_shortest(self, other, t)
    }

    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32) -> Self {
        let (a, b, c, d) = hermite_basis(t);
        (p0 * a + m0 * b + p1 * c + m1 * d).normalize()
    }
}

fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Spherical interpolation that always takes the shorter arc.
pub fn slerp_shortest(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    a.slerp(b, t)
}

fn sample_values<T: Animatable>(values: &[T], cursor: Cursor, interpolation: Interpolation) -> Option<T> {
    match interpolation {
        Interpolation::CubicSpline => match cursor {
            Cursor::Key(i) => values.get(3 * i + 1).copied(),
            Cursor::Between {
                index,
                factor,
                span,
            } => {
                let p0 = *values.get(3 * index + 1)?;
                let m0 = *values.get(3 * index + 2)?;
                let m1 = *values.get(3 * (index + 1))?;
                let p1 = *values.get(3 * (index + 1) + 1)?;
                // tangents are stored per second, the basis works per key span
                Some(T::hermite(p0, m0.scaled(span), p1, m1.scaled(span), factor))
            }
        },
        Interpolation::Step => match cursor {
            Cursor::Key(i) | Cursor::Between { index: i, .. } => values.get(i).copied(),
        },
        Interpolation::Linear => match cursor {
            Cursor::Key(i) => values.get(i).copied(),
            Cursor::Between { index, factor, .. } => {
                let a = *values.get(index)?;
                let b = *values.get(index + 1)?;
                Some(a.interpolate(b, factor))
            }
        },
    }
}


/// Handle of an action inside its [`AnimationMixer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fade {
    start: f32,
    end: f32,
    from: f32,
    to: f32,
}

impl Fade {
    fn value_at(&self, time: f32) -> f32 {
        if time >= self.end {
            return self.to;
        }
        if time <= self.start {
            return self.from;
        }
        let t = (time - self.start) / (self.end - self.start);
        self.from + (self.to - self.from) * t
    }
}

/// Playback state of one clip.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationAction {
    clip: usize,
    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    enabled: bool,
    running: bool,
    paused: bool,
    fade: Option<Fade>,
    effective_weight: f32,
}

impl AnimationAction {
    fn new(clip: usize) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            enabled: true,
            running: false,
            paused: false,
            fade: None,
            effective_weight: 0.0,
        }
    }

    pub fn clip(&self) -> usize {
        self.clip
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Weight used for the last blend, after fading.
    pub fn effective_weight(&self) -> f32 {
        self.effective_weight
    }

    fn update_weight(&mut self, mixer_time: f32) {
        if !self.enabled {
            self.effective_weight = 0.0;
            return;
        }
        let mut weight = self.weight;
        if let Some(fade) = self.fade {
            let value = fade.value_at(mixer_time);
            weight *= value;
            if mixer_time >= fade.end {
                self.fade = None;
                if fade.to == 0.0 {
                    self.enabled = false;
                }
            }
        }
        self.effective_weight = weight;
    }
}

/// Plays and blends the clips of one model.
#[derive(Clone, Debug, Default)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    actions: Vec<AnimationAction>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        let actions = (0..clips.len()).map(AnimationAction::new).collect();
        Self {
            clips,
            actions,
            time: 0.0,
        }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Global mixer time in seconds; fades are scheduled against it.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// The action of the first clip called `name`.
    pub fn clip_action(&self, name: &str) -> Option<ActionId> {
        self.clips
            .iter()
            .position(|clip| clip.name == name)
            .map(ActionId)
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0)
    }

    /// Start (or keep) the action running. Its time and weight are untouched.
    pub fn play(&mut self, id: ActionId) {
        if let Some(action) = self.action_mut(id) {
            action.running = true;
        }
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(action) = self.action_mut(id) {
            action.running = false;
            action.effective_weight = 0.0;
        }
        self.reset(id);
    }

    /// Rewind to the start, re-enable and cancel any fade.
    pub fn reset(&mut self, id: ActionId) {
        if let Some(action) = self.action_mut(id) {
            action.time = 0.0;
            action.enabled = true;
            action.paused = false;
            action.fade = None;
        }
    }

    pub fn set_paused(&mut self, id: ActionId, paused: bool) {
        if let Some(action) = self.action_mut(id) {
            action.paused = paused;
        }
    }

    pub fn fade_in(&mut self, id: ActionId, duration: f32) {
        self.schedule_fade(id, duration, 0.0, 1.0);
    }

    pub fn fade_out(&mut self, id: ActionId, duration: f32) {
        self.schedule_fade(id, duration, 1.0, 0.0);
    }

    /// Fade `from` out and `to` in over the same `duration`.
    pub fn cross_fade(&mut self, from: ActionId, to: ActionId, duration: f32) {
        self.fade_out(from, duration);
        self.fade_in(to, duration);
    }

    fn schedule_fade(&mut self, id: ActionId, duration: f32, from: f32, to: f32) {
        let now = self.time;
        if let Some(action) = self.action_mut(id) {
            action.fade = Some(Fade {
                start: now,
                end: now + duration.max(0.0),
                from,
                to,
            });
        }
    }

    /// Advance the clock and all running actions by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
        let now = self.time;
        for action in self.actions.iter_mut().filter(|action| action.running) {
            if action.enabled && !action.paused {
                let duration = self.clips[action.clip].duration;
                action.time += dt * action.time_scale;
                action.time = if duration > 0.0 {
                    action.time.rem_euclid(duration)
                } else {
                    0.0
                };
            }
            action.update_weight(now);
        }
    }

    /// Blend every running action into the local transforms of `tree`.
    ///
    /// Properties no running action animates keep whatever value they have.
    pub fn apply(&self, tree: &mut NodeTree) {
        let mut blends: Vec<NodeBlend> = vec![NodeBlend::default(); tree.len()];
        for action in self.actions.iter().filter(|action| action.running) {
            let weight = action.effective_weight;
            for track in &self.clips[action.clip].tracks {
                let Some(blend) = blends.get_mut(track.node) else {
                    continue;
                };
                let Some(sample) = track.sample(action.time) else {
                    continue;
                };
                match sample {
                    Sample::Translation(v) => blend
                        .translation
                        .get_or_insert_with(Blend::default)
                        .accumulate(v, weight),
                    Sample::Rotation(q) => blend
                        .rotation
                        .get_or_insert_with(Blend::default)
                        .accumulate(q, weight),
                    Sample::Scale(v) => blend
                        .scale
                        .get_or_insert_with(Blend::default)
                        .accumulate(v, weight),
                }
            }
        }
        for (node, blend) in blends.into_iter().enumerate() {
            let Some(rest) = tree.rest(node) else {
                continue;
            };
            let Some(local) = tree.local_mut(node) else {
                continue;
            };
            blend.write(&rest, local);
        }
    }

    pub fn update(&mut self, dt: f32, tree: &mut NodeTree) {
        self.advance(dt);
        self.apply(tree);
    }
}

#[derive(Clone, Copy, Debug)]
struct Blend<T> {
    value: Option<T>,
    weight: f32,
}

impl<T> Default for Blend<T> {
    fn default() -> Self {
        Self {
            value: None,
            weight: 0.0,
        }
    }
}

impl<T: Animatable> Blend<T> {
    fn accumulate(&mut self, sample: T, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        self.value = Some(match self.value {
            None => sample,
            Some(value) => {
                let total = self.weight + weight;
                value.interpolate(sample, weight / total)
            }
        });
        self.weight += weight;
    }

    fn resolve(self, rest: T) -> T {
        match self.value {
            None => rest,
            Some(value) if self.weight < 1.0 => value.interpolate(rest, 1.0 - self.weight),
            Some(value) => value,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct NodeBlend {
    translation: Option<Blend<Vec3>>,
    rotation: Option<Blend<Quat>>,
    scale: Option<Blend<Vec3>>,
}

impl NodeBlend {
    fn write(self, rest: &Instance, local: &mut Instance) {
        if let Some(blend) = self.translation {
            local.position = blend.resolve(rest.position);
        }
        if let Some(blend) = self.rotation {
            local.rotation = blend.resolve(rest.rotation).normalize();
        }
        if let Some(blend) = self.scale {
            local.scale = blend.resolve(rest.scale);
        }
    }
}
