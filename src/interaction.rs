//! Click reaction of the avatar.
//!
//! The avatar loops its idle clip. A click that hits it cross-fades into the
//! reaction clip, holds it for a fixed time, fades back and only then accepts
//! the next click:
//!
//! ```text
//! Idle --hit--> Reacting --reaction_secs--> Recovering --rearm_secs--> Idle
//! ```
//!
//! All delays are measured with the frame delta that also drives the mixer.

use log::{debug, warn};

use crate::{
    animation::{ActionId, AnimationMixer},
    config::InteractionConfig,
    data_structures::{instance::Instance, scene_graph::SceneModel},
    raycast::{Ray, intersect_model},
    resources::gltf::ModelData,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// Idle clip playing, clicks are accepted.
    Idle,
    /// Reaction clip playing.
    Reacting { elapsed: f32 },
    /// Fading back to idle, clicks are still ignored.
    Recovering { elapsed: f32 },
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    idle: ActionId,
    reaction: ActionId,
    fade_in_secs: f32,
    reaction_secs: f32,
    fade_back_secs: f32,
    rearm_secs: f32,
    phase: Phase,
}

impl InteractionController {
    /// `None` if the mixer lacks either clip.
    pub fn new(mixer: &AnimationMixer, config: &InteractionConfig) -> Option<Self> {
        let idle = mixer.clip_action(&config.idle_clip)?;
        let reaction = mixer.clip_action(&config.reaction_clip)?;
        Some(Self {
            idle,
            reaction,
            fade_in_secs: config.fade_in_secs,
            reaction_secs: config.reaction_secs,
            fade_back_secs: config.fade_back_secs,
            rearm_secs: config.rearm_secs,
            phase: Phase::Idle,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stumbling(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn idle_action(&self) -> ActionId {
        self.idle
    }

    pub fn reaction_action(&self) -> ActionId {
        self.reaction
    }

    /// React to a click. Returns whether the reaction was started.
    pub fn handle_click(&mut self, hit: bool, mixer: &mut AnimationMixer) -> bool {
        if !hit {
            return false;
        }
        if self.is_stumbling() {
            debug!("Avatar clicked while reacting, ignored");
            return false;
        }
        debug!("Avatar clicked, starting reaction");
        mixer.reset(self.reaction);
        mixer.play(self.reaction);
        mixer.cross_fade(self.idle, self.reaction, self.fade_in_secs);
        self.phase = Phase::Reacting { elapsed: 0.0 };
        true
    }

    /// Advance the timers by `dt` seconds, running every transition that
    /// falls inside the step in order.
    pub fn update(&mut self, dt: f32, mixer: &mut AnimationMixer) {
        let mut remaining = dt.max(0.0);
        loop {
            match self.phase {
                Phase::Idle => break,
                Phase::Reacting { elapsed } => {
                    let left = self.reaction_secs - elapsed;
                    if remaining < left {
                        self.phase = Phase::Reacting {
                            elapsed: elapsed + remaining,
                        };
                        break;
                    }
                    remaining -= left.max(0.0);
                    debug!("Reaction over, fading back to idle");
                    mixer.reset(self.idle);
                    mixer.play(self.idle);
                    mixer.cross_fade(self.reaction, self.idle, self.fade_back_secs);
                    self.phase = Phase::Recovering { elapsed: 0.0 };
                }
                Phase::Recovering { elapsed } => {
                    let left = self.rearm_secs - elapsed;
                    if remaining < left {
                        self.phase = Phase::Recovering {
                            elapsed: elapsed + remaining,
                        };
                        break;
                    }
                    remaining -= left.max(0.0);
                    debug!("Avatar re-armed");
                    self.phase = Phase::Idle;
                }
            }
        }
    }
}

/// The avatar without any GPU state: pose, animation and click handling.
#[derive(Clone, Debug)]
pub struct AvatarRig {
    pub model: SceneModel,
    pub mixer: AnimationMixer,
    controller: Option<InteractionController>,
    idle: Option<ActionId>,
}

impl AvatarRig {
    /// Place the avatar and start its idle clip.
    ///
    /// Without the idle clip the avatar stays in its rest pose; without
    /// either clip clicks are ignored.
    pub fn new(data: &ModelData, placement: Instance, config: &InteractionConfig) -> Self {
        let model = SceneModel::from_data(data, placement);
        let mut mixer = AnimationMixer::new(data.clips.clone());
        let idle = mixer.clip_action(&config.idle_clip);
        match idle {
            Some(idle) => mixer.play(idle),
            None => warn!(
                "{} has no clip named {}, it stays in its rest pose",
                data.name, config.idle_clip
            ),
        }
        let controller = InteractionController::new(&mixer, config);
        if controller.is_none() {
            warn!(
                "{} lacks the {} or {} clip, clicks are ignored",
                data.name, config.idle_clip, config.reaction_clip
            );
        }
        Self {
            model,
            mixer,
            controller,
            idle,
        }
    }

    pub fn controller(&self) -> Option<&InteractionController> {
        self.controller.as_ref()
    }

    pub fn idle_action(&self) -> Option<ActionId> {
        self.idle
    }

    pub fn is_stumbling(&self) -> bool {
        self.controller.as_ref().is_some_and(InteractionController::is_stumbling)
    }

    /// Cast `ray` at the avatar in its current pose and react to a hit.
    pub fn handle_click(&mut self, ray: &Ray) -> bool {
        let Some(controller) = self.controller.as_mut() else {
            return false;
        };
        let hit = !intersect_model(ray, &self.model).is_empty();
        controller.handle_click(hit, &mut self.mixer)
    }

    /// Timers first, then the mixer, then the pose.
    pub fn update(&mut self, dt: f32) {
        if let Some(controller) = self.controller.as_mut() {
            controller.update(dt, &mut self.mixer);
        }
        self.mixer.update(dt, &mut self.model.tree);
        self.model.refresh();
    }
}
