use log::warn;

use crate::animation::{AnimationClip, Keyframes, Track};

/// Read every animation of the document into a clip.
///
/// Channels that animate morph-target weights, or that cannot be read, are
/// skipped with a warning; the rest of the clip is kept.
pub fn read_clips(document: &gltf::Document, buffers: &[Vec<u8>]) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));
            let tracks = animation
                .channels()
                .filter_map(|channel| read_track(&channel, buffers, &name))
                .collect();
            AnimationClip::new(name, tracks)
        })
        .collect()
}

fn read_track(channel: &gltf::animation::Channel, buffers: &[Vec<u8>], clip: &str) -> Option<Track> {
    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let Some(inputs) = reader.read_inputs() else {
        warn!("Channel {} of {} has no keyframe times", channel.index(), clip);
        return None;
    };
    let timestamps: Vec<f32> = inputs.collect();
    let keyframes = match reader.read_outputs()? {
        gltf::animation::util::ReadOutputs::Translations(translations) => {
            Keyframes::Translation(translations.map(Into::into).collect())
        }
        gltf::animation::util::ReadOutputs::Rotations(rotations) => Keyframes::Rotation(
            rotations
                .into_f32()
                // glTF stores quaternions as [x, y, z, w]
                .map(|[x, y, z, w]| cgmath::Quaternion::new(w, x, y, z))
                .collect(),
        ),
        gltf::animation::util::ReadOutputs::Scales(scales) => {
            Keyframes::Scale(scales.map(Into::into).collect())
        }
        gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {
            warn!("Morph target animation in {} is not supported", clip);
            return None;
        }
    };
    Some(Track {
        node: channel.target().node().index(),
        timestamps,
        keyframes,
        interpolation: channel.sampler().interpolation().into(),
    })
}
