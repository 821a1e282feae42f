//! Data types for the scene: transforms, GPU models, textures and the node tree.
//!
//! - `instance` holds the translation/rotation/scale transform and its GPU form
//! - `model` contains GPU meshes, materials and the draw helpers
//! - `scene_graph` is the node arena, skins and joint palettes of a loaded model
//! - `texture` wraps GPU textures (colour maps, depth and shadow maps)

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
