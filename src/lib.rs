//! avatar-viewer
//!
//! An interactive 3D avatar viewer for native windows and the browser. Two
//! glTF models are loaded: a skinned, animated avatar standing on a small
//! ground disc and a decorative model floating next to it. The avatar loops an
//! idle clip and cross-fades into a reaction clip when it is clicked.
//!
//! High-level modules
//! - `animation`: keyframe clips and a cross-fading animation mixer
//! - `camera`: camera, projection and damped orbit controls
//! - `config`: every tunable of the viewer as plain data
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances, textures and the node hierarchy
//! - `flow`: application event loop and the flow abstraction
//! - `interaction`: the click reaction state machine around the avatar
//! - `loading`: loading progress display
//! - `pipelines`: lit, double sided and shadow render pipelines
//! - `raycast`: camera rays and ray/mesh intersection against skinned poses
//! - `render`: render composition for the frame
//! - `resources`: fetching assets and turning glTF into model data
//! - `scene`: lights, ground and decor and their GPU upload
//! - `viewer`: the avatar flow and the entry point

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod interaction;
pub mod loading;
pub mod pipelines;
pub mod raycast;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    viewer::run(config::ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
