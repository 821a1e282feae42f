//! Viewer configuration.
//!
//! Every tunable of the viewer lives here as plain data. [`ViewerConfig::default`]
//! describes the stock scene: the avatar in the middle of a small ground disc,
//! a diamond floating to its left, a spot light casting shadows from above and
//! a "pointing" idle loop that switches to "dancing" when the avatar is clicked.

/// Top level configuration handed to [`crate::viewer::run`].
#[derive(Clone, Debug, Default)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub dom: DomConfig,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub stage: StageConfig,
    pub lights: LightRigConfig,
    pub interaction: InteractionConfig,
}

/// Where the two models are fetched from.
///
/// Paths are relative to `root`, which is a directory natively and a path
/// relative to the hosting page on the web.
#[derive(Clone, Debug)]
pub struct AssetConfig {
    pub root: String,
    pub avatar: String,
    pub decor: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            avatar: "myanimation.glb".to_string(),
            decor: "diamond.glb".to_string(),
        }
    }
}

/// Element ids used when running inside a page.
#[derive(Clone, Debug)]
pub struct DomConfig {
    pub loading_element: String,
    pub container_element: String,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            loading_element: "avatar-loading".to_string(),
            container_element: "avatar-container".to_string(),
        }
    }
}

impl DomConfig {
    /// Text shown by the loading indicator while the avatar downloads.
    pub fn loading_text(percent: u32) -> String {
        format!("LOADING... {}%", percent)
    }
}

/// Native window settings. Ignored on the web where the container decides.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Samples per pixel of the lit pass. Lowered to what the adapter
    /// supports; 1 turns antialiasing off.
    pub msaa_samples: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Avatar Viewer".to_string(),
            width: 800,
            height: 600,
            msaa_samples: 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            position: [0.2, 0.5, 1.0],
            target: [0.0, 0.75, 0.0],
            // min == max pins the elevation, the user may only spin around the avatar
            min_polar_angle: 1.4,
            max_polar_angle: 1.4,
            min_distance: 3.0,
            max_distance: f32::INFINITY,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
        }
    }
}

/// Placement of everything that is not the avatar.
#[derive(Clone, Debug)]
pub struct StageConfig {
    pub decor_scale: f32,
    pub decor_position: [f32; 3],
    pub ground_radius: f32,
    pub ground_height: f32,
    pub ground_segments: u32,
    pub ground_color: [f32; 4],
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            decor_scale: 0.5,
            decor_position: [-1.0, 0.5, 0.0],
            ground_radius: 0.6,
            ground_height: 0.1,
            ground_segments: 64,
            ground_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug)]
pub struct LightRigConfig {
    pub ambient: AmbientLightConfig,
    pub spot: SpotLightConfig,
    pub key: DirectionalLightConfig,
}

impl Default for LightRigConfig {
    fn default() -> Self {
        Self {
            ambient: AmbientLightConfig {
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
            },
            spot: SpotLightConfig {
                color: [1.0, 1.0, 1.0],
                intensity: 20.0,
                distance: 8.0,
                angle: 1.0,
                penumbra: 0.5,
                decay: 2.0,
                position: [0.0, 4.0, 2.0],
                target: [0.0, 0.0, 0.0],
                casts_shadow: true,
                shadow_map_size: 1024,
            },
            key: DirectionalLightConfig {
                color: [1.0, 1.0, 1.0],
                intensity: 2.0,
                position: [1.0, 1.0, 2.0],
                target: [0.0, 0.0, 0.0],
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct AmbientLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub struct SpotLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Range after which the light has no effect. Zero means unlimited.
    pub distance: f32,
    /// Half angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that is softened, 0..=1.
    pub penumbra: f32,
    pub decay: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub casts_shadow: bool,
    pub shadow_map_size: u32,
}

#[derive(Clone, Debug)]
pub struct DirectionalLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

/// Clip names and timings of the click reaction.
///
/// The hold and cooldown are fixed delays; they are not derived from the
/// actual clip lengths.
#[derive(Clone, Debug)]
pub struct InteractionConfig {
    pub idle_clip: String,
    pub reaction_clip: String,
    pub fade_in_secs: f32,
    pub reaction_secs: f32,
    pub fade_back_secs: f32,
    pub rearm_secs: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            idle_clip: "pointing".to_string(),
            reaction_clip: "dancing".to_string(),
            fade_in_secs: 0.3,
            reaction_secs: 4.0,
            fade_back_secs: 1.0,
            rearm_secs: 1.0,
        }
    }
}
