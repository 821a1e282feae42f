use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalPosition, event::MouseButton, window::Window};

use crate::{
    camera::{CameraResources, Projection},
    config::ViewerConfig,
    data_structures::texture,
    pipelines::{Pipelines, light::LightResources},
    scene::LightRig,
};

/// Which mouse button is currently held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButtonState {
    #[default]
    None,
    Left,
    Right,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseState {
    /// Last cursor position in physical pixels, unknown until the cursor
    /// first moves over the window.
    coords: Option<PhysicalPosition<f64>>,
    pub pressed: MouseButtonState,
}

impl MouseState {
    pub fn coords(&self) -> Option<PhysicalPosition<f64>> {
        self.coords
    }

    /// Record a cursor move. Returns the movement in pixels while the left
    /// button is held.
    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let previous = self.coords.replace(position)?;
        (self.pressed == MouseButtonState::Left)
            .then(|| ((position.x - previous.x) as f32, (position.y - previous.y) as f32))
    }

    /// The cursor left the window; its position is unknown again.
    pub fn cursor_left(&mut self) {
        self.coords = None;
        self.pressed = MouseButtonState::None;
    }

    /// Record a button press. Any button picks, so this returns the position
    /// to pick at if the cursor position is known.
    pub fn press(&mut self, button: MouseButton) -> Option<PhysicalPosition<f64>> {
        self.pressed = match button {
            MouseButton::Left => MouseButtonState::Left,
            MouseButton::Right => MouseButtonState::Right,
            _ => MouseButtonState::Other,
        };
        self.coords
    }

    pub fn release(&mut self) {
        self.pressed = MouseButtonState::None;
    }
}

/// The highest sample count up to `requested` that `is_supported` accepts,
/// trying powers of two downwards. Falls back to 1 (no multisampling).
pub fn supported_sample_count(requested: u32, is_supported: impl Fn(u32) -> bool) -> u32 {
    let mut count = requested.max(1).next_power_of_two();
    if count > requested.max(1) {
        count /= 2;
    }
    while count > 1 {
        if is_supported(count) {
            return count;
        }
        count /= 2;
    }
    1
}

/// GPU, window and per-frame shared state.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    /// Multisampled colour target of the lit pass, `None` without MSAA.
    pub(crate) msaa_target: Option<texture::Texture>,
    pub sample_count: u32,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub mouse: MouseState,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Could not open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB surface for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no texture format")?;
        // Prefer a surface that can show the page behind the canvas.
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|mode| {
                matches!(
                    mode,
                    wgpu::CompositeAlphaMode::PreMultiplied | wgpu::CompositeAlphaMode::PostMultiplied
                )
            })
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(viewer.camera.fov_y_degrees),
            viewer.camera.near,
            viewer.camera.far,
        );
        let camera = CameraResources::new(&device, &viewer.camera, &projection);

        let format_features = [surface_format, texture::Texture::DEPTH_FORMAT]
            .map(|format| adapter.get_texture_format_features(format).flags);
        let sample_count = supported_sample_count(viewer.window.msaa_samples, |count| {
            format_features.iter().all(|flags| flags.sample_count_supported(count))
        });
        if sample_count != viewer.window.msaa_samples.max(1) {
            log::warn!(
                "{}x MSAA is not supported, using {}x",
                viewer.window.msaa_samples,
                sample_count
            );
        }
        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_target =
            (sample_count > 1).then(|| texture::Texture::create_msaa_target(&device, &config, sample_count));

        let rig = LightRig::from_config(&viewer.lights);
        let light = LightResources::new(&device, rig.uniform(), viewer.lights.spot.shadow_map_size);

        let pipelines = Pipelines::new(&device, &config, sample_count, &camera.bind_group_layout, &light);

        Ok(Self {
            window,
            depth_texture,
            msaa_target,
            sample_count,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            mouse: MouseState::default(),
            clear_colour: wgpu::Color::TRANSPARENT,
        })
    }
}

/// What a flow constructor gets to build its GPU resources with.
///
/// Device and queue are internally reference counted, so cloning them out of
/// the [`Context`] is cheap.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub material_layout: wgpu::BindGroupLayout,
    pub skin_layout: wgpu::BindGroupLayout,
    pub window: Arc<Window>,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            material_layout: ctx.pipelines.material_layout.clone(),
            skin_layout: ctx.pipelines.skin_layout.clone(),
            window: ctx.window.clone(),
        }
    }
}
