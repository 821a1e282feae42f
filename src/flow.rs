//! Flow control and application event loop.
//!
//! A "flow" is a self-contained part of the viewer that reacts to input,
//! advances its state every frame and hands back what it wants drawn. The app
//! owns the window and the GPU [`Context`], builds the flows asynchronously
//! once a window exists and drives them from winit's event loop.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Window events are forwarded to every flow
//! 2. A mouse press is turned into a camera ray and offered to the flows
//! 3. Flows advance their state (`on_update`)
//! 4. The orbit controls move the camera
//! 5. The flows' renders are drawn into the shadow map and then, multisampled,
//!    into the surface
//! 6. The frame is presented

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    camera::Projection,
    context::{Context, InitContext},
    data_structures::{
        model::{DrawModel, DrawShadow},
        texture::Texture,
    },
    raycast::{Ray, ndc_from_cursor},
    render::Instanced,
};

/// A renderable, interactive part of the viewer.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction and may configure the context
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_click()` is called with the camera ray under the cursor on a mouse press
/// 4. `on_update()` is called every frame before rendering
/// 5. `on_render()` is called every frame and says what to draw
pub trait GraphicsFlow {
    /// The only place to modify the [`Context`], e.g. the clear colour.
    fn on_init(&mut self, ctx: &mut Context);

    /// Returns whether the click was consumed.
    fn on_click(&mut self, ctx: &Context, ray: &Ray) -> bool;

    fn on_update(&mut self, ctx: &Context, dt: Duration);

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent);

    fn on_render(&self) -> crate::render::Render<'_>;
}

impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Builds a flow once the GPU is available. Loading assets happens here.
pub type FlowConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>>;

/// Apply a new viewport size to the surface configuration and the camera
/// projection.
///
/// Zero sizes (minimised windows, hidden containers) and unchanged sizes
/// leave both untouched. Returns whether anything changed, i.e. whether the
/// surface and its attachments have to be recreated.
pub fn apply_resize(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 || (config.width == width && config.height == height) {
        return false;
    }
    config.width = width;
    config.height = height;
    projection.resize(width, height)
}

/// GPU context plus surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        let changed = apply_resize(&mut self.ctx.config, &mut self.ctx.projection, width, height);
        if changed || (!self.is_surface_configured && width > 0 && height > 0) {
            self.configure_surface();
        }
    }

    /// (Re)configure the surface and the attachments sized like it.
    fn configure_surface(&mut self) {
        let ctx = &mut self.ctx;
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_texture = Texture::create_depth_texture(
            &ctx.device,
            [ctx.config.width, ctx.config.height],
            ctx.sample_count,
            "depth_texture",
        );
        if ctx.msaa_target.is_some() {
            ctx.msaa_target = Some(Texture::create_msaa_target(&ctx.device, &ctx.config, ctx.sample_count));
        }
        self.is_surface_configured = true;
    }

    fn render(&mut self, graphics_flows: &[Box<dyn GraphicsFlow>]) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws: Vec<Instanced> = graphics_flows
            .iter()
            .flat_map(|flow| flow.on_render().flatten())
            .filter(|instanced| {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("you attemted to render something with zero instances");
                    return false;
                }
                true
            })
            .collect();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if self.ctx.light.casts_shadow() {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            shadow_pass.set_pipeline(&self.ctx.pipelines.shadow);
            shadow_pass.set_bind_group(0, &self.ctx.light.shadow_bind_group, &[]);
            for instanced in draws.iter().filter(|instanced| instanced.casts_shadow) {
                shadow_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                shadow_pass.draw_model_shadow(instanced.model, 0..instanced.amount as u32, instanced.skin);
            }
        }

        {
            // with MSAA the samples are resolved into the surface texture
            let (target, resolve_target, store) = match &self.ctx.msaa_target {
                Some(msaa) => (&msaa.view, Some(&view), wgpu::StoreOp::Discard),
                None => (&view, None, wgpu::StoreOp::Store),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
            render_pass.set_bind_group(2, &self.ctx.light.bind_group, &[]);
            let pipelines = (&self.ctx.pipelines.lit, &self.ctx.pipelines.lit_double_sided);
            for instanced in &draws {
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    instanced.skin,
                    pipelines,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Turn a click at `coords` into a ray and offer it to the flows until one
    /// consumes it.
    fn click(&self, coords: PhysicalPosition<f64>, graphics_flows: &mut [Box<dyn GraphicsFlow>]) {
        let Some(ndc) = ndc_from_cursor(coords.x, coords.y, self.ctx.config.width, self.ctx.config.height)
        else {
            return;
        };
        let Some(ray) = Ray::from_camera(ndc, &self.ctx.camera.camera, &self.ctx.projection) else {
            return;
        };
        for flow in graphics_flows.iter_mut() {
            if flow.on_click(&self.ctx, &ray) {
                break;
            }
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor>>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: ViewerConfig,
        constructors: Vec<FlowConstructor>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
        })
    }

    fn initialized(&mut self, mut app_state: AppState, flows: Vec<anyhow::Result<Box<dyn GraphicsFlow>>>) {
        for flow in flows {
            match flow {
                Ok(flow) => self.graphics_flows.push(flow),
                // the viewer keeps running with whatever did load
                Err(e) => log::error!("{:#}", e),
            }
        }
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_init(&mut app_state.ctx));
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized {
        state: AppState,
        flows: Vec<anyhow::Result<Box<dyn GraphicsFlow>>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => f
                .debug_struct("Initialized")
                .field("flows", &flows.len())
                .finish(),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn create_canvas(container_id: &str) -> Option<web_sys::HtmlCanvasElement> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()?.document()?;
    let canvas: web_sys::HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    let style = canvas.style();
    let _ = style.set_property("width", "100%");
    let _ = style.set_property("height", "100%");
    let _ = style.set_property("display", "block");
    let parent: web_sys::Element = match document.get_element_by_id(container_id) {
        Some(container) => container,
        None => {
            log::warn!("Container #{} not found, appending the canvas to the body", container_id);
            document.body()?.into()
        }
    };
    parent.append_child(&canvas).ok()?;
    Some(canvas)
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.window.title.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            window_attributes = window_attributes.with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            window_attributes =
                window_attributes.with_canvas(create_canvas(&self.config.dom.container_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let config = self.config.clone();
        let init_future = async move {
            let app_state = AppState::new(window, &config).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // The clone in into() leverages the internal Arcs of Device and Queue and thus only clones the ref
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.initialized(app_state, flows),
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed before the viewer was initialized");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { state, flows } => self.initialized(state, flows),
            FlowEvent::Failed(e) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if let WindowEvent::CursorMoved { position, .. } = event {
            if let Some((dx, dy)) = state.ctx.mouse.cursor_moved(position) {
                state
                    .ctx
                    .camera
                    .controls
                    .rotate_by_pixels(dx, dy, state.ctx.config.height);
            }
        };

        self.graphics_flows
            .iter_mut()
            .for_each(|f| f.on_window_events(&state.ctx, &event));

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                self.graphics_flows
                    .iter_mut()
                    .for_each(|f| f.on_update(&state.ctx, dt));
                state.ctx.camera.update(&state.ctx.queue, &state.ctx.projection);

                match state.render(&self.graphics_flows) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.is_surface_configured = false;
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                if button_state.is_pressed() {
                    if let Some(coords) = state.ctx.mouse.press(button) {
                        state.click(coords, &mut self.graphics_flows);
                    }
                } else {
                    state.ctx.mouse.release();
                }
            }
            WindowEvent::CursorLeft { .. } => state.ctx.mouse.cursor_left(),
            _ => {}
        }
    }
}

/// Set up logging, open the window and run the flows until it closes.
pub fn run(config: ViewerConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
