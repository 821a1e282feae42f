//! The avatar viewer flow: loads both models, animates the avatar and
//! reacts to clicks on it.

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    config::ViewerConfig,
    context::{Context, InitContext},
    data_structures::instance::Instance,
    flow::{self, FlowConstructor, GraphicsFlow},
    interaction::AvatarRig,
    raycast::Ray,
    render::Render,
    resources::{LoadedAssets, load_viewer_assets},
    scene::Stage,
};

#[derive(Debug)]
pub struct AvatarFlow {
    rig: AvatarRig,
    stage: Stage,
}

impl AvatarFlow {
    pub fn new(init: &InitContext, assets: LoadedAssets, config: &ViewerConfig) -> Self {
        let rig = AvatarRig::new(&assets.avatar, Instance::new(), &config.interaction);
        let stage = Stage::assemble(init, &rig.model, &assets, &config.stage);
        Self { rig, stage }
    }

    pub fn rig(&self) -> &AvatarRig {
        &self.rig
    }
}

impl GraphicsFlow for AvatarFlow {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = wgpu::Color::TRANSPARENT;
        log::info!("{} ready", self.rig.model.name);
    }

    fn on_click(&mut self, _ctx: &Context, ray: &Ray) -> bool {
        self.rig.handle_click(ray)
    }

    fn on_update(&mut self, ctx: &Context, dt: Duration) {
        self.rig.update(dt.as_secs_f32());
        self.stage.sync_avatar(&ctx.queue, &self.rig.model);
    }

    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) {}

    fn on_render(&self) -> Render<'_> {
        self.stage.render()
    }
}

/// Constructor that fetches the assets and builds an [`AvatarFlow`].
///
/// Natively the models are read from disk and the progress is shown in the
/// window title, on the web they are streamed over HTTP and the progress is
/// written into the loading element of the page.
pub fn avatar_flow(config: ViewerConfig) -> FlowConstructor {
    Box::new(move |init: InitContext| {
        Box::pin(async move {
            #[cfg(not(target_arch = "wasm32"))]
            let (source, mut indicator) = (
                crate::resources::FileSource::from_config(&config.assets),
                crate::loading::WindowTitleIndicator::new(init.window.clone(), config.window.title.clone()),
            );
            #[cfg(target_arch = "wasm32")]
            let (source, mut indicator) = (
                crate::resources::HttpSource::new(&config.assets.root)?,
                crate::loading::DomIndicator::new(&config.dom.loading_element),
            );

            let assets = load_viewer_assets(&source, &config.assets, &mut indicator).await?;
            let flow: Box<dyn GraphicsFlow> = Box::new(AvatarFlow::new(&init, assets, &config));
            Ok(flow)
        })
    })
}

/// Open the viewer and block until its window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let constructor = avatar_flow(config.clone());
    flow::run(config, vec![constructor])
}
