//! Render composition.
//!
//! Flows describe what they want drawn with the [`Render`] enum. The app
//! flattens the renders of all flows into one list of [`Instanced`] draws and
//! feeds that list to both the shadow pass and the lit pass.

use crate::data_structures::model::Model;

/// One model drawn with an instance buffer of placements.
#[derive(Clone, Copy, Debug)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    /// Joint palette of the model (bind group 3 / shadow group 1).
    pub skin: &'a wgpu::BindGroup,
    pub amount: usize,
    pub casts_shadow: bool,
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced model
/// - `Defaults(Vec<Instanced>)` renders a batch of models
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
#[derive(Debug, Default)]
pub enum Render<'a> {
    #[default]
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Collect every draw of this render tree into `draws`, depth first.
    pub fn flatten_into(self, draws: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Default(instanced) => draws.push(instanced),
            Render::Defaults(mut vec) => draws.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.flatten_into(draws)),
        }
    }

    pub fn flatten(self) -> Vec<Instanced<'a>> {
        let mut draws = Vec::new();
        self.flatten_into(&mut draws);
        draws
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Default(instanced)
    }
}
