//! Render pipelines.
//!
//! - `basic`: the lit pass, once with back-face culling and once double sided,
//!   both multisampled
//! - `light`: light uniform, shadow map and their bind group
//! - `shadow`: depth-only pass rendered from the spot light

pub mod basic;
pub mod light;
pub mod shadow;

use crate::resources::texture::material_layout;

/// Layout of the joint palette bind group.
///
/// Group 3 in the lit pass and group 1 in the shadow pass.
pub fn skin_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("skin_bind_group_layout"),
    })
}

/// Every pipeline and shared layout the viewer draws with.
#[derive(Debug)]
pub struct Pipelines {
    pub lit: wgpu::RenderPipeline,
    pub lit_double_sided: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub skin_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light: &light::LightResources,
    ) -> Self {
        let material_layout = material_layout(device);
        let skin_layout = skin_layout(device);
        let layouts = basic::LitLayouts {
            material: &material_layout,
            camera: camera_bind_group_layout,
            light: &light.bind_group_layout,
            skin: &skin_layout,
        };
        let lit = basic::mk_lit_pipeline(device, config, &layouts, Some(wgpu::Face::Back), sample_count);
        let lit_double_sided = basic::mk_lit_pipeline(device, config, &layouts, None, sample_count);
        let shadow = shadow::mk_shadow_pipeline(device, &light.shadow_bind_group_layout, &skin_layout);
        Self {
            lit,
            lit_double_sided,
            shadow,
            material_layout,
            skin_layout,
        }
    }
}
