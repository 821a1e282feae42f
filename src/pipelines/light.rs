use wgpu::util::DeviceExt;

use crate::data_structures::texture;

/// Lights as the lit shader sees them. Colours are premultiplied by their
/// intensity; the `w` lanes carry the scalar parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// rgb: ambient radiance
    pub ambient: [f32; 4],
    /// xyz: spot position, w: cutoff distance (0 = unlimited)
    pub spot_position: [f32; 4],
    /// xyz: unit vector from the spot target to the spot, w: cos(cone angle)
    pub spot_direction: [f32; 4],
    /// rgb: spot radiance, w: cos(inner cone angle)
    pub spot_color: [f32; 4],
    /// x: decay exponent, y: casts shadow (0/1), z: depth bias, w: shadow texel size
    pub spot_params: [f32; 4],
    /// xyz: unit vector towards the key light
    pub key_direction: [f32; 4],
    /// rgb: key light radiance
    pub key_color: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    view_proj: [[f32; 4]; 4],
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_map: texture::Texture,
    pub shadow_buffer: wgpu::Buffer,
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform, shadow_map_size: u32) -> Self {
        let buffer = mk_buffer(device, bytemuck::cast_slice(&[uniform]), "Light Buffer");
        let shadow_buffer = mk_buffer(
            device,
            bytemuck::cast_slice(&[ShadowUniform {
                view_proj: uniform.shadow_view_proj,
            }]),
            "Shadow Camera Buffer",
        );
        let shadow_map = texture::Texture::create_shadow_map(device, shadow_map_size);

        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &shadow_map);

        let shadow_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("shadow_camera_bind_group_layout"),
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_buffer.as_entire_binding(),
            }],
            label: Some("shadow_camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            shadow_map,
            shadow_buffer,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }

    pub fn casts_shadow(&self) -> bool {
        self.uniform.spot_params[1] > 0.5
    }
}

fn mk_buffer(device: &wgpu::Device, contents: &[u8], label: &str) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_map: &texture::Texture,
) -> wgpu::BindGroup {
    let sampler = shadow_map.sampler.clone().unwrap_or_else(|| {
        device.create_sampler(&wgpu::SamplerDescriptor {
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        })
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
