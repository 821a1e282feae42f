use crate::{
    data_structures::{
        model::{self, MaterialUniform},
        texture,
    },
    resources::gltf::{ImageData, MaterialData},
};

/// Layout of bind group 0 in the lit pipeline: base colour map, normal map
/// and the material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

pub fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &ImageData,
    label: &str,
    is_normal_map: bool,
) -> texture::Texture {
    texture::Texture::from_rgba(
        device,
        queue,
        &image.rgba,
        [image.width, image.height],
        label,
        is_normal_map,
    )
}

/// Upload a material, substituting a white base colour map and a flat normal
/// map where the material has none. The shader always samples both.
pub fn upload_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    data: &MaterialData,
    layout: &wgpu::BindGroupLayout,
) -> model::Material {
    let diffuse = match &data.base_color_texture {
        Some(image) => upload_image(device, queue, image, &format!("{} base colour", data.name), false),
        None => texture::Texture::create_white(device, queue),
    };
    let normal = match &data.normal_texture {
        Some(image) => upload_image(device, queue, image, &format!("{} normal", data.name), true),
        None => texture::Texture::create_default_normal_map(device, queue),
    };
    let uniform = MaterialUniform::new(
        data.base_color,
        data.roughness,
        data.metallic,
        data.normal_texture.is_some(),
    );
    model::Material::new(
        device,
        &data.name,
        &diffuse,
        &normal,
        uniform,
        data.double_sided,
        layout,
    )
}
