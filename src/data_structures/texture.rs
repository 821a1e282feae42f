//! GPU textures.
//!
//! [`Texture`] wraps a wgpu texture with its view and an optional sampler.
//! Colour maps are uploaded from already decoded RGBA8 pixels (see
//! [`crate::resources::texture`]); depth and shadow maps are created empty.

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Depth format of the main pass and the shadow map.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment for the main pass, sized like the surface.
    ///
    /// `sample_count` has to match the colour target of the pass.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], sample_count: u32, label: &str) -> Self {
        Self::create_attachment(device, size, sample_count, Self::DEPTH_FORMAT, label)
    }

    /// Multisampled colour target that is resolved into the surface texture.
    pub fn create_msaa_target(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, sample_count: u32) -> Self {
        Self::create_attachment(
            device,
            [config.width, config.height],
            sample_count,
            config.format,
            "msaa_target",
        )
    }

    fn create_attachment(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Square depth texture rendered from the spot light and sampled with a
    /// comparison sampler for percentage-closer filtering.
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let extent = wgpu::Extent3d {
            width: size.max(1),
            height: size.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow map"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 texture of a single colour.
    ///
    /// Used for materials without a base colour map (white, so the factor
    /// alone decides the colour) and without a normal map (the neutral
    /// blue/purple that represents an unperturbed normal).
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
        is_normal_map: bool,
    ) -> Self {
        Self::from_rgba(device, queue, &rgba, [1, 1], label, is_normal_map)
    }

    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_solid(device, queue, [127, 127, 255, 255], "default normal map", true)
    }

    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_solid(device, queue, [255, 255, 255, 255], "default base colour", false)
    }

    /// Upload tightly packed RGBA8 pixels.
    ///
    /// `is_normal_map` toggles between sRGB (false) and linear (true) storage.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        dimensions: [u32; 2],
        label: &str,
        is_normal_map: bool,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: dimensions[0],
            height: dimensions[1],
            depth_or_array_layers: 1,
        };
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions[0]),
                rows_per_image: Some(dimensions[1]),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
