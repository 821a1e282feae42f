//! GPU meshes, materials and models.
//!
//! A [`Model`] is the GPU form of one mesh-bearing node: its primitives as
//! [`Mesh`]es and the materials they index into. Every vertex carries four
//! joint indices and weights so that rigid and skinned geometry share one
//! pipeline; rigid geometry simply binds all its weight to joint 0.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl ModelVertex {
    /// A vertex that follows joint 0 only.
    pub fn rigid(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
            normal,
            weights: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        }
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x2,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x3,
            5 => Uint32x4,
            6 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Shading parameters that are not textures.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: normal map present (0/1), y: roughness, z: metallic, w: unused
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn new(base_color: [f32; 4], roughness: f32, metallic: f32, has_normal_map: bool) -> Self {
        Self {
            base_color,
            params: [
                if has_normal_map { 1.0 } else { 0.0 },
                roughness,
                metallic,
                0.0,
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    #[allow(unused)]
    pub name: String,
    pub double_sided: bool,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: &texture::Texture,
        normal_texture: &texture::Texture,
        uniform: MaterialUniform,
        double_sided: bool,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} material buffer", name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let diffuse_sampler = diffuse_texture
            .sampler
            .clone()
            .unwrap_or_else(|| texture::create_default_sampler(device));
        let normal_sampler = normal_texture
            .sampler
            .clone()
            .unwrap_or_else(|| texture::create_default_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&normal_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            double_sided,
            bind_group,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn material_of(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials.get(mesh.material)
    }
}

/// Draw calls for the lit pass.
///
/// Bind group 1 (camera) and 2 (lights) are set once per pass by the caller,
/// the skin (3) is set per model and the material (0) per mesh.
pub trait DrawModel {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, material: &Material, instances: Range<u32>);

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        skin: &wgpu::BindGroup,
        pipelines: (&wgpu::RenderPipeline, &wgpu::RenderPipeline),
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, material: &Material, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    /// `pipelines` is `(single_sided, double_sided)`; the one matching the
    /// material is selected per mesh.
    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        skin: &wgpu::BindGroup,
        pipelines: (&wgpu::RenderPipeline, &wgpu::RenderPipeline),
    ) {
        self.set_bind_group(3, skin, &[]);
        for mesh in &model.meshes {
            let Some(material) = model.material_of(mesh) else {
                log::warn!("Mesh {} references a missing material {}", mesh.name, mesh.material);
                continue;
            };
            let pipeline = if material.double_sided {
                pipelines.1
            } else {
                pipelines.0
            };
            self.set_pipeline(pipeline);
            self.draw_mesh_instanced(mesh, material, instances.clone());
        }
    }
}

/// Depth-only draw calls for the shadow pass. Materials are irrelevant there.
pub trait DrawShadow {
    fn draw_model_shadow(&mut self, model: &Model, instances: Range<u32>, skin: &wgpu::BindGroup);
}

impl DrawShadow for wgpu::RenderPass<'_> {
    fn draw_model_shadow(&mut self, model: &Model, instances: Range<u32>, skin: &wgpu::BindGroup) {
        self.set_bind_group(1, skin, &[]);
        for mesh in &model.meshes {
            self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.draw_indexed(0..mesh.num_elements, 0, instances.clone());
        }
    }
}
