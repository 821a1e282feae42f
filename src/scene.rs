//! Stage assembly: lights, scenery and the GPU side of every model.
//!
//! The CPU description ([`LightRig`], [`Scenery`]) is derived from the
//! configuration and can be inspected without a GPU. [`Stage`] uploads the
//! avatar, the decor and the ground and keeps their joint palettes current.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{LightRigConfig, StageConfig},
    context::InitContext,
    data_structures::{
        instance::Instance,
        model::{Mesh, Model, ModelVertex},
        scene_graph::{MAX_JOINTS, SceneModel},
    },
    render::{Instanced, Render},
    resources::{
        LoadedAssets,
        gltf::{MaterialData, MeshData, ModelData, NodeData, PrimitiveData},
        mesh, texture,
    },
};

/// Near plane of the spot light's shadow camera.
const SHADOW_NEAR: f32 = 0.5;
/// Far plane of the shadow camera when the spot has no cutoff distance.
const SHADOW_FAR_UNLIMITED: f32 = 500.0;
const SHADOW_DEPTH_BIAS: f32 = 0.0005;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub position: Point3<f32>,
    /// Unit vector from the target towards the light.
    pub direction: Vector3<f32>,
    /// Colour times intensity.
    pub radiance: Vector3<f32>,
    pub distance: f32,
    pub decay: f32,
    /// Cosine of the cone angle; nothing outside is lit.
    pub cos_outer: f32,
    /// Cosine of the angle inside which the light is at full strength.
    pub cos_inner: f32,
    pub casts_shadow: bool,
    pub shadow_view_proj: Matrix4<f32>,
    pub shadow_texel: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Unit vector towards the light.
    pub direction: Vector3<f32>,
    pub radiance: Vector3<f32>,
}

/// The three lights of the scene, ready for the shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightRig {
    pub ambient: Vector3<f32>,
    pub spot: SpotLight,
    pub key: DirectionalLight,
}

impl LightRig {
    pub fn from_config(config: &LightRigConfig) -> Self {
        let spot = &config.spot;
        let position = Point3::from(spot.position);
        let target = Point3::from(spot.target);
        let direction = unit_or_up(position - target);
        let far = if spot.distance > 0.0 {
            spot.distance
        } else {
            SHADOW_FAR_UNLIMITED
        };
        let up = if direction.y.abs() > 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let shadow_view_proj = OPENGL_TO_WGPU_MATRIX
            * perspective(Rad(2.0 * spot.angle), 1.0, SHADOW_NEAR, far)
            * Matrix4::look_at_rh(position, target, up);

        let key = &config.key;
        Self {
            ambient: Vector3::from(config.ambient.color) * config.ambient.intensity,
            spot: SpotLight {
                position,
                direction,
                radiance: Vector3::from(spot.color) * spot.intensity,
                distance: spot.distance,
                decay: spot.decay,
                cos_outer: spot.angle.cos(),
                cos_inner: (spot.angle * (1.0 - spot.penumbra)).cos(),
                casts_shadow: spot.casts_shadow,
                shadow_view_proj,
                shadow_texel: 1.0 / spot.shadow_map_size.max(1) as f32,
            },
            key: DirectionalLight {
                direction: unit_or_up(Point3::from(key.position) - Point3::from(key.target)),
                radiance: Vector3::from(key.color) * key.intensity,
            },
        }
    }

    pub fn uniform(&self) -> crate::pipelines::light::LightUniform {
        let spot = &self.spot;
        crate::pipelines::light::LightUniform {
            ambient: self.ambient.extend(1.0).into(),
            spot_position: spot.position.to_vec().extend(spot.distance).into(),
            spot_direction: spot.direction.extend(spot.cos_outer).into(),
            spot_color: spot.radiance.extend(spot.cos_inner).into(),
            spot_params: [
                spot.decay,
                if spot.casts_shadow { 1.0 } else { 0.0 },
                SHADOW_DEPTH_BIAS,
                spot.shadow_texel,
            ],
            key_direction: self.key.direction.extend(0.0).into(),
            key_color: self.key.radiance.extend(1.0).into(),
            shadow_view_proj: spot.shadow_view_proj.into(),
        }
    }
}

fn unit_or_up(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() <= f32::EPSILON {
        Vector3::unit_y()
    } else {
        v.normalize()
    }
}

/// Geometry and material of the ground disc: one closed cylinder.
pub fn ground_data(config: &StageConfig) -> ModelData {
    let (vertices, indices) = mesh::cylinder(
        config.ground_radius,
        config.ground_radius,
        config.ground_height,
        config.ground_segments,
    );
    ModelData {
        name: "ground".to_string(),
        nodes: vec![NodeData {
            name: Some("ground".to_string()),
            transform: Instance::new(),
            children: Vec::new(),
            mesh: Some(0),
            skin: None,
        }],
        roots: vec![0],
        meshes: vec![MeshData {
            name: "ground".to_string(),
            primitives: vec![PrimitiveData {
                vertices,
                indices,
                material: Some(0),
            }],
        }],
        materials: vec![MaterialData {
            name: "ground".to_string(),
            base_color: config.ground_color,
            ..Default::default()
        }],
        skins: Vec::new(),
        clips: Vec::new(),
    }
}

/// Everything static around the avatar.
#[derive(Clone, Debug)]
pub struct Scenery {
    pub decor: SceneModel,
    pub ground: SceneModel,
    pub ground_data: ModelData,
}

impl Scenery {
    pub fn new(decor: &ModelData, config: &StageConfig) -> Self {
        let decor_placement =
            Instance::from(Vector3::from(config.decor_position)).with_uniform_scale(config.decor_scale);
        let decor = SceneModel::from_data(decor, decor_placement);

        let ground_data = ground_data(config);
        // lowered so the top of the disc is at y = 0
        let ground_placement = Instance::from(Vector3::new(0.0, -config.ground_height / 2.0, 0.0));
        let mut ground = SceneModel::from_data(&ground_data, ground_placement);
        ground.casts_shadow = false;

        Self {
            decor,
            ground,
            ground_data,
        }
    }
}

/// GPU side of one mesh-bearing node.
#[derive(Debug)]
struct GpuPart {
    model: Model,
    skin_buffer: wgpu::Buffer,
    skin_bind_group: wgpu::BindGroup,
}

/// GPU side of a [`SceneModel`].
#[derive(Debug)]
pub struct GpuModel {
    parts: Vec<GpuPart>,
    instance_buffer: wgpu::Buffer,
    casts_shadow: bool,
}

impl GpuModel {
    pub fn upload(init: &InitContext, scene: &SceneModel, materials: &[MaterialData]) -> Self {
        let device = &init.device;
        let mut gpu_materials: Vec<_> = materials
            .iter()
            .map(|material| texture::upload_material(device, &init.queue, material, &init.material_layout))
            .collect();
        // primitives without a material use this one
        let fallback = gpu_materials.len();
        gpu_materials.push(texture::upload_material(
            device,
            &init.queue,
            &MaterialData::default(),
            &init.material_layout,
        ));

        let identity: [[f32; 4]; 4] = cgmath::Matrix4::from_scale(1.0).into();
        let parts = scene
            .parts
            .iter()
            .filter_map(|part| {
                let mesh_data = scene.meshes.get(part.mesh)?;
                let meshes = mesh_data
                    .primitives
                    .iter()
                    .map(|primitive| {
                        let material = primitive
                            .material
                            .filter(|&m| m < materials.len())
                            .unwrap_or(fallback);
                        if part.skin.is_some() {
                            Mesh::new(device, &mesh_data.name, &primitive.vertices, &primitive.indices, material)
                        } else {
                            // joint 0 of an unskinned part is its node transform
                            let rigid: Vec<ModelVertex> = primitive
                                .vertices
                                .iter()
                                .map(|v| ModelVertex {
                                    joints: [0; 4],
                                    weights: [1.0, 0.0, 0.0, 0.0],
                                    ..*v
                                })
                                .collect();
                            Mesh::new(device, &mesh_data.name, &rigid, &primitive.indices, material)
                        }
                    })
                    .collect();

                let mut palette = vec![identity; MAX_JOINTS];
                for (slot, matrix) in palette.iter_mut().zip(part.joint_matrices()) {
                    *slot = (*matrix).into();
                }
                let skin_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} joint palette", mesh_data.name)),
                    contents: bytemuck::cast_slice(&palette),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let skin_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &init.skin_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: skin_buffer.as_entire_binding(),
                    }],
                    label: Some("skin_bind_group"),
                });
                Some(GpuPart {
                    model: Model {
                        meshes,
                        materials: gpu_materials.clone(),
                    },
                    skin_buffer,
                    skin_bind_group,
                })
            })
            .collect();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", scene.name)),
            contents: bytemuck::cast_slice(&[scene.placement.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            parts,
            instance_buffer,
            casts_shadow: scene.casts_shadow,
        }
    }

    /// Upload the current joint palettes and placement of `scene`.
    pub fn sync(&self, queue: &wgpu::Queue, scene: &SceneModel) {
        for (gpu, part) in self.parts.iter().zip(&scene.parts) {
            let palette: Vec<[[f32; 4]; 4]> = part
                .joint_matrices()
                .iter()
                .take(MAX_JOINTS)
                .map(|&matrix| matrix.into())
                .collect();
            queue.write_buffer(&gpu.skin_buffer, 0, bytemuck::cast_slice(&palette));
        }
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[scene.placement.to_raw()]));
    }

    pub fn render(&self) -> Render<'_> {
        Render::Defaults(
            self.parts
                .iter()
                .map(|part| Instanced {
                    instance: &self.instance_buffer,
                    model: &part.model,
                    skin: &part.skin_bind_group,
                    amount: 1,
                    casts_shadow: self.casts_shadow,
                })
                .collect(),
        )
    }
}

/// GPU resources of the avatar, the decor and the ground.
#[derive(Debug)]
pub struct Stage {
    pub scenery: Scenery,
    avatar: GpuModel,
    decor: GpuModel,
    ground: GpuModel,
}

impl Stage {
    pub fn assemble(init: &InitContext, avatar: &SceneModel, assets: &LoadedAssets, config: &StageConfig) -> Self {
        let scenery = Scenery::new(&assets.decor, config);
        let avatar = GpuModel::upload(init, avatar, &assets.avatar.materials);
        let decor = GpuModel::upload(init, &scenery.decor, &assets.decor.materials);
        let ground = GpuModel::upload(init, &scenery.ground, &scenery.ground_data.materials);
        Self {
            scenery,
            avatar,
            decor,
            ground,
        }
    }

    pub fn sync_avatar(&self, queue: &wgpu::Queue, avatar: &SceneModel) {
        self.avatar.sync(queue, avatar);
    }

    pub fn render(&self) -> Render<'_> {
        Render::Composed(vec![self.ground.render(), self.decor.render(), self.avatar.render()])
    }
}
