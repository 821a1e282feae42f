//! CPU-side import of glTF / GLB models.
//!
//! Everything here is plain data: [`parse_model`] turns the bytes of a model
//! file into a [`ModelData`] without touching the GPU, so loading can be
//! tested headless. The GPU upload happens later in [`crate::scene`].

use anyhow::{Context, bail};
use cgmath::SquareMatrix;
use log::warn;

use crate::{
    animation::AnimationClip,
    data_structures::{instance::Instance, model::ModelVertex},
    resources::{AssetSource, LoadProgress, animation, mesh},
};

#[derive(Clone, Debug)]
pub struct ModelData {
    pub name: String,
    pub nodes: Vec<NodeData>,
    /// Root nodes of the scene that is displayed.
    pub roots: Vec<usize>,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub skins: Vec<SkinData>,
    pub clips: Vec<AnimationClip>,
}

impl ModelData {
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|clip| clip.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct NodeData {
    pub name: Option<String>,
    pub transform: Instance,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub primitives: Vec<PrimitiveData>,
}

/// One triangle list with a single material.
#[derive(Clone, Debug)]
pub struct PrimitiveData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<ImageData>,
    pub normal_texture: Option<ImageData>,
    pub roughness: f32,
    pub metallic: f32,
    pub double_sided: bool,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: [1.0; 4],
            base_color_texture: None,
            normal_texture: None,
            roughness: 1.0,
            metallic: 0.0,
            double_sided: false,
        }
    }
}

/// Decoded RGBA8 pixels.
#[derive(Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct SkinData {
    /// Node index of every joint, in palette order.
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Vec<cgmath::Matrix4<f32>>,
}

/// Parse a `.glb` or `.gltf` file.
///
/// `name` is the path the bytes were fetched from; external buffers and
/// images are resolved relative to it and fetched through `source`.
pub async fn parse_model<S: AssetSource>(
    source: &S,
    name: &str,
    bytes: &[u8],
) -> anyhow::Result<ModelData> {
    let gltf = gltf::Gltf::from_slice(bytes).with_context(|| format!("{} is not valid glTF", name))?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .with_context(|| format!("{} references a binary chunk it does not contain", name))?,
            gltf::buffer::Source::Uri(uri) => fetch_external(source, name, uri).await?,
        };
        if data.len() < buffer.length() {
            bail!(
                "Buffer {} of {} holds {} bytes, {} expected",
                buffer.index(),
                name,
                data.len(),
                buffer.length()
            );
        }
        buffer_data.push(data);
    }

    let mut images = Vec::new();
    for image in gltf.images() {
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let data = &buffer_data[view.buffer().index()];
                let bytes = data
                    .get(view.offset()..view.offset() + view.length())
                    .with_context(|| format!("Image {} of {} lies outside its buffer", image.index(), name))?;
                decode_image(bytes, Some(mime_type))
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let bytes = fetch_external(source, name, uri).await?;
                decode_image(&bytes, mime_type)
            }
        };
        images.push(decoded.with_context(|| format!("Failed to decode image {} of {}", image.index(), name))?);
    }

    let materials = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let base_color_texture = pbr.base_color_texture().and_then(|info| {
                if info.tex_coord() != 0 {
                    warn!("Only TEXCOORD_0 is supported, {} uses set {}", name, info.tex_coord());
                }
                images.get(info.texture().source().index()).cloned()
            });
            let normal_texture = material
                .normal_texture()
                .and_then(|normal| images.get(normal.texture().source().index()).cloned());
            MaterialData {
                name: material.name().unwrap_or("material").to_string(),
                base_color: pbr.base_color_factor(),
                base_color_texture,
                normal_texture,
                roughness: pbr.roughness_factor(),
                metallic: pbr.metallic_factor(),
                double_sided: material.double_sided(),
            }
        })
        .collect();

    let meshes = gltf
        .meshes()
        .map(|gltf_mesh| {
            let mesh_name = gltf_mesh.name().unwrap_or("mesh").to_string();
            let primitives = gltf_mesh
                .primitives()
                .filter_map(|primitive| {
                    if primitive.morph_targets().next().is_some() {
                        warn!("Morph targets of {} in {} are ignored", mesh_name, name);
                    }
                    mesh::read_primitive(&primitive, &buffer_data)
                })
                .collect();
            MeshData {
                name: mesh_name,
                primitives,
            }
        })
        .collect();

    let skins = gltf
        .skins()
        .map(|skin| {
            let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
            let reader = skin.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let inverse_bind_matrices = reader
                .read_inverse_bind_matrices()
                .map(|matrices| matrices.map(cgmath::Matrix4::from).collect())
                .unwrap_or_else(|| vec![cgmath::Matrix4::identity(); joints.len()]);
            SkinData {
                joints,
                inverse_bind_matrices,
            }
        })
        .collect();

    let nodes = gltf
        .nodes()
        .map(|node| NodeData {
            name: node.name().map(str::to_string),
            transform: Instance::from(node.transform()),
            children: node.children().map(|child| child.index()).collect(),
            mesh: node.mesh().map(|mesh| mesh.index()),
            skin: node.skin().map(|skin| skin.index()),
        })
        .collect();

    let roots = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .map(|scene| scene.nodes().map(|node| node.index()).collect())
        .unwrap_or_default();

    let clips = animation::read_clips(&gltf, &buffer_data);

    Ok(ModelData {
        name: name.to_string(),
        nodes,
        roots,
        meshes,
        materials,
        skins,
        clips,
    })
}

async fn fetch_external<S: AssetSource>(source: &S, model: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    if uri.starts_with("data:") {
        bail!("{} embeds a data: URI, which is not supported", model);
    }
    let path = relative_to(model, uri);
    source
        .fetch(&path, &mut |_: LoadProgress| {})
        .await
        .with_context(|| format!("Failed to fetch {} referenced by {}", path, model))
}

/// `uri` resolved against the directory of `model`.
pub fn relative_to(model: &str, uri: &str) -> String {
    match model.rfind('/') {
        Some(slash) => format!("{}{}", &model[..=slash], uri),
        None => uri.to_string(),
    }
}

fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> anyhow::Result<ImageData> {
    let image = match mime_type.and_then(image::ImageFormat::from_mime_type) {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    let rgba = image.to_rgba8();
    Ok(ImageData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
