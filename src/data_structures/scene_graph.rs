//! Scene graph of a loaded model.
//!
//! glTF nodes are kept in an arena ([`NodeTree`]) and addressed by their glTF
//! index, so animation tracks and skins can refer to them directly. A
//! [`SceneModel`] adds the geometry and skins on top of the tree and keeps the
//! per-part joint matrices that both the GPU skinning and the CPU raycaster
//! consume.

use cgmath::SquareMatrix;
use log::warn;

use crate::{
    data_structures::instance::Instance,
    resources::gltf::{MeshData, ModelData, NodeData, SkinData},
};

/// Size of the joint palette uploaded per mesh part. Larger skins are truncated.
pub const MAX_JOINTS: usize = 128;

#[derive(Clone, Debug)]
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Transform as authored in the file.
    pub rest: Instance,
    /// Transform after animation has been applied.
    pub local: Instance,
    world: cgmath::Matrix4<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
}

impl NodeTree {
    pub fn from_nodes(data: &[NodeData], roots: &[usize]) -> Self {
        let mut nodes: Vec<Node> = data
            .iter()
            .map(|node| Node {
                name: node.name.clone(),
                parent: None,
                children: node.children.clone(),
                rest: node.transform,
                local: node.transform,
                world: cgmath::Matrix4::identity(),
            })
            .collect();
        for (idx, node) in data.iter().enumerate() {
            for &child in &node.children {
                match nodes.get_mut(child) {
                    Some(child) => child.parent = Some(idx),
                    None => warn!("Node {} lists a child {} that does not exist", idx, child),
                }
            }
        }
        let roots = roots.iter().copied().filter(|&r| r < nodes.len()).collect();
        let mut tree = Self { nodes, roots };
        tree.update_world_transforms();
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.name.as_deref() == Some(name))
    }

    pub fn local_mut(&mut self, idx: usize) -> Option<&mut Instance> {
        self.nodes.get_mut(idx).map(|node| &mut node.local)
    }

    pub fn rest(&self, idx: usize) -> Option<Instance> {
        self.nodes.get(idx).map(|node| node.rest)
    }

    pub fn world(&self, idx: usize) -> Option<cgmath::Matrix4<f32>> {
        self.nodes.get(idx).map(|node| node.world)
    }

    pub fn reset_to_rest(&mut self) {
        self.nodes.iter_mut().for_each(|node| node.local = node.rest);
    }

    /// Recompute every world matrix reachable from the roots (`parent * local`).
    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(usize, cgmath::Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, cgmath::Matrix4::identity()))
            .collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((idx, parent)) = stack.pop() {
            if std::mem::replace(&mut visited[idx], true) {
                warn!("Node {} is reachable twice, the hierarchy is not a tree", idx);
                continue;
            }
            let node = &mut self.nodes[idx];
            node.world = parent * node.local.to_matrix();
            let world = node.world;
            for &child in node.children.iter().rev() {
                if child < visited.len() {
                    stack.push((child, world));
                }
            }
        }
    }
}

/// One mesh-bearing node of a model.
#[derive(Clone, Debug)]
pub struct MeshPart {
    pub node: usize,
    pub mesh: usize,
    pub skin: Option<usize>,
    joint_matrices: Vec<cgmath::Matrix4<f32>>,
}

impl MeshPart {
    /// Matrices that take a vertex from bind pose to model space, indexed by
    /// the vertex joint indices. Rigid parts have exactly one entry.
    pub fn joint_matrices(&self) -> &[cgmath::Matrix4<f32>] {
        &self.joint_matrices
    }
}

/// CPU side of a model placed in the stage.
#[derive(Clone, Debug)]
pub struct SceneModel {
    pub name: String,
    pub tree: NodeTree,
    pub meshes: Vec<MeshData>,
    pub skins: Vec<SkinData>,
    pub parts: Vec<MeshPart>,
    /// Double-sidedness per material index, used to decide back-face culling.
    pub double_sided: Vec<bool>,
    pub placement: Instance,
    pub casts_shadow: bool,
}

impl SceneModel {
    pub fn from_data(data: &ModelData, placement: Instance) -> Self {
        let tree = NodeTree::from_nodes(&data.nodes, &data.roots);
        let parts = data
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                let mesh = node.mesh?;
                if mesh >= data.meshes.len() {
                    warn!("Node {} references a missing mesh {}", idx, mesh);
                    return None;
                }
                let skin = node.skin.filter(|&skin| skin < data.skins.len());
                Some(MeshPart {
                    node: idx,
                    mesh,
                    skin,
                    joint_matrices: Vec::new(),
                })
            })
            .collect();
        for (idx, skin) in data.skins.iter().enumerate() {
            if skin.joints.len() > MAX_JOINTS {
                warn!(
                    "Skin {} of {} has {} joints, only the first {} are animated",
                    idx,
                    data.name,
                    skin.joints.len(),
                    MAX_JOINTS
                );
            }
        }
        let mut model = Self {
            name: data.name.clone(),
            tree,
            meshes: data.meshes.clone(),
            skins: data.skins.clone(),
            parts,
            double_sided: data.materials.iter().map(|m| m.double_sided).collect(),
            placement,
            casts_shadow: true,
        };
        model.refresh();
        model
    }

    /// Recompute world transforms and the joint palette of every part.
    pub fn refresh(&mut self) {
        self.tree.update_world_transforms();
        let tree = &self.tree;
        let skins = &self.skins;
        for part in self.parts.iter_mut() {
            part.joint_matrices = match part.skin.and_then(|skin| skins.get(skin)) {
                Some(skin) => skin
                    .joints
                    .iter()
                    .take(MAX_JOINTS)
                    .enumerate()
                    .map(|(j, &joint)| {
                        let world = tree.world(joint).unwrap_or_else(cgmath::Matrix4::identity);
                        let inverse_bind = skin
                            .inverse_bind_matrices
                            .get(j)
                            .copied()
                            .unwrap_or_else(cgmath::Matrix4::identity);
                        world * inverse_bind
                    })
                    .collect(),
                None => vec![tree.world(part.node).unwrap_or_else(cgmath::Matrix4::identity)],
            };
        }
    }

    pub fn is_double_sided(&self, material: Option<usize>) -> bool {
        material
            .and_then(|m| self.double_sided.get(m).copied())
            .unwrap_or(false)
    }
}
