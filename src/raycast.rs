//! Picking by casting a ray from the cursor into the scene.
//!
//! The ray is tested against the same deformed geometry the GPU draws: every
//! vertex is skinned on the CPU with the joint palette of the current frame
//! before the triangles are intersected.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

use crate::{
    camera::{Camera, Projection},
    data_structures::{model::ModelVertex, scene_graph::SceneModel},
};

const EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray from the camera through a point given in normalised device
    /// coordinates (x right, y up, both in -1..1).
    pub fn from_camera(ndc: [f32; 2], camera: &Camera, projection: &Projection) -> Option<Self> {
        let inverse = (projection.calc_matrix() * camera.calc_matrix()).invert()?;
        let point = inverse * Vector4::new(ndc[0], ndc[1], 0.5, 1.0);
        if point.w.abs() <= EPSILON {
            return None;
        }
        let point = Point3::from_vec(point.truncate() / point.w);
        let direction = point - camera.position;
        if direction.magnitude2() <= EPSILON {
            return None;
        }
        Some(Self::new(camera.position, direction))
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

/// Cursor position in physical pixels to normalised device coordinates.
///
/// Returns `None` for an empty viewport.
pub fn ndc_from_cursor(x: f64, y: f64, width: u32, height: u32) -> Option<[f32; 2]> {
    if width == 0 || height == 0 {
        return None;
    }
    Some([
        (x / width as f64 * 2.0 - 1.0) as f32,
        (-(y / height as f64) * 2.0 + 1.0) as f32,
    ])
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub distance: f32,
    pub point: Point3<f32>,
    /// Index into [`SceneModel::parts`].
    pub part: usize,
    pub primitive: usize,
    /// Index of the first of the triangle's three indices.
    pub face: usize,
}

/// Möller–Trumbore ray/triangle test. Returns the distance along the ray.
///
/// With `cull_back_faces` only triangles wound counter-clockwise as seen
/// from the ray origin are hit.
pub fn intersect_triangle(
    ray: &Ray,
    a: Point3<f32>,
    b: Point3<f32>,
    c: Point3<f32>,
    cull_back_faces: bool,
) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if cull_back_faces {
        if det < EPSILON {
            return None;
        }
    } else if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// All hits of `ray` on `model`, nearest first.
pub fn intersect_model(ray: &Ray, model: &SceneModel) -> Vec<Intersection> {
    let placement = model.placement.to_matrix();
    let mut hits = Vec::new();
    for (part_idx, part) in model.parts.iter().enumerate() {
        let Some(mesh) = model.meshes.get(part.mesh) else {
            continue;
        };
        let palette = part.joint_matrices();
        let skinned = part.skin.is_some();
        for (primitive_idx, primitive) in mesh.primitives.iter().enumerate() {
            let positions: Vec<Point3<f32>> = primitive
                .vertices
                .iter()
                .map(|vertex| deform(vertex, palette, skinned, &placement))
                .collect();
            let cull = !model.is_double_sided(primitive.material);
            for (face, triangle) in primitive.indices.chunks_exact(3).enumerate() {
                let [Some(&a), Some(&b), Some(&c)] = [
                    positions.get(triangle[0] as usize),
                    positions.get(triangle[1] as usize),
                    positions.get(triangle[2] as usize),
                ] else {
                    continue;
                };
                if let Some(distance) = intersect_triangle(ray, a, b, c, cull) {
                    hits.push(Intersection {
                        distance,
                        point: ray.at(distance),
                        part: part_idx,
                        primitive: primitive_idx,
                        face: face * 3,
                    });
                }
            }
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Bind pose position to world space, the way the vertex shader does it.
fn deform(
    vertex: &ModelVertex,
    palette: &[Matrix4<f32>],
    skinned: bool,
    placement: &Matrix4<f32>,
) -> Point3<f32> {
    let position = Point3::from(vertex.position).to_homogeneous();
    let model_space = if skinned {
        vertex
            .joints
            .iter()
            .zip(vertex.weights)
            .filter(|(_, weight)| *weight != 0.0)
            .filter_map(|(&joint, weight)| palette.get(joint as usize).map(|m| m * position * weight))
            .fold(Vector4::new(0.0, 0.0, 0.0, 0.0), |acc, v| acc + v)
    } else {
        palette.first().map_or(position, |m| m * position)
    };
    let world = placement * model_space.truncate().extend(1.0);
    Point3::new(world.x, world.y, world.z)
}
