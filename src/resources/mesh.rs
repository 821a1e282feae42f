use cgmath::InnerSpace;
use log::warn;

use crate::{data_structures::model::ModelVertex, resources::gltf::PrimitiveData};

/// Read one glTF primitive into a triangle list.
///
/// Returns `None` (with a warning) for primitives that cannot be drawn as
/// triangles: missing positions, non-triangle modes or broken indices.
pub fn read_primitive(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Option<PrimitiveData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        warn!("Skipping primitive {} drawn as {:?}", primitive.index(), primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let Some(positions) = reader.read_positions() else {
        warn!("Skipping primitive {} without positions", primitive.index());
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex::rigid(position, [0.0; 3], [0.0; 2]))
        .collect();

    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }
    if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
        vertices
            .iter_mut()
            .zip(joints.into_u16().zip(weights.into_f32()))
            .for_each(|(vertex, (joints, weights))| {
                vertex.joints = joints.map(u32::from);
                vertex.weights = weights;
            });
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 || indices.iter().any(|&i| i as usize >= vertices.len()) {
        warn!("Skipping primitive {} with invalid indices", primitive.index());
        return None;
    }

    match reader.read_normals() {
        Some(normals) => vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal),
        None => compute_normals(&mut vertices, &indices),
    }
    match reader.read_tangents() {
        Some(tangents) => vertices.iter_mut().zip(tangents).for_each(|(vertex, tangent)| {
            let normal = cgmath::Vector3::from(vertex.normal);
            let t = cgmath::Vector3::new(tangent[0], tangent[1], tangent[2]);
            vertex.tangent = t.into();
            // w carries the handedness of the tangent frame
            vertex.bitangent = (normal.cross(t) * tangent[3]).into();
        }),
        None => compute_tangents(&mut vertices, &indices),
    }

    Some(PrimitiveData {
        vertices,
        indices,
        material: primitive.material().index(),
    })
}

/// Area-weighted smooth normals for geometry that comes without them.
pub fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for c in indices.chunks_exact(3) {
        let p0 = cgmath::Vector3::from(vertices[c[0] as usize].position);
        let p1 = cgmath::Vector3::from(vertices[c[1] as usize].position);
        let p2 = cgmath::Vector3::from(vertices[c[2] as usize].position);
        let face = (p1 - p0).cross(p2 - p0);
        for &i in c {
            sums[i as usize] += face;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        if sum.magnitude2() > f32::EPSILON {
            vertex.normal = sum.normalize().into();
        }
    }
}

/// Tangents and bitangents from the UV layout, for normal mapping.
///
/// Each triangle contributes one tangent frame to its three corners and the
/// frames are averaged per vertex. Triangles with degenerate UVs are skipped.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let v0 = vertices[c[0] as usize];
        let v1 = vertices[c[1] as usize];
        let v2 = vertices[c[2] as usize];

        let pos0: cgmath::Vector3<_> = v0.position.into();
        let pos1: cgmath::Vector3<_> = v1.position.into();
        let pos2: cgmath::Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // flipped for right-handed normal maps in wgpu's texture space
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for &i in c {
            let v = &mut vertices[i as usize];
            v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
            triangles_included[i as usize] += 1;
        }
    }

    for (i, n) in triangles_included.into_iter().enumerate() {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        let v = &mut vertices[i];
        v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
        v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
    }
}

/// A closed cylinder around the y axis, centred at the origin.
///
/// The side has `radial_segments` quads; both caps are triangle fans. The
/// seam vertex is duplicated so the side UVs wrap cleanly.
pub fn cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> (Vec<ModelVertex>, Vec<u32>) {
    let segments = radial_segments.max(3);
    let half = height / 2.0;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // side
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (sin, cos) = (u * std::f32::consts::TAU).sin_cos();
        let normal = cgmath::Vector3::new(sin, slope, cos).normalize().into();
        vertices.push(ModelVertex::rigid(
            [radius_top * sin, half, radius_top * cos],
            normal,
            [u, 0.0],
        ));
        vertices.push(ModelVertex::rigid(
            [radius_bottom * sin, -half, radius_bottom * cos],
            normal,
            [u, 1.0],
        ));
    }
    for i in 0..segments {
        let top = 2 * i;
        let bottom = top + 1;
        let next_top = top + 2;
        let next_bottom = top + 3;
        indices.extend_from_slice(&[top, bottom, next_bottom, top, next_bottom, next_top]);
    }

    // caps
    for (y, radius, normal_y) in [(half, radius_top, 1.0f32), (-half, radius_bottom, -1.0)] {
        let center = vertices.len() as u32;
        vertices.push(ModelVertex::rigid([0.0, y, 0.0], [0.0, normal_y, 0.0], [0.5, 0.5]));
        for i in 0..=segments {
            let (sin, cos) = (i as f32 / segments as f32 * std::f32::consts::TAU).sin_cos();
            vertices.push(ModelVertex::rigid(
                [radius * sin, y, radius * cos],
                [0.0, normal_y, 0.0],
                [sin * 0.5 + 0.5, cos * 0.5 + 0.5],
            ));
        }
        for i in 0..segments {
            let current = center + 1 + i;
            if normal_y > 0.0 {
                indices.extend_from_slice(&[center, current, current + 1]);
            } else {
                indices.extend_from_slice(&[center, current + 1, current]);
            }
        }
    }

    compute_tangents(&mut vertices, &indices);
    (vertices, indices)
}
