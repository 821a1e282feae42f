use avatar_viewer::{
    animation::AnimationMixer,
    camera::{Camera, Projection},
    data_structures::{instance::Instance, model::ModelVertex, scene_graph::SceneModel},
    raycast::{Ray, intersect_model, intersect_triangle, ndc_from_cursor},
    resources::gltf::{MeshData, ModelData, NodeData, PrimitiveData, parse_model},
};
use cgmath::{Deg, InnerSpace, Point3, Vector3};
use futures::executor::block_on;

use crate::common::test_utils::{DANCE_OFFSET, MemorySource, approx_eq, decor_glb, skinned_quad_glb};

mod common;

fn load(name: &str, bytes: &[u8]) -> ModelData {
    block_on(parse_model(&MemorySource::new(), name, bytes)).expect("valid model")
}

fn forward(x: f32, y: f32) -> Ray {
    Ray::new(Point3::new(x, y, 5.0), Vector3::new(0.0, 0.0, -1.0))
}

#[test]
fn cursor_maps_to_device_coordinates() {
    assert_eq!(ndc_from_cursor(400.0, 300.0, 800, 600), Some([0.0, 0.0]));
    assert_eq!(ndc_from_cursor(0.0, 0.0, 800, 600), Some([-1.0, 1.0]));
    assert_eq!(ndc_from_cursor(800.0, 600.0, 800, 600), Some([1.0, -1.0]));
    assert_eq!(ndc_from_cursor(10.0, 10.0, 0, 600), None);
    assert_eq!(ndc_from_cursor(10.0, 10.0, 800, 0), None);
}

#[test]
fn centre_ray_points_at_the_target() {
    let camera = Camera::new((0.0, 1.0, 5.0), (0.0, 1.0, 0.0));
    let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);

    let ray = Ray::from_camera([0.0, 0.0], &camera, &projection).expect("invertible camera");

    assert_eq!(ray.origin, camera.position);
    let expected = (camera.target - camera.position).normalize();
    assert!((ray.direction - expected).magnitude() < 1e-4, "{:?}", ray.direction);
    assert!(approx_eq(ray.direction.magnitude(), 1.0));
}

#[test]
fn off_centre_rays_lean_towards_the_cursor() {
    let camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
    let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);

    let right = Ray::from_camera([0.5, 0.0], &camera, &projection).expect("ray");
    let up = Ray::from_camera([0.0, 0.5], &camera, &projection).expect("ray");

    assert!(right.direction.x > 0.0);
    assert!(approx_eq(right.direction.y, 0.0));
    assert!(up.direction.y > 0.0);
    assert!(approx_eq(up.direction.x, 0.0));
}

#[test]
fn triangle_hit_reports_the_distance() {
    let a = Point3::new(-1.0, -1.0, 0.0);
    let b = Point3::new(1.0, -1.0, 0.0);
    let c = Point3::new(0.0, 1.0, 0.0);

    let distance = intersect_triangle(&forward(0.0, 0.0), a, b, c, true).expect("hit");
    assert!(approx_eq(distance, 5.0));

    assert!(intersect_triangle(&forward(2.0, 0.0), a, b, c, true).is_none());
}

#[test]
fn back_faces_are_only_hit_when_double_sided() {
    let a = Point3::new(-1.0, -1.0, 0.0);
    let b = Point3::new(1.0, -1.0, 0.0);
    let c = Point3::new(0.0, 1.0, 0.0);
    let from_behind = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));

    assert!(intersect_triangle(&from_behind, a, b, c, true).is_none());
    let distance = intersect_triangle(&from_behind, a, b, c, false).expect("double sided hit");
    assert!(approx_eq(distance, 5.0));
}

#[test]
fn triangles_behind_the_origin_are_not_hit() {
    let a = Point3::new(-1.0, -1.0, 10.0);
    let b = Point3::new(1.0, -1.0, 10.0);
    let c = Point3::new(0.0, 1.0, 10.0);

    assert!(intersect_triangle(&forward(0.0, 0.0), a, b, c, false).is_none());
}

#[test]
fn the_skinned_quad_is_hit_in_its_current_pose() {
    let data = load("myanimation.glb", &skinned_quad_glb());
    let mut model = SceneModel::from_data(&data, Instance::new());

    let hits = intersect_model(&forward(0.0, 0.3), &model);
    assert_eq!(hits.len(), 1);
    assert!(approx_eq(hits[0].distance, 5.0));
    assert!(approx_eq(hits[0].point.y, 0.3));
    assert_eq!(hits[0].part, 0);
    assert_eq!(hits[0].primitive, 0);

    let mut mixer = AnimationMixer::new(data.clips.clone());
    let dancing = mixer.clip_action("dancing").expect("dancing clip");
    mixer.play(dancing);
    mixer.update(0.1, &mut model.tree);
    model.refresh();

    assert!(intersect_model(&forward(0.0, 0.3), &model).is_empty());
    assert_eq!(intersect_model(&forward(DANCE_OFFSET[0], 0.3), &model).len(), 1);
}

#[test]
fn the_quad_is_one_sided() {
    let data = load("myanimation.glb", &skinned_quad_glb());
    let model = SceneModel::from_data(&data, Instance::new());
    let from_behind = Ray::new(Point3::new(0.0, 0.3, -5.0), Vector3::new(0.0, 0.0, 1.0));

    assert!(intersect_model(&from_behind, &model).is_empty());
}

#[test]
fn double_sided_materials_are_hit_from_behind() {
    let data = load("diamond.glb", &decor_glb());
    let model = SceneModel::from_data(&data, Instance::new());
    let from_behind = Ray::new(Point3::new(0.2, 1.2, -5.0), Vector3::new(0.0, 0.0, 1.0));

    let hits = intersect_model(&from_behind, &model);
    assert_eq!(hits.len(), 1);
    assert!(approx_eq(hits[0].distance, 5.0));
}

#[test]
fn placement_moves_the_hit() {
    let data = load("myanimation.glb", &skinned_quad_glb());
    let model = SceneModel::from_data(&data, Instance::from(Vector3::new(0.0, 0.0, -2.0)));

    let hits = intersect_model(&forward(0.0, 0.3), &model);
    assert_eq!(hits.len(), 1);
    assert!(approx_eq(hits[0].distance, 7.0));
    assert!(approx_eq(hits[0].point.z, -2.0));
}

fn stacked_triangles() -> ModelData {
    let triangle = PrimitiveData {
        vertices: vec![
            ModelVertex::rigid([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            ModelVertex::rigid([1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            ModelVertex::rigid([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.5, 1.0]),
        ],
        indices: vec![0, 1, 2],
        material: None,
    };
    let node = |name: &str, z: f32| NodeData {
        name: Some(name.to_string()),
        transform: Instance::from(Vector3::new(0.0, 0.0, z)),
        children: Vec::new(),
        mesh: Some(0),
        skin: None,
    };
    ModelData {
        name: "stack".to_string(),
        nodes: vec![node("far", -3.0), node("near", 1.0)],
        roots: vec![0, 1],
        meshes: vec![MeshData {
            name: "triangle".to_string(),
            primitives: vec![triangle],
        }],
        materials: Vec::new(),
        skins: Vec::new(),
        clips: Vec::new(),
    }
}

#[test]
fn hits_are_sorted_nearest_first() {
    let model = SceneModel::from_data(&stacked_triangles(), Instance::new());

    let hits = intersect_model(&forward(0.0, 0.0), &model);

    assert_eq!(hits.len(), 2);
    assert!(approx_eq(hits[0].distance, 4.0));
    assert_eq!(hits[0].part, 1);
    assert!(approx_eq(hits[1].distance, 8.0));
    assert_eq!(hits[1].part, 0);
}
