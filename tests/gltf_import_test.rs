use avatar_viewer::{
    animation::{Interpolation, Keyframes},
    resources::gltf::{parse_model, relative_to},
};
use futures::executor::block_on;

use crate::common::test_utils::{MemorySource, approx_eq, decor_glb, glb, skinned_quad, skinned_quad_glb};

mod common;

#[test]
fn skinned_quad_is_imported_with_skin_and_clips() {
    let source = MemorySource::new();
    let model = block_on(parse_model(&source, "myanimation.glb", &skinned_quad_glb())).expect("valid GLB");

    assert_eq!(model.roots, vec![0]);
    assert_eq!(model.nodes.len(), 3);
    assert_eq!(model.nodes[0].children, vec![1, 2]);
    assert_eq!(model.nodes[1].mesh, Some(0));
    assert_eq!(model.nodes[1].skin, Some(0));
    assert_eq!(model.nodes[2].name.as_deref(), Some("Bone"));

    let primitive = &model.meshes[0].primitives[0];
    assert_eq!(primitive.vertices.len(), 4);
    assert_eq!(primitive.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(primitive.material, None);
    assert!(primitive.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    assert!(primitive.vertices.iter().all(|v| v.weights == [1.0, 0.0, 0.0, 0.0]));

    assert_eq!(model.skins.len(), 1);
    assert_eq!(model.skins[0].joints, vec![2]);
    assert_eq!(model.skins[0].inverse_bind_matrices.len(), 1);

    let pointing = model.clip("pointing").expect("pointing clip");
    assert!(approx_eq(pointing.duration, 2.0));
    let dancing = model.clip("dancing").expect("dancing clip");
    assert!(approx_eq(dancing.duration, 1.0));
    assert_eq!(dancing.tracks.len(), 1);
    assert_eq!(dancing.tracks[0].node, 2);
    assert_eq!(dancing.tracks[0].interpolation, Interpolation::Linear);
    assert!(matches!(dancing.tracks[0].keyframes, Keyframes::Translation(ref values) if values.len() == 2));
}

#[test]
fn decor_gets_material_transform_and_computed_normals() {
    let source = MemorySource::new();
    let model = block_on(parse_model(&source, "diamond.glb", &decor_glb())).expect("valid GLB");

    assert_eq!(model.roots, vec![1]);
    assert_eq!(model.nodes[1].transform.position, cgmath::Vector3::new(0.0, 1.0, 0.0));
    assert!(model.clips.is_empty());
    assert!(model.skins.is_empty());

    let material = &model.materials[0];
    assert_eq!(material.name, "Gem");
    assert_eq!(material.base_color, [0.2, 0.4, 0.8, 1.0]);
    assert!(material.double_sided);
    assert!(approx_eq(material.metallic, 0.5));
    assert!(approx_eq(material.roughness, 0.25));
    assert!(material.base_color_texture.is_none());

    let primitive = &model.meshes[0].primitives[0];
    // no index accessor: the vertices are drawn in order
    assert_eq!(primitive.indices, vec![0, 1, 2]);
    assert_eq!(primitive.material, Some(0));
    for vertex in &primitive.vertices {
        assert!(approx_eq(vertex.normal[2], 1.0), "normal {:?}", vertex.normal);
    }
}

#[test]
fn external_buffers_are_fetched_next_to_the_model() {
    let (json, bin) = skinned_quad(Some("quad.bin"));
    let source = MemorySource::new()
        .with_file("models/quad.gltf", json.clone().into_bytes())
        .with_file("models/quad.bin", bin);

    let model = block_on(parse_model(&source, "models/quad.gltf", json.as_bytes())).expect("valid glTF");

    assert_eq!(source.fetched(), vec!["models/quad.bin"]);
    assert_eq!(model.meshes[0].primitives[0].vertices.len(), 4);
    assert!(model.clip("dancing").is_some());
}

#[test]
fn missing_external_buffer_is_an_error() {
    let (json, _) = skinned_quad(Some("quad.bin"));
    let source = MemorySource::new();

    let err = block_on(parse_model(&source, "quad.gltf", json.as_bytes())).expect_err("buffer missing");

    assert!(format!("{:#}", err).contains("quad.bin"));
}

#[test]
fn data_uris_are_rejected() {
    let (json, _) = skinned_quad(Some("data:application/octet-stream;base64,AAAA"));
    let source = MemorySource::new();

    let err = block_on(parse_model(&source, "inline.gltf", json.as_bytes())).expect_err("data URI");

    assert!(format!("{:#}", err).contains("data: URI"));
    assert!(source.fetched().is_empty());
}

#[test]
fn truncated_binary_chunk_is_an_error() {
    let (json, bin) = skinned_quad(None);
    let truncated = glb(&json, &bin[..bin.len() / 2]);
    let source = MemorySource::new();

    assert!(block_on(parse_model(&source, "broken.glb", &truncated)).is_err());
}

#[test]
fn garbage_is_not_gltf() {
    let source = MemorySource::new();
    let err = block_on(parse_model(&source, "noise.glb", &[1, 2, 3, 4, 5])).expect_err("not glTF");
    assert!(format!("{:#}", err).contains("noise.glb is not valid glTF"));
}

#[test]
fn relative_paths_resolve_against_the_model_directory() {
    assert_eq!(relative_to("avatar.gltf", "avatar.bin"), "avatar.bin");
    assert_eq!(relative_to("models/avatar.gltf", "avatar.bin"), "models/avatar.bin");
    assert_eq!(
        relative_to("models/hero/avatar.gltf", "textures/skin.png"),
        "models/hero/textures/skin.png"
    );
}
