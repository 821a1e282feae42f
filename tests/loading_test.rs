use avatar_viewer::{
    config::{AssetConfig, DomConfig},
    resources::{LoadProgress, load_viewer_assets},
};
use futures::executor::block_on;

use crate::common::test_utils::{MemorySource, RecordingIndicator, decor_glb, skinned_quad_glb};

mod common;

#[test]
fn loading_text_matches_the_page_format() {
    assert_eq!(DomConfig::loading_text(0), "LOADING... 0%");
    assert_eq!(DomConfig::loading_text(42), "LOADING... 42%");
    assert_eq!(DomConfig::loading_text(100), "LOADING... 100%");
}

#[test]
fn percent_is_rounded_and_needs_a_total() {
    let progress = |loaded, total| LoadProgress { loaded, total };
    assert_eq!(progress(0, Some(200)).percent(), Some(0));
    assert_eq!(progress(1, Some(200)).percent(), Some(1));
    assert_eq!(progress(100, Some(200)).percent(), Some(50));
    assert_eq!(progress(200, Some(200)).percent(), Some(100));
    assert_eq!(progress(10, None).percent(), None);
    assert_eq!(progress(0, Some(0)).percent(), None);
}

#[test]
fn loads_both_models_and_reports_avatar_progress() {
    let avatar_len = skinned_quad_glb().len();
    let source = MemorySource::with_viewer_models().chunk_size(avatar_len.div_ceil(4));
    let mut indicator = RecordingIndicator::default();

    let assets = block_on(load_viewer_assets(&source, &AssetConfig::default(), &mut indicator))
        .expect("assets should load");

    assert_eq!(assets.avatar.name, "myanimation.glb");
    assert_eq!(assets.decor.name, "diamond.glb");
    assert_eq!(source.fetched(), vec!["myanimation.glb", "diamond.glb"]);

    assert_eq!(indicator.texts.first().map(String::as_str), Some("LOADING... 0%"));
    assert_eq!(indicator.texts.last().map(String::as_str), Some("LOADING... 100%"));
    // one update before the first chunk plus one per chunk
    assert_eq!(indicator.texts.len(), 5);
    assert!(indicator.hidden);
}

#[test]
fn unknown_length_shows_no_percentage() {
    let source = MemorySource::with_viewer_models().without_length();
    let mut indicator = RecordingIndicator::default();

    block_on(load_viewer_assets(&source, &AssetConfig::default(), &mut indicator)).expect("assets should load");

    assert!(indicator.texts.is_empty());
    assert!(indicator.hidden);
}

#[test]
fn missing_avatar_names_the_avatar_and_keeps_the_indicator() {
    let source = MemorySource::new().with_file("diamond.glb", decor_glb());
    let mut indicator = RecordingIndicator::default();

    let err = block_on(load_viewer_assets(&source, &AssetConfig::default(), &mut indicator))
        .expect_err("the avatar is missing");

    assert!(format!("{:#}", err).contains("Error loading avatar model myanimation.glb"));
    assert!(!indicator.hidden);
    // the decor is never requested
    assert_eq!(source.fetched(), vec!["myanimation.glb"]);
}

#[test]
fn missing_decor_names_the_decor() {
    let source = MemorySource::new().with_file("myanimation.glb", skinned_quad_glb());
    let mut indicator = RecordingIndicator::default();

    let err = block_on(load_viewer_assets(&source, &AssetConfig::default(), &mut indicator))
        .expect_err("the decor is missing");

    assert!(format!("{:#}", err).contains("Error loading decor model diamond.glb"));
    assert!(!indicator.hidden);
}

#[test]
fn corrupt_avatar_is_a_load_error() {
    let source = MemorySource::with_viewer_models().with_file("myanimation.glb", b"not a model".to_vec());
    let mut indicator = RecordingIndicator::default();

    let err = block_on(load_viewer_assets(&source, &AssetConfig::default(), &mut indicator))
        .expect_err("the avatar is not glTF");

    assert!(format!("{:#}", err).contains("Error loading avatar model"));
}

#[test]
fn configured_paths_are_used() {
    let assets = AssetConfig {
        root: "unused".to_string(),
        avatar: "models/hero.glb".to_string(),
        decor: "models/gem.glb".to_string(),
    };
    let source = MemorySource::new()
        .with_file("models/hero.glb", skinned_quad_glb())
        .with_file("models/gem.glb", decor_glb());
    let mut indicator = RecordingIndicator::default();

    let loaded = block_on(load_viewer_assets(&source, &assets, &mut indicator)).expect("assets should load");

    assert_eq!(loaded.avatar.name, "models/hero.glb");
    assert_eq!(source.fetched(), vec!["models/hero.glb", "models/gem.glb"]);
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn file_source_streams_with_progress() {
    use avatar_viewer::resources::{AssetSource, FileSource};

    let source = FileSource::new(env!("CARGO_MANIFEST_DIR"));
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut reports = Vec::new();

    let bytes = runtime
        .block_on(source.fetch("Cargo.toml", &mut |progress: LoadProgress| reports.push(progress)))
        .expect("Cargo.toml is readable");

    let last = reports.last().copied().expect("progress was reported");
    assert_eq!(last.loaded, bytes.len() as u64);
    assert_eq!(last.total, Some(bytes.len() as u64));
    assert_eq!(last.percent(), Some(100));

    let missing = runtime.block_on(source.fetch("does-not-exist.glb", &mut |_: LoadProgress| {}));
    assert!(missing.is_err());
}
