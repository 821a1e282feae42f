use avatar_viewer::{camera::Projection, config::WindowConfig, context::supported_sample_count, flow::apply_resize};
use cgmath::Deg;

use crate::common::test_utils::approx_eq;

mod common;

fn surface(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu::TextureFormat::Bgra8UnormSrgb,
        width,
        height,
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

fn viewport() -> (wgpu::SurfaceConfiguration, Projection) {
    (surface(800, 600), Projection::new(800, 600, Deg(45.0), 0.1, 100.0))
}

#[test]
fn resize_updates_surface_and_aspect_together() {
    let (mut config, mut projection) = viewport();

    assert!(apply_resize(&mut config, &mut projection, 1280, 640));

    assert_eq!((config.width, config.height), (1280, 640));
    assert!(approx_eq(projection.aspect(), 2.0));
}

#[test]
fn zero_sizes_leave_the_viewport_untouched() {
    let (mut config, mut projection) = viewport();

    assert!(!apply_resize(&mut config, &mut projection, 0, 480));
    assert!(!apply_resize(&mut config, &mut projection, 640, 0));
    assert!(!apply_resize(&mut config, &mut projection, 0, 0));

    assert_eq!((config.width, config.height), (800, 600));
    assert!(approx_eq(projection.aspect(), 800.0 / 600.0));
}

#[test]
fn repeating_a_resize_changes_nothing() {
    let (mut config, mut projection) = viewport();
    assert!(apply_resize(&mut config, &mut projection, 1024, 768));

    assert!(!apply_resize(&mut config, &mut projection, 1024, 768));
    assert!(!apply_resize(&mut config, &mut projection, 1024, 768));

    assert_eq!((config.width, config.height), (1024, 768));
    assert!(approx_eq(projection.aspect(), 1024.0 / 768.0));
}

#[test]
fn the_initial_size_is_not_a_change() {
    let (mut config, mut projection) = viewport();
    assert!(!apply_resize(&mut config, &mut projection, 800, 600));
}

#[test]
fn antialiasing_is_on_by_default() {
    assert_eq!(WindowConfig::default().msaa_samples, 4);
}

#[test]
fn sample_count_falls_back_to_what_is_supported() {
    assert_eq!(supported_sample_count(4, |_| true), 4);
    assert_eq!(supported_sample_count(4, |count| count <= 2), 2);
    assert_eq!(supported_sample_count(4, |_| false), 1);
    // not a power of two: the next lower one is tried first
    assert_eq!(supported_sample_count(6, |_| true), 4);
    assert_eq!(supported_sample_count(1, |_| true), 1);
    assert_eq!(supported_sample_count(0, |_| true), 1);
}
