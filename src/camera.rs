//! Perspective camera with orbit controls.
//!
//! The camera looks at a fixed target and can only be spun around it: the
//! controls keep the elevation and distance inside their limits and ease the
//! user's drags out over several frames when damping is on.

use std::f32::consts::TAU;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;

use crate::config::CameraConfig;

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLE_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Update the aspect ratio. Zero sized viewports (minimised windows,
    /// hidden containers) are ignored and reported as `false`.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Radius and angles of the camera around the target.
///
/// `theta` is the azimuth around +y measured from +z, `phi` the polar angle
/// measured from +y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vector3::new(
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * cos_theta,
        )
    }
}

/// Rotation-only orbit controls. Panning and zooming are not supported.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub enable_rotate: bool,
    delta: Spherical,
}

impl OrbitControls {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            target: config.target.into(),
            min_polar_angle: config.min_polar_angle,
            max_polar_angle: config.max_polar_angle,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            enable_rotate: true,
            delta: Spherical::default(),
        }
    }

    /// Queue a rotation for a pointer drag of `dx`/`dy` pixels. A drag across
    /// the full viewport height is one full turn.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        if !self.enable_rotate || viewport_height == 0 {
            return;
        }
        let height = viewport_height as f32;
        self.rotate_left(TAU * dx * self.rotate_speed / height);
        self.rotate_up(TAU * dy * self.rotate_speed / height);
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    /// Rotation still queued, e.g. while damping eases out.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.delta.theta, self.delta.phi)
    }

    /// Move `camera` by the queued rotation and apply all limits.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.enable_damping {
            spherical.theta += self.delta.theta * self.damping_factor;
            spherical.phi += self.delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.delta.theta;
            spherical.phi += self.delta.phi;
        }

        spherical.phi = spherical
            .phi
            .max(self.min_polar_angle)
            .min(self.max_polar_angle)
            .clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON);
        spherical.radius = spherical.radius.max(self.min_distance).min(self.max_distance);

        let position = Point3::from_vec(self.target.to_vec() + spherical.to_offset());
        camera.target = self.target;

        if self.enable_damping {
            self.delta.theta *= 1.0 - self.damping_factor;
            self.delta.phi *= 1.0 - self.damping_factor;
        } else {
            self.delta = Spherical::default();
        }

        let moved = (position - camera.position).magnitude2() > f32::EPSILON * f32::EPSILON;
        camera.position = position;
        moved
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controls: OrbitControls,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, config: &CameraConfig, projection: &Projection) -> Self {
        let mut camera = Camera::new(config.position, config.target);
        let mut controls = OrbitControls::new(config);
        // apply the limits to the start position before the first frame
        controls.update(&mut camera);

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controls,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Run the controls and upload the new view.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.controls.update(&mut self.camera);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
