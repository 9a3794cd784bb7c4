//! Camera types, damped orbit controller, and view/projection uniforms.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Immutable camera parameters, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    /// Radians of orbit per pixel of drag.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// Exponential decay rate of the orbit velocity, per second.
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
            position: Point3::new(2.0, 1.5, 2.0),
            target: Point3::new(0.0, 0.0, 0.0),
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            damping: 6.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective projection with a mutable aspect ratio.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy,
            znear,
            zfar,
        }
    }

    /// Update the aspect ratio from new viewport dimensions. Zero-sized
    /// dimensions (a minimized window) are ignored, keeping the last valid
    /// projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
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
        self.view_proj = (projection.matrix() * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbit-style camera controller with inertial damping.
///
/// Dragging adds angular velocity around the camera target; the velocity
/// decays exponentially once the input stops instead of halting instantly.
/// Scrolling zooms by scaling the orbit distance, clamped to a sane range.
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub distance: f32,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    damping: f32,
    dragging: bool,
}

impl OrbitController {
    /// Derive the orbit state from the camera's current position and target.
    pub fn from_camera(camera: &Camera, config: &CameraConfig) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.magnitude();
        let pitch = (offset.y / distance).asin();
        let yaw = offset.x.atan2(offset.z);
        Self {
            distance,
            yaw: Rad(yaw),
            pitch: Rad(pitch),
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            damping: config.damping,
            dragging: false,
        }
    }

    /// Track drag and wheel state from window events.
    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 20.0,
                };
                self.zoom_velocity += scroll;
            }
            _ => {}
        }
    }

    /// Feed raw pointer motion. Only rotates while the primary button is held.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if !self.dragging {
            return;
        }
        self.yaw_velocity -= dx as f32 * self.rotate_speed;
        self.pitch_velocity -= dy as f32 * self.rotate_speed;
    }

    /// Advance the damped orbit state and reposition the camera.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        self.yaw += Rad(self.yaw_velocity);
        self.pitch += Rad(self.pitch_velocity);
        // Keep shy of the poles so the view matrix never degenerates.
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = Rad(self.pitch.0.clamp(-limit, limit));

        self.distance =
            (self.distance * (1.0 - self.zoom_velocity * self.zoom_speed)).clamp(0.2, 500.0);

        let decay = (-self.damping * dt).exp();
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;
        self.zoom_velocity *= decay;

        let offset = Vector3::new(
            self.distance * self.pitch.0.cos() * self.yaw.0.sin(),
            self.distance * self.pitch.0.sin(),
            self.distance * self.pitch.0.cos() * self.yaw.0.cos(),
        );
        camera.position = camera.target + offset;
    }
}

/// Camera state bundled with its GPU resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_matches_dimensions_exactly() {
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        assert_eq!(projection.aspect, 800.0 / 600.0);

        let projection = Projection::new(1920, 1080, Deg(75.0), 0.1, 1000.0);
        assert_eq!(projection.aspect, 1920.0 / 1080.0);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        projection.resize(1024, 768);
        let once = projection;
        projection.resize(1024, 768);
        assert_eq!(projection.aspect, once.aspect);
        let a: [[f32; 4]; 4] = projection.matrix().into();
        let b: [[f32; 4]; 4] = once.matrix().into();
        assert_eq!(a, b);
    }

    #[test]
    fn resize_ignores_zero_dimensions() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        projection.resize(0, 600);
        projection.resize(800, 0);
        assert_eq!(projection.aspect, 800.0 / 600.0);
    }

    #[test]
    fn orbit_holds_position_without_input() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(config.position, config.target);
        let mut controller = OrbitController::from_camera(&camera, &config);

        let before = camera.position;
        controller.update(&mut camera, Duration::from_millis(16));
        let after = camera.position;

        assert!((before.x - after.x).abs() < 1e-4);
        assert!((before.y - after.y).abs() < 1e-4);
        assert!((before.z - after.z).abs() < 1e-4);
    }

    #[test]
    fn orbit_velocity_decays_toward_zero() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(config.position, config.target);
        let mut controller = OrbitController::from_camera(&camera, &config);

        controller.handle_window_events(&fake_left_press());
        controller.handle_mouse(40.0, 0.0);
        let v0 = controller.yaw_velocity.abs();
        assert!(v0 > 0.0);

        controller.update(&mut camera, Duration::from_millis(16));
        let v1 = controller.yaw_velocity.abs();
        controller.update(&mut camera, Duration::from_millis(16));
        let v2 = controller.yaw_velocity.abs();

        assert!(v1 < v0);
        assert!(v2 < v1);
    }

    #[test]
    fn pitch_stays_clear_of_the_poles() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(config.position, config.target);
        let mut controller = OrbitController::from_camera(&camera, &config);

        controller.handle_window_events(&fake_left_press());
        controller.handle_mouse(0.0, -100_000.0);
        controller.update(&mut camera, Duration::from_millis(16));

        assert!(controller.pitch.0 < std::f32::consts::FRAC_PI_2);
        assert!(controller.pitch.0 > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn distance_is_preserved_while_orbiting() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(config.position, config.target);
        let mut controller = OrbitController::from_camera(&camera, &config);
        let distance = controller.distance;

        controller.handle_window_events(&fake_left_press());
        controller.handle_mouse(25.0, 10.0);
        controller.update(&mut camera, Duration::from_millis(16));

        let offset = camera.position - camera.target;
        assert!((offset.magnitude() - distance).abs() < 1e-4);
    }

    fn fake_left_press() -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state: ElementState::Pressed,
            button: MouseButton::Left,
        }
    }
}
