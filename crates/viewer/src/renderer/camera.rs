use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

pub const MIN_DISTANCE: f32 = 0.1;
pub const MAX_DISTANCE: f32 = 500.0;
pub const MAX_PITCH: f32 = 89.0;

/// Perspective camera orbiting a target point. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub yfov: f32,
    pub znear: f32,
    pub zfar: f32,
    aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            target: config.target(),
            distance: config.distance.clamp(MIN_DISTANCE, MAX_DISTANCE),
            yaw: config.yaw,
            pitch: config.pitch.clamp(-MAX_PITCH, MAX_PITCH),
            yfov: config.yfov.clamp(10.0, 120.0),
            znear: 0.01,
            zfar: 1000.0,
            aspect: 1.0,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    fn direction(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.direction() * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.yfov.to_radians(), self.aspect, self.znear, self.zfar)
    }

    pub fn matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn right(&self) -> Vec3 {
        (-self.direction()).cross(Vec3::Y).normalize_or_zero()
    }

    fn up(&self) -> Vec3 {
        self.right().cross(-self.direction()).normalize_or_zero()
    }
}

/// Accumulates pointer input between ticks and applies it to a [`Camera`].
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub rotation_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    rotate: Vec2,
    pan: Vec2,
    zoom: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            rotation_speed: 0.3,
            pan_speed: 0.002,
            zoom_speed: 0.1,
            rotate: Vec2::ZERO,
            pan: Vec2::ZERO,
            zoom: 0.0,
        }
    }
}

impl OrbitController {
    /// Pointer drag in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.rotate += delta;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Wheel steps; positive values move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        self.zoom += steps;
    }

    pub fn is_idle(&self) -> bool {
        self.rotate == Vec2::ZERO && self.pan == Vec2::ZERO && self.zoom == 0.0
    }

    /// Applies pending input and returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if self.is_idle() {
            return false;
        }

        camera.yaw += self.rotate.x * self.rotation_speed;
        camera.pitch = (camera.pitch + self.rotate.y * self.rotation_speed)
            .clamp(-MAX_PITCH, MAX_PITCH);

        let scale = camera.distance * self.pan_speed;
        let offset = camera.right() * -self.pan.x * scale + camera.up() * self.pan.y * scale;
        camera.target += offset;

        camera.distance = (camera.distance * (1.0 - self.zoom * self.zoom_speed).max(0.1))
            .clamp(MIN_DISTANCE, MAX_DISTANCE);

        self.rotate = Vec2::ZERO;
        self.pan = Vec2::ZERO;
        self.zoom = 0.0;
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_eye_orbits_target() {
        let mut camera = Camera::default();
        camera.target = Vec3::ZERO;
        camera.distance = 2.0;
        camera.yaw = 0.0;
        camera.pitch = 0.0;
        assert!(camera.eye().abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
        camera.yaw = 90.0;
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::default();
        controller.rotate(Vec2::new(0.0, 10_000.0));
        assert!(controller.update(&mut camera));
        assert_eq!(camera.pitch, MAX_PITCH);
        assert!(!controller.update(&mut camera));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::default();
        for _ in 0..200 {
            controller.zoom(5.0);
            controller.update(&mut camera);
        }
        assert_eq!(camera.distance, MIN_DISTANCE);

        let before = camera.distance;
        controller.zoom(-1.0);
        controller.update(&mut camera);
        assert!(camera.distance > before);
    }

    #[test]
    fn test_pan_moves_target_only() {
        let mut camera = Camera::default();
        let distance = camera.distance;
        let target = camera.target;
        let mut controller = OrbitController::default();
        controller.pan(Vec2::new(100.0, 0.0));
        controller.update(&mut camera);
        assert_ne!(camera.target, target);
        assert_eq!(camera.distance, distance);
    }

    #[test]
    fn test_aspect_rejects_degenerate_values() {
        let mut camera = Camera::default();
        camera.set_aspect(0.5);
        camera.set_aspect(f32::INFINITY);
        camera.set_aspect(0.0);
        assert_eq!(camera.aspect(), 0.5);
    }
}
