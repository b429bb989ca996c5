use glam::{Mat4, Vec3};

pub const MOUSE_ROTATION_SPEED: f32 = 0.01;
pub const ZOOM_BASE: f32 = 1.1;

/// An orbit camera: a rotation about the origin plus a distance along the
/// rotated -Z axis. The view matrix is always re-derived from these two
/// values, never mutated on its own.
pub struct Camera {
    /// Rotation controlled by mouse drag.
    pub rotation: Mat4,
    /// Distance from the origin, controlled by the mouse wheel.
    pub distance: f32,
    /// World-to-camera transform, derived from (rotation, distance).
    pub view: Mat4,
    /// Camera-to-clip transform, set by the owning view each frame.
    pub projection: Mat4,
}

impl Camera {
    pub fn new(rotation: Mat4, distance: f32) -> Self {
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -distance)) * rotation;
        Self {
            rotation,
            distance,
            view,
            projection: Mat4::IDENTITY,
        }
    }

    /// Exponential zoom: one wheel notch scales the distance by 1.1.
    /// Unbounded by design; the distance stays positive for any finite input.
    pub fn update_distance(&mut self, mult: f32) {
        self.distance *= ZOOM_BASE.powf(mult);
    }

    /// Re-derive the view matrix: translate(0,0,-distance) * rotation.
    pub fn derive_view(&mut self) -> Mat4 {
        self.view = Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance)) * self.rotation;
        self.view
    }

    /// Orbit from a mouse drag delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let rx = Mat4::from_rotation_x(dy * MOUSE_ROTATION_SPEED);
        let ry = Mat4::from_rotation_y(dx * MOUSE_ROTATION_SPEED);
        self.rotation = ry * rx * self.rotation;
    }
}
