use anyhow::{bail, Result};
use glam::{Mat4, Vec3, Vec4};

use crate::camera::Camera;
use crate::math::inverse_checked;

/// Camera indices, one per viewport quadrant.
pub const MAIN_VIEW: usize = 0;
pub const LIGHT_VIEW: usize = 1;
pub const THIRD_PERSON_VIEW: usize = 2;
pub const POST_PERSPECTIVE_VIEW: usize = 3;

/// Immutable triangle geometry for one named object, supplied by a scene
/// builder. Normals are per-vertex averages of the adjacent face normals.
pub struct SceneObject {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub color: [f32; 4],
}

/// The scene: objects, the four cameras, the ground plane, and an aggregated
/// homogeneous vertex buffer used only for bounds queries.
///
/// There is exactly one light, defined as the origin of the light view
/// camera's frame; it has no standalone state of its own.
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub cameras: [Camera; 4],
    ground: usize,
    ground_plane: Vec4,
    verts: Vec<Vec4>,
}

impl Scene {
    /// Build a scene from loaded objects, one of which must be named
    /// `ground_name` and is assumed planar: the ground-plane equation is
    /// derived once from its first vertex normal and position.
    pub fn new(objects: Vec<SceneObject>, ground_name: &str) -> Result<Self> {
        let Some(ground) = objects.iter().position(|o| o.name == ground_name) else {
            bail!("scene has no object named '{ground_name}' to use as the ground plane");
        };
        let g = &objects[ground];
        if g.vertices.is_empty() || g.normals.is_empty() {
            bail!("ground object '{ground_name}' has no geometry");
        }
        let n = g.normals[0];
        let ground_plane = Vec4::new(n.x, n.y, n.z, -n.dot(g.vertices[0]));

        // Seed the bounds buffer with the origin, then every object vertex
        // with w = 1. A convex hull would be cheaper; this is fine at the
        // scale of the demo scenes.
        let mut verts = vec![Vec4::new(0.0, 0.0, 0.0, 1.0)];
        for object in &objects {
            verts.extend(object.vertices.iter().map(|v| v.extend(1.0)));
        }

        let cameras = [
            Camera::new(Mat4::from_rotation_x(0.4), 10.0),
            Camera::new(Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2), 5.0),
            Camera::new(
                Mat4::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.6),
                20.0,
            ),
            Camera::new(Mat4::from_rotation_x(0.2), 8.0),
        ];

        Ok(Self {
            objects,
            cameras,
            ground,
            ground_plane,
            verts,
        })
    }

    /// Index of the ground object; cheap shadows skip it.
    pub fn ground_index(&self) -> usize {
        self.ground
    }

    /// The ground plane as `(a, b, c, d)` with `ax + by + cz + d = 0` and
    /// `(a, b, c)` the outward unit normal.
    pub fn ground_plane(&self) -> Vec4 {
        self.ground_plane
    }

    /// The light position in world coordinates. The light sits at the origin
    /// of the light view frame, so this is `inverse(V_light) * origin`.
    pub fn light_pos_in_world(&self) -> Vec4 {
        inverse_checked(self.cameras[LIGHT_VIEW].view) * Vec4::new(0.0, 0.0, 0.0, 1.0)
    }

    /// The light position as seen through `view`. The divide by w only
    /// matters when `view` carries perspective (the post-perspective case).
    pub fn light_pos_in_view(&self, view: &Mat4) -> Vec3 {
        let pos = *view * self.light_pos_in_world();
        pos.truncate() / pos.w
    }

    /// All scene vertices (plus the origin) in homogeneous coordinates, for
    /// bounds queries such as frustum fitting.
    pub fn all_verts(&self) -> &[Vec4] {
        &self.verts
    }
}
