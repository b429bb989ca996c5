//! Per-view frame composition. Each view recomputes its camera's matrices
//! and emits the draw calls for its quadrant: the shaded scene, then any
//! cheap-shadow or frustum/axis visualization draws.

pub mod light_view;
pub mod main_view;
pub mod post_perspective;
pub mod third_person;

use glam::{Mat4, Vec3};

use crate::frame::{DrawCall, DrawMesh};
use crate::scene::Scene;

pub const LIGHT_FRUSTUM_COLOR: [f32; 4] = [1.0, 1.0, 0.0, 0.75];
pub const MAIN_FRUSTUM_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.75];

/// Factor applied to the ground color for cheap-shadow draws.
pub const CHEAP_SHADOW_DARKEN: f32 = 0.3;

/// Lit draws of every scene object. All objects are modeled in a common
/// world frame, so one MVP serves them all.
pub(crate) fn scene_draws(
    scene: &Scene,
    mvp: Mat4,
    mv: Mat4,
    light_pos: Vec3,
    use_shadow_map: bool,
) -> Vec<DrawCall> {
    scene
        .objects
        .iter()
        .enumerate()
        .map(|(i, object)| DrawCall {
            mesh: DrawMesh::Object(i),
            mvp,
            mv,
            light_pos,
            color: object.color,
            use_lighting: true,
            use_shadow_map,
        })
        .collect()
}

/// Every non-ground object flattened onto the ground plane in a darkened
/// ground color.
pub(crate) fn cheap_shadow_draws(scene: &Scene, mvp_with_projection: Mat4) -> Vec<DrawCall> {
    let ground = scene.objects[scene.ground_index()].color;
    let darkened = ground.map(|c| c * CHEAP_SHADOW_DARKEN);
    scene
        .objects
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != scene.ground_index())
        .map(|(i, _)| DrawCall::flat(DrawMesh::Object(i), mvp_with_projection, darkened))
        .collect()
}

/// A red/green/blue coordinate frame at the given transform.
pub(crate) fn axis_draws(mvp: Mat4) -> [DrawCall; 3] {
    [
        DrawCall::flat(DrawMesh::AxisX, mvp, [1.0, 0.0, 0.0, 1.0]),
        DrawCall::flat(DrawMesh::AxisY, mvp, [0.0, 1.0, 0.0, 1.0]),
        DrawCall::flat(DrawMesh::AxisZ, mvp, [0.0, 0.0, 1.0, 1.0]),
    ]
}
