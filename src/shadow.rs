//! Shadow-map and cheap-shadow transform derivations.
//!
//! The shadow map is rendered from the light camera once per frame, before
//! any view pass samples it. The light-space transform handed to the shading
//! stage maps world coordinates all the way into shadow-texture coordinates.

use glam::{Mat4, Vec3, Vec4};
use log::warn;

use crate::controls::ViewerControls;
use crate::frustum::{fit_lrbt, fit_near_far};
use crate::math::{frustum_rh_gl, inverse_checked, perspective_rh_gl};
use crate::scene::{Scene, LIGHT_VIEW};

/// Shadow map resolution.
pub const SHADOW_MAP_SIZE: u32 = 512;

/// Pulls the planar projection slightly toward the light so geometry lying
/// exactly on the ground plane does not fight with its own shadow.
/// Implementation-defined tunable, not scale invariant.
const PLANE_OFFSET_EPSILON: f32 = 0.001;

/// Smallest frustum extent the auto-fitted light projection will accept.
/// A degenerate (zero-width) fit would make the projection singular.
const MIN_FRUSTUM_EXTENT: f32 = 1e-4;

/// Maps clip space [-1, 1] to texture space [0, 1]: scale 0.5 and bias 0.5
/// on X, Y and Z.
pub fn window_transform() -> Mat4 {
    Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5))
}

/// The transform taking world coordinates to shadow-map texture coordinates:
/// `window_transform * P_light * V_light`.
pub fn light_space_transform(p_light: &Mat4, v_light: &Mat4) -> Mat4 {
    window_transform() * *p_light * *v_light
}

/// Re-derive the light camera's view and projection for this frame.
///
/// Manual mode uses the FOV slider; automatic mode fits a frustum that just
/// encloses every scene vertex. Both the depth pass and the light view read
/// the matrices this writes, so the shadow map and the light viewport always
/// agree within a frame.
pub fn update_light_camera(scene: &mut Scene, controls: &ViewerControls, aspect: f32) {
    let view = scene.cameras[LIGHT_VIEW].derive_view();
    let (near, far) = fit_near_far(&view, scene.all_verts());
    let projection = if controls.manual_light_fov {
        perspective_rh_gl(controls.light_view_fov.to_radians(), aspect, near, far)
    } else {
        let (l, r, b, t) = fit_lrbt(&view, scene.all_verts(), near, far);
        let (l, r) = widen_if_degenerate(l, r, "width");
        let (b, t) = widen_if_degenerate(b, t, "height");
        let (near, far) = widen_if_degenerate(near, far, "depth");
        frustum_rh_gl(l, r, b, t, near, far)
    };
    scene.cameras[LIGHT_VIEW].projection = projection;
}

/// Clamp a fitted interval to a minimum extent so the projection built from
/// it stays invertible.
fn widen_if_degenerate(lo: f32, hi: f32, axis: &str) -> (f32, f32) {
    if hi - lo < MIN_FRUSTUM_EXTENT {
        warn!("degenerate light frustum {axis} [{lo}, {hi}], widening");
        let mid = 0.5 * (lo + hi);
        (mid - 0.5 * MIN_FRUSTUM_EXTENT, mid + 0.5 * MIN_FRUSTUM_EXTENT)
    } else {
        (lo, hi)
    }
}

/// The cheap-shadow modeling transform: flattens geometry onto the ground
/// plane `(a, b, c, d)` along rays from the light at world position `light`.
///
/// Built as `F * P * F^-1`: change basis into an orthonormal frame at the
/// light whose w axis is the plane normal, apply a planar projection, and
/// change basis back. Rendering the scene through this transform with a
/// darkened color gives a hard shadow silhouette without the shadow map.
pub fn cheap_shadow_transform(plane: Vec4, light: Vec3) -> Mat4 {
    let (a, b, c, d) = (plane.x, plane.y, plane.z, plane.w);
    let w = Vec3::new(a, b, c).normalize();

    // Any up vector not parallel to w; switch when w leans toward +-X.
    let arbitrary = if w.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let u = arbitrary.cross(w).normalize();
    let v = w.cross(u).normalize();

    // Frame with columns (u, v, w) and the light as its origin.
    let frame = Mat4::from_cols(u.extend(0.0), v.extend(0.0), w.extend(0.0), light.extend(1.0));

    // Signed distance from the light to the plane, pulled back by epsilon so
    // points on the plane project marginally in front of it.
    let distance = a * light.x + b * light.y + c * light.z + d - PLANE_OFFSET_EPSILON;

    // Planar projection in the light frame: w' = -z, so every point lands at
    // local z = -distance, i.e. on the plane.
    let projection = Mat4::from_cols(
        Vec4::new(distance, 0.0, 0.0, 0.0),
        Vec4::new(0.0, distance, 0.0, 0.0),
        Vec4::new(0.0, 0.0, distance, -1.0),
        Vec4::ZERO,
    );

    frame * projection * inverse_checked(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn test_window_transform_round_trip() {
        let wt = window_transform();
        let low = wt.project_point3(Vec3::new(-1.0, -1.0, -1.0));
        assert!(low.abs_diff_eq(Vec3::ZERO, 1e-6));
        let high = wt.project_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(high.abs_diff_eq(Vec3::ONE, 1e-6));
        let center = wt.project_point3(Vec3::ZERO);
        assert!(center.abs_diff_eq(Vec3::splat(0.5), 1e-6));
    }

    #[test]
    fn test_light_space_transform_composition() {
        let mut camera = Camera::new(Mat4::from_rotation_x(1.1), 6.0);
        let v = camera.derive_view();
        let p = perspective_rh_gl(45f32.to_radians(), 1.0, 1.0, 20.0);
        let expected = window_transform() * p * v;
        assert!(light_space_transform(&p, &v).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_cheap_shadow_frame_w_is_plane_normal() {
        // Ground plane y = 0, light overhead: w must be +Y, built from the
        // (1,0,0) arbitrary vector branch.
        let m = cheap_shadow_transform(Vec4::new(0.0, 1.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
        let projected = m.project_point3(Vec3::new(1.0, 3.0, 1.0));
        assert!(projected.y.abs() < 1e-3);
        // The shadow of (1,3,1) from a light at (0,5,0) lands at (2.5, 0, 2.5).
        assert!((projected.x - 2.5).abs() < 1e-2);
        assert!((projected.z - 2.5).abs() < 1e-2);
    }

    #[test]
    fn test_cheap_shadow_idempotent_on_plane() {
        let plane = Vec4::new(0.0, 1.0, 0.0, 0.0);
        let m = cheap_shadow_transform(plane, Vec3::new(2.0, 7.0, -1.0));
        for p in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, -4.0),
            Vec3::new(-1.5, 0.0, 2.5),
        ] {
            let projected = m.project_point3(p);
            assert!(projected.abs_diff_eq(p, 1e-2), "{p} -> {projected}");
        }
    }

    #[test]
    fn test_cheap_shadow_steep_normal_uses_other_up() {
        // A wall facing +X forces the (0,1,0) arbitrary-vector branch; the
        // projection must still flatten onto the wall plane.
        let plane = Vec4::new(1.0, 0.0, 0.0, 0.0);
        let m = cheap_shadow_transform(plane, Vec3::new(6.0, 0.0, 0.0));
        let projected = m.project_point3(Vec3::new(2.0, 1.0, 1.0));
        assert!(projected.x.abs() < 1e-3);
    }

    #[test]
    fn test_cheap_shadow_light_on_plane_is_finite() {
        // distance collapses to -epsilon: visually degenerate but defined.
        let m = cheap_shadow_transform(Vec4::new(0.0, 1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(m.is_finite());
    }

    #[test]
    fn test_tilted_plane_projection_lands_on_plane() {
        let normal = Vec3::new(1.0, 2.0, 0.5).normalize();
        // Plane through (0, 1, 0).
        let d = -normal.dot(Vec3::new(0.0, 1.0, 0.0));
        let plane = normal.extend(d);
        let light = Vec3::new(0.0, 8.0, 3.0);
        let m = cheap_shadow_transform(plane, light);
        let projected = m.project_point3(Vec3::new(0.5, 3.0, -1.0));
        let signed = normal.dot(projected) + d;
        assert!(signed.abs() < 1e-2, "distance to plane = {signed}");
    }

    #[test]
    fn test_auto_light_projection_contains_scene() {
        use crate::scene::{SceneObject, LIGHT_VIEW};

        let ground = SceneObject {
            name: "ground".into(),
            vertices: vec![
                Vec3::new(-4.0, 0.0, -4.0),
                Vec3::new(4.0, 0.0, -4.0),
                Vec3::new(4.0, 0.0, 4.0),
                Vec3::new(-4.0, 0.0, 4.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            normals: vec![Vec3::Y; 4],
            color: [0.7, 0.5, 0.5, 1.0],
        };
        let mut scene = Scene::new(vec![ground], "ground").unwrap();
        let controls = ViewerControls::default();
        assert!(!controls.manual_light_fov);
        update_light_camera(&mut scene, &controls, 1.0);

        let v = scene.cameras[LIGHT_VIEW].view;
        let p = scene.cameras[LIGHT_VIEW].projection;
        for vert in scene.all_verts() {
            let clip = p * v * *vert;
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() <= 1.0 + 1e-3);
            assert!(ndc.y.abs() <= 1.0 + 1e-3);
        }
    }

    #[test]
    fn test_degenerate_fit_is_widened_not_singular() {
        use crate::scene::{SceneObject, LIGHT_VIEW};

        // A single point under the light: zero width and height.
        let speck = SceneObject {
            name: "ground".into(),
            vertices: vec![Vec3::new(0.0, 0.0, 0.0)],
            indices: vec![],
            normals: vec![Vec3::Y],
            color: [1.0; 4],
        };
        let mut scene = Scene::new(vec![speck], "ground").unwrap();
        let controls = ViewerControls::default();
        update_light_camera(&mut scene, &controls, 1.0);
        let p = scene.cameras[LIGHT_VIEW].projection;
        assert!(p.is_finite());
        assert!(p.determinant().abs() > 0.0);
    }
}
