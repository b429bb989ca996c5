use glam::{Mat4, Vec4};

/// General frustum projection matrix with GL clip conventions, equivalent to
/// the classic `glFrustum(l, r, b, t, n, f)`. glam only ships the symmetric
/// perspective constructors, and the fitted light frustum is not symmetric in
/// general.
pub fn frustum_rh_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let w = right - left;
    let h = top - bottom;
    let d = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 * near / w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / h, 0.0, 0.0),
        Vec4::new((right + left) / w, (top + bottom) / h, -(far + near) / d, -1.0),
        Vec4::new(0.0, 0.0, -2.0 * far * near / d, 0.0),
    )
}

/// Symmetric perspective with GL clip conventions. Thin wrapper so every
/// projection in the crate goes through this module.
pub fn perspective_rh_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y, aspect, near, far)
}

/// Matrix inversion with a singularity precondition.
///
/// The view composition inverts view and projection matrices to place frustum
/// visualizations; inverting a singular matrix there is a programming error
/// (e.g. a projection that was never set up), not a recoverable condition.
pub fn inverse_checked(m: Mat4) -> Mat4 {
    let det = m.determinant();
    assert!(
        det.abs() > 1e-12,
        "attempted to invert a singular matrix (det = {det})"
    );
    m.inverse()
}
