use glam::{Mat4, Vec3};

use crate::controls::ViewerControls;
use crate::frame::{DrawCall, DrawMesh, ViewFrame};
use crate::math::{inverse_checked, perspective_rh_gl};
use crate::scene::{Scene, LIGHT_VIEW, MAIN_VIEW, POST_PERSPECTIVE_VIEW};
use crate::views::{axis_draws, scene_draws, LIGHT_FRUSTUM_COLOR, MAIN_FRUSTUM_COLOR};

/// Reflection in Z. Composing two projective transforms flips handedness;
/// this puts the post-perspective scene back in a right-handed frame.
fn reflect_z() -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0))
}

/// The scene as it looks after the main camera's view and projection: the
/// modeling transform is `reflectZ * P_main * V_main`, so the main frustum
/// becomes the canonical cube. Lighting is still computed from the main
/// camera's frame; in post-perspective space the light would be meaningless.
pub fn compose(scene: &mut Scene, controls: &ViewerControls, aspect: f32) -> ViewFrame {
    let view = scene.cameras[POST_PERSPECTIVE_VIEW].derive_view();
    let projection = perspective_rh_gl(60f32.to_radians(), aspect, 0.1, 100.0);
    scene.cameras[POST_PERSPECTIVE_VIEW].projection = projection;

    let main_v = scene.cameras[MAIN_VIEW].view;
    let main_p = scene.cameras[MAIN_VIEW].projection;
    let modeling = reflect_z() * main_p * main_v;
    let mvp = projection * view * modeling;

    // Lighting as if for the main camera view.
    let light_pos = scene.light_pos_in_view(&main_v);
    let mut draws = scene_draws(scene, mvp, main_v, light_pos, controls.use_shadow_map);

    // Origin of the canonical view volume frame.
    let ccv = projection * view * reflect_z();
    draws.extend(axis_draws(ccv));

    if controls.show_light_camera {
        let inv_v = inverse_checked(scene.cameras[LIGHT_VIEW].view);
        let inv_p = inverse_checked(scene.cameras[LIGHT_VIEW].projection);
        let carried = projection * view * modeling * inv_v;
        let frustum = carried * inv_p;
        draws.push(DrawCall::flat(DrawMesh::FrustumCube, frustum, LIGHT_FRUSTUM_COLOR));
        draws.push(DrawCall::flat(DrawMesh::NearPlaneGrid, frustum, LIGHT_FRUSTUM_COLOR));
        draws.extend(axis_draws(carried));
    }

    if controls.show_main_camera {
        // The main frustum in post-perspective space is the canonical cube
        // itself. Its axis is not drawn: the main eye projects to infinity.
        draws.push(DrawCall::flat(DrawMesh::FrustumCube, ccv, MAIN_FRUSTUM_COLOR));
    }

    ViewFrame {
        clear_color: [0.2, 0.2, 0.3],
        draws,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compose_frame;
    use crate::scenes::create_demo_scene;

    #[test]
    fn test_lighting_comes_from_main_camera() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        let plan = compose_frame(&mut scene, &controls, 1.0);

        let main_v = scene.cameras[MAIN_VIEW].view;
        let expected = scene.light_pos_in_view(&main_v);
        let object_draw = &plan.views[3].draws[0];
        assert!(object_draw.light_pos.abs_diff_eq(expected, 1e-5));
        assert!(object_draw.mv.abs_diff_eq(main_v, 1e-6));
    }

    #[test]
    fn test_modeling_transform_reflects_z() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        let plan = compose_frame(&mut scene, &controls, 1.0);

        // Undo this view's own camera: what remains of the scene MVP is
        // reflectZ * P_main * V_main.
        let post = &scene.cameras[POST_PERSPECTIVE_VIEW];
        let own = inverse_checked(post.projection * post.view);
        let modeling = own * plan.views[3].draws[0].mvp;
        let expected =
            reflect_z() * scene.cameras[MAIN_VIEW].projection * scene.cameras[MAIN_VIEW].view;
        assert!(modeling.abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn test_main_frustum_is_canonical_cube() {
        // The main-camera frustum draw and the CCV axis share the same
        // transform: P * V * reflectZ, nothing else.
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        let frame = compose(&mut scene, &controls, 1.0);

        let cube = frame
            .draws
            .iter()
            .filter(|d| d.mesh == DrawMesh::FrustumCube)
            .last()
            .unwrap();
        let axis_x = frame
            .draws
            .iter()
            .find(|d| d.mesh == DrawMesh::AxisX)
            .unwrap();
        assert!(cube.mvp.abs_diff_eq(axis_x.mvp, 1e-6));
        assert_eq!(cube.color, MAIN_FRUSTUM_COLOR);
    }
}
