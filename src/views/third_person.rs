use crate::controls::ViewerControls;
use crate::frame::{DrawCall, DrawMesh, ViewFrame};
use crate::math::{inverse_checked, perspective_rh_gl};
use crate::scene::{Scene, LIGHT_VIEW, MAIN_VIEW, THIRD_PERSON_VIEW};
use crate::views::{axis_draws, scene_draws, LIGHT_FRUSTUM_COLOR, MAIN_FRUSTUM_COLOR};

/// A free third-person view with a fixed projection, used to inspect the
/// other cameras: it draws the world axis and, on request, the light and
/// main camera frusta by pushing the canonical cube through each camera's
/// inverse projection and view.
pub fn compose(scene: &mut Scene, controls: &ViewerControls, aspect: f32) -> ViewFrame {
    let view = scene.cameras[THIRD_PERSON_VIEW].derive_view();
    let projection = perspective_rh_gl(60f32.to_radians(), aspect, 0.1, 100.0);
    scene.cameras[THIRD_PERSON_VIEW].projection = projection;

    let mvp = projection * view;
    let light_pos = scene.light_pos_in_view(&view);
    let mut draws = scene_draws(scene, mvp, view, light_pos, controls.use_shadow_map);

    // World frame.
    draws.extend(axis_draws(mvp));

    if controls.show_light_camera {
        let inv_v = inverse_checked(scene.cameras[LIGHT_VIEW].view);
        let inv_p = inverse_checked(scene.cameras[LIGHT_VIEW].projection);
        let frustum = mvp * inv_v * inv_p;
        draws.push(DrawCall::flat(DrawMesh::FrustumCube, frustum, LIGHT_FRUSTUM_COLOR));
        draws.push(DrawCall::flat(DrawMesh::NearPlaneGrid, frustum, LIGHT_FRUSTUM_COLOR));
        draws.extend(axis_draws(mvp * inv_v));
    }

    if controls.show_main_camera {
        let inv_v = inverse_checked(scene.cameras[MAIN_VIEW].view);
        let inv_p = inverse_checked(scene.cameras[MAIN_VIEW].projection);
        draws.push(DrawCall::flat(
            DrawMesh::FrustumCube,
            mvp * inv_v * inv_p,
            MAIN_FRUSTUM_COLOR,
        ));
        draws.extend(axis_draws(mvp * inv_v));
    }

    ViewFrame {
        clear_color: [0.2, 0.2, 0.2],
        draws,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compose_frame;
    use crate::scenes::create_demo_scene;
    use glam::Vec3;

    #[test]
    fn test_frustum_cube_lands_on_light_frustum() {
        // Pushing the canonical cube through inv(V_l) * inv(P_l) and then the
        // light's own P * V must give back the canonical cube.
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        let plan = compose_frame(&mut scene, &controls, 1.0);

        let cube_draw = plan.views[2]
            .draws
            .iter()
            .find(|d| d.mesh == DrawMesh::FrustumCube)
            .expect("light frustum cube draw");

        // Undo this view's own camera, then apply the light's view-projection.
        let third = &scene.cameras[THIRD_PERSON_VIEW];
        let light = &scene.cameras[LIGHT_VIEW];
        let world_from_cube =
            inverse_checked(third.projection * third.view) * cube_draw.mvp;
        let round_trip = light.projection * light.view * world_from_cube;
        for corner in [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
        ] {
            let mapped = round_trip.project_point3(corner);
            assert!(mapped.abs_diff_eq(corner, 1e-3), "{corner} -> {mapped}");
        }
    }

    #[test]
    fn test_hiding_cameras_removes_visualizations() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls {
            show_main_camera: false,
            show_light_camera: false,
            ..Default::default()
        };
        let frame = compose(&mut scene, &controls, 1.0);
        assert!(frame
            .draws
            .iter()
            .all(|d| d.mesh != DrawMesh::FrustumCube && d.mesh != DrawMesh::NearPlaneGrid));
        // The world axis stays.
        assert_eq!(
            frame
                .draws
                .iter()
                .filter(|d| matches!(d.mesh, DrawMesh::AxisX | DrawMesh::AxisY | DrawMesh::AxisZ))
                .count(),
            3
        );
    }

    #[test]
    fn test_both_frusta_drawn_when_shown() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        let plan = compose_frame(&mut scene, &controls, 1.0);
        let cubes = plan.views[2]
            .draws
            .iter()
            .filter(|d| d.mesh == DrawMesh::FrustumCube)
            .count();
        let grids = plan.views[2]
            .draws
            .iter()
            .filter(|d| d.mesh == DrawMesh::NearPlaneGrid)
            .count();
        assert_eq!(cubes, 2);
        // Only the light frustum carries the near-plane grid.
        assert_eq!(grids, 1);
    }
}
