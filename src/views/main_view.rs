use crate::controls::ViewerControls;
use crate::frame::ViewFrame;
use crate::frustum::fit_near_far;
use crate::math::perspective_rh_gl;
use crate::scene::{Scene, MAIN_VIEW};
use crate::shadow::cheap_shadow_transform;
use crate::views::{cheap_shadow_draws, scene_draws};

/// The main camera view: perspective from the FOV slider with near/far
/// fitted to the scene, plus the optional cheap-shadow draws.
pub fn compose(scene: &mut Scene, controls: &ViewerControls, aspect: f32) -> ViewFrame {
    let view = scene.cameras[MAIN_VIEW].derive_view();
    let (near, far) = fit_near_far(&view, scene.all_verts());
    let projection = perspective_rh_gl(controls.main_view_fov.to_radians(), aspect, near, far);
    scene.cameras[MAIN_VIEW].projection = projection;

    let mvp = projection * view;
    let light_pos = scene.light_pos_in_view(&view);
    let mut draws = scene_draws(scene, mvp, view, light_pos, controls.use_shadow_map);

    if controls.cheap_shadows {
        let flatten = cheap_shadow_transform(
            scene.ground_plane(),
            scene.light_pos_in_world().truncate(),
        );
        draws.extend(cheap_shadow_draws(scene, mvp * flatten));
    }

    ViewFrame {
        clear_color: [0.0, 0.0, 0.0],
        draws,
    }
}
