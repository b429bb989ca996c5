use glam::Vec3;

use crate::controls::ViewerControls;
use crate::frame::ViewFrame;
use crate::scene::{Scene, LIGHT_VIEW};
use crate::views::scene_draws;

/// The light's own view. Its matrices were already derived for the depth
/// pass this frame; the viewport shows exactly what the shadow map sees.
/// Shadow-map sampling is disabled here: nothing the light sees is in
/// shadow from the light.
pub fn compose(scene: &mut Scene, _controls: &ViewerControls) -> ViewFrame {
    let view = scene.cameras[LIGHT_VIEW].view;
    let projection = scene.cameras[LIGHT_VIEW].projection;
    let mvp = projection * view;

    // The light sits at the origin of its own view frame.
    let draws = scene_draws(scene, mvp, view, Vec3::ZERO, false);

    ViewFrame {
        clear_color: [0.0, 0.0, 0.0],
        draws,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::create_demo_scene;
    use crate::shadow::update_light_camera;

    #[test]
    fn test_light_view_never_samples_shadow_map() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        update_light_camera(&mut scene, &controls, 1.0);
        let frame = compose(&mut scene, &controls);
        assert!(!frame.draws.is_empty());
        assert!(frame.draws.iter().all(|d| !d.use_shadow_map));
    }

    #[test]
    fn test_light_is_at_view_origin() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        update_light_camera(&mut scene, &controls, 1.0);
        let frame = compose(&mut scene, &controls);
        assert!(frame.draws.iter().all(|d| d.light_pos == Vec3::ZERO));
    }

    #[test]
    fn test_uses_depth_pass_matrices() {
        let mut scene = create_demo_scene();
        let controls = ViewerControls::default();
        update_light_camera(&mut scene, &controls, 1.0);
        let expected = scene.cameras[LIGHT_VIEW].projection * scene.cameras[LIGHT_VIEW].view;
        let frame = compose(&mut scene, &controls);
        assert!(frame.draws[0].mvp.abs_diff_eq(expected, 1e-6));
    }
}
