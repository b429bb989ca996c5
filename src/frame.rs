//! Per-frame render plan. Instead of mutating shared uniform state between
//! draws, each frame is composed into explicit records: one depth pass, the
//! shadow-sampling parameters, then the draw calls of the four views, in that
//! order. The renderer executes the plan; the ordering dependency (depth pass
//! before any shadow lookup) is carried by the structure itself.

use glam::{Mat4, Vec3};

use crate::controls::ViewerControls;
use crate::scene::{Scene, LIGHT_VIEW};
use crate::shadow;
use crate::views;

/// What geometry a draw call references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMesh {
    /// A scene object, by index.
    Object(usize),
    /// The [-1, 1]^3 wireframe cube used to visualize a camera frustum.
    FrustumCube,
    /// The line grid on the frustum cube's near face.
    NearPlaneGrid,
    AxisX,
    AxisY,
    AxisZ,
}

/// One draw with every shading input it needs, fully explicit.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    pub mesh: DrawMesh,
    pub mvp: Mat4,
    /// View transform used for lighting (normals and light direction).
    pub mv: Mat4,
    /// Light position in the space of `mv`.
    pub light_pos: Vec3,
    pub color: [f32; 4],
    pub use_lighting: bool,
    pub use_shadow_map: bool,
}

impl DrawCall {
    /// An unlit, unshadowed draw in a flat color (axes, frustum lines,
    /// cheap shadows).
    pub fn flat(mesh: DrawMesh, mvp: Mat4, color: [f32; 4]) -> Self {
        Self {
            mesh,
            mvp,
            mv: Mat4::IDENTITY,
            light_pos: Vec3::ZERO,
            color,
            use_lighting: false,
            use_shadow_map: false,
        }
    }
}

/// The offscreen depth render from the light camera.
#[derive(Debug, Clone, Copy)]
pub struct DepthPass {
    /// Combined light view-projection; depth-only, no normals or color.
    pub mvp: Mat4,
    /// Cull front faces to reduce self-shadowing.
    pub cull_front_faces: bool,
}

/// Shadow-map sampling parameters shared by all views of the frame.
#[derive(Debug, Clone, Copy)]
pub struct ShadowParams {
    /// World coordinates to shadow-texture coordinates.
    pub light_space_transform: Mat4,
    pub use_linear_filter: bool,
    pub use_bias: bool,
    pub bias_slope_factor: f32,
    pub draw_depth: bool,
    pub draw_depth_map: bool,
}

/// One view's contribution to the frame.
#[derive(Debug, Clone)]
pub struct ViewFrame {
    pub clear_color: [f32; 3],
    pub draws: Vec<DrawCall>,
}

/// Everything the renderer needs for one frame, in execution order.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub depth: DepthPass,
    pub shadow: ShadowParams,
    /// Main, light, third-person, post-perspective.
    pub views: [ViewFrame; 4],
}

/// Compose the full frame from a control snapshot.
///
/// Order matters and is the same every frame: the light camera is updated
/// first so the depth pass, the light-space transform and the light view all
/// agree; the main view is composed before the third-person and
/// post-perspective views, which reference its fresh matrices.
pub fn compose_frame(scene: &mut Scene, controls: &ViewerControls, aspect: f32) -> FramePlan {
    shadow::update_light_camera(scene, controls, aspect);
    let v_light = scene.cameras[LIGHT_VIEW].view;
    let p_light = scene.cameras[LIGHT_VIEW].projection;

    let depth = DepthPass {
        mvp: p_light * v_light,
        cull_front_faces: controls.use_culling,
    };
    let shadow = ShadowParams {
        light_space_transform: shadow::light_space_transform(&p_light, &v_light),
        use_linear_filter: controls.use_linear_filter,
        use_bias: controls.use_depth_bias,
        bias_slope_factor: controls.bias_slope_factor,
        draw_depth: controls.draw_depth,
        draw_depth_map: controls.draw_depth_map,
    };

    let views = [
        views::main_view::compose(scene, controls, aspect),
        views::light_view::compose(scene, controls),
        views::third_person::compose(scene, controls, aspect),
        views::post_perspective::compose(scene, controls, aspect),
    ];

    FramePlan {
        depth,
        shadow,
        views,
    }
}
