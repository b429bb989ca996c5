use winit::keyboard::KeyCode;

/// Viewing and rendering options adjusted by the control panel and keyboard.
///
/// The struct is `Copy`: each frame the app takes one snapshot and composes
/// the whole frame against it, so a toggle flipped mid-frame by the UI can
/// never tear a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerControls {
    /// Draw the main camera frustum in the third-person and post views.
    pub show_main_camera: bool,
    /// Draw the light camera frustum in the third-person and post views.
    pub show_light_camera: bool,
    /// Linear (percentage-closer) vs nearest shadow-map filtering.
    pub use_linear_filter: bool,
    /// Front-face culling in the depth pass to reduce self-shadowing.
    pub use_culling: bool,
    /// Planar-projection shadows on the ground plane, main view only.
    pub cheap_shadows: bool,
    /// Display fragment depth with respect to the light instead of color.
    pub draw_depth: bool,
    /// Display the depth recorded in the shadow map instead of color.
    pub draw_depth_map: bool,
    pub use_shadow_map: bool,
    pub use_depth_bias: bool,
    pub bias_slope_factor: f32,
    /// Fixed light FOV slider instead of automatic frustum fitting.
    pub manual_light_fov: bool,
    /// Degrees.
    pub light_view_fov: f32,
    /// Degrees.
    pub main_view_fov: f32,
}

impl Default for ViewerControls {
    fn default() -> Self {
        Self {
            show_main_camera: true,
            show_light_camera: true,
            use_linear_filter: false,
            use_culling: false,
            cheap_shadows: false,
            draw_depth: false,
            draw_depth_map: false,
            use_shadow_map: true,
            use_depth_bias: true,
            bias_slope_factor: 0.005,
            manual_light_fov: false,
            light_view_fov: 45.0,
            main_view_fov: 20.0,
        }
    }
}

impl ViewerControls {
    /// Keyboard shortcuts mirroring the control panel.
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::KeyF => self.use_linear_filter = !self.use_linear_filter,
            KeyCode::KeyC => self.use_culling = !self.use_culling,
            KeyCode::KeyO => self.cheap_shadows = !self.cheap_shadows,
            KeyCode::KeyU => self.use_shadow_map = !self.use_shadow_map,
            // Cycle: regular -> fragment depth -> map depth -> regular.
            KeyCode::KeyD => {
                if self.draw_depth {
                    self.draw_depth = false;
                    self.draw_depth_map = true;
                } else if self.draw_depth_map {
                    self.draw_depth = false;
                    self.draw_depth_map = false;
                } else {
                    self.draw_depth = true;
                }
            }
            KeyCode::KeyE => self.show_main_camera = !self.show_main_camera,
            KeyCode::KeyL => self.show_light_camera = !self.show_light_camera,
            KeyCode::KeyM => self.manual_light_fov = !self.manual_light_fov,
            _ => {}
        }
    }
}
