//! Routes window events to the camera of the viewport quadrant they land in,
//! and keyboard shortcuts to the control state.

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::controls::ViewerControls;
use crate::scene::Scene;
use crate::viewport::ViewportGrid;

/// One wheel "notch" worth of pixel-delta scrolling.
const WHEEL_PIXELS_PER_LINE: f32 = 120.0;

/// Tracks the cursor and the quadrant a drag started in. A drag keeps
/// rotating the camera it started on even when the cursor crosses into a
/// neighboring quadrant.
#[derive(Debug, Default)]
pub struct InputRouter {
    cursor: Option<(f32, f32)>,
    drag_quadrant: Option<usize>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a winit event; mutates the matching quadrant's camera or the
    /// control state. Returns true if the event was consumed.
    pub fn process_event(
        &mut self,
        event: &WindowEvent,
        grid: &ViewportGrid,
        scene: &mut Scene,
        controls: &mut ViewerControls,
    ) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                match state {
                    ElementState::Pressed => {
                        if let Some((x, y)) = self.cursor {
                            self.drag_quadrant = Some(grid.quadrant(x, y));
                        }
                    }
                    ElementState::Released => self.drag_quadrant = None,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = (position.x as f32, position.y as f32);
                if let (Some(quadrant), Some(old_pos)) = (self.drag_quadrant, self.cursor) {
                    let dx = new_pos.0 - old_pos.0;
                    let dy = new_pos.1 - old_pos.1;
                    scene.cameras[quadrant].rotate(dx, dy);
                }
                self.cursor = Some(new_pos);
                self.drag_quadrant.is_some()
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / WHEEL_PIXELS_PER_LINE,
                };
                if let Some((x, y)) = self.cursor {
                    scene.cameras[grid.quadrant(x, y)].update_distance(notches);
                    true
                } else {
                    false
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        controls.handle_key(code);
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }
}
