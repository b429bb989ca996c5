pub mod camera;
pub mod cli;
pub mod controls;
pub mod frame;
pub mod frustum;
pub mod input;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod scenes;
pub mod shadow;
pub mod viewport;
pub mod views;

pub use controls::ViewerControls;
pub use frame::{compose_frame, FramePlan};
pub use scenes::create_demo_scene;
