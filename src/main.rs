use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use shadow_viewer::cli::Cli;
use shadow_viewer::controls::ViewerControls;
use shadow_viewer::frame::compose_frame;
use shadow_viewer::input::InputRouter;
use shadow_viewer::renderer::Renderer;
use shadow_viewer::scene::Scene;
use shadow_viewer::scenes::create_demo_scene;
use shadow_viewer::viewport::ViewportGrid;

const INITIAL_WINDOW_WIDTH: u32 = 1280;
const INITIAL_WINDOW_HEIGHT: u32 = 720;

struct App {
    cli: Cli,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Scene,
    controls: ViewerControls,
    input: InputRouter,
    grid: ViewportGrid,
}

impl App {
    fn new(cli: Cli) -> Self {
        Self {
            cli,
            window: None,
            renderer: None,
            scene: create_demo_scene(),
            controls: ViewerControls::default(),
            input: InputRouter::new(),
            grid: ViewportGrid::new(INITIAL_WINDOW_WIDTH, INITIAL_WINDOW_HEIGHT),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window = match event_loop.create_window(
                Window::default_attributes()
                    .with_title("Shadow Mapping Viewer")
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        INITIAL_WINDOW_WIDTH,
                        INITIAL_WINDOW_HEIGHT,
                    )),
            ) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("failed to create window: {e}");
                    event_loop.exit();
                    return;
                }
            };

            let renderer = match pollster::block_on(Renderer::new(window.clone(), &self.scene)) {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to initialize renderer: {e}");
                    event_loop.exit();
                    return;
                }
            };

            let size = window.inner_size();
            self.grid.resize(size.width, size.height);
            self.window = Some(window);
            self.renderer = Some(renderer);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first
        if !self.cli.no_ui {
            if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
                if renderer.handle_event(window, &event) {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.grid.resize(size.width, size.height);
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                // Snapshot the controls so UI edits during this render only
                // affect the next frame.
                let snapshot = self.controls;
                let plan = compose_frame(&mut self.scene, &snapshot, self.grid.aspect_ratio);

                if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
                    match renderer.render(
                        window,
                        &plan,
                        &self.grid,
                        &mut self.controls,
                        !self.cli.no_ui,
                    ) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            renderer.resize(window.inner_size());
                        }
                        Err(e) => log::error!("render error: {e}"),
                    }
                }
            }
            other => {
                self.input
                    .process_event(&other, &self.grid, &mut self.scene, &mut self.controls);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli);

    log::info!(
        "controls: drag to orbit, wheel to zoom; keys F/C/O/U/D/E/L/M, Escape to quit"
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}
