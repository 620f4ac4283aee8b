use crate::camera3d::SurfaceRect;
use crate::config::{AppConfig, AppConfigOverrides, DEFAULT_CONFIG_PATH};
use crate::floor::FloorId;
use crate::input::{Input, InputEvent};
use crate::loader::AssetLoader;
use crate::plan::FloorPlan;
use crate::renderer::Renderer;
use crate::ui_state::UiState;
use crate::viewer::Viewer;
#[cfg(feature = "panel")]
mod panel;

use anyhow::{Context, Result};
use glam::Vec3;
use std::path::{Path, PathBuf};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};

const INPUT_BINDINGS_PATH: &str = "config/input.json";
/// Label rotation per hotkey press, in degrees around the label's Z axis.
const LABEL_ROTATION_STEP_DEGREES: f32 = 5.0;

pub async fn run() -> Result<()> {
    run_with_overrides(AppConfigOverrides::default(), PathBuf::from(DEFAULT_CONFIG_PATH)).await
}

pub async fn run_with_overrides(overrides: AppConfigOverrides, config_path: PathBuf) -> Result<()> {
    let mut config = AppConfig::load_or_default(&config_path);
    if !overrides.is_empty() {
        tracing::info!(fields = ?overrides.applied_fields(), "Applying command line overrides");
    }
    config.apply_overrides(&overrides);
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct App {
    config: AppConfig,
    renderer: Renderer,
    viewer: Viewer,
    loader: AssetLoader,
    input: Input,
    ui: UiState,
    assets_requested: bool,
    should_close: bool,
    #[cfg(feature = "panel")]
    panel: Option<panel::PanelLayer>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let plan = load_plan(&config.viewer.plan_path)?;
        let viewer = Viewer::from_plan(&plan, &config.viewer);
        let loader = AssetLoader::new()?;
        let renderer = Renderer::new(&config.window);
        Ok(Self {
            renderer,
            viewer,
            loader,
            input: Input::from_config(INPUT_BINDINGS_PATH),
            ui: UiState::default(),
            assets_requested: false,
            should_close: false,
            #[cfg(feature = "panel")]
            panel: None,
            config,
        })
    }

    /// Loads are queued once and the initial floors shown once; later `resumed`
    /// calls only rebuild the window.
    fn start_viewer(&mut self) {
        if self.assets_requested {
            return;
        }
        self.assets_requested = true;
        self.viewer.request_assets(&self.loader, self.config.viewer.font_path.clone());

        let known = self.viewer.floors().ids();
        let initial: Vec<FloorId> = self
            .config
            .viewer
            .initial_floors
            .iter()
            .map(FloorId::new)
            .filter(|floor| {
                let present = known.contains(floor);
                if !present {
                    tracing::warn!(floor = %floor, "Initial floor is not in the campus plan");
                }
                present
            })
            .collect();
        if !initial.is_empty() {
            self.viewer.activate(&initial, &mut self.ui);
        }
    }

    fn handle_input(&mut self) {
        let floors = self.viewer.floors().ids();
        for slot in self.input.take_floor_requests() {
            match floors.get(slot) {
                Some(floor) => self.viewer.activate(std::slice::from_ref(floor), &mut self.ui),
                None => tracing::debug!(slot, "No floor bound to hotkey slot"),
            }
        }

        if let Some(delta) = self.input.consume_wheel_delta() {
            self.viewer.zoom(delta);
        }
        if let Some(delta) = self.input.take_pan_delta() {
            self.viewer.pan(delta);
        }
        if let Some(delta) = self.input.take_orbit_delta() {
            self.viewer.orbit(delta);
        }

        // Leaving the scene clears the hover before hotkeys can target it.
        if self.input.take_cursor_left() {
            self.viewer.pointer_left(&mut self.ui);
        }

        let steps = self.input.take_label_rotation();
        if steps != 0 {
            if let Some(hovered) = self.viewer.hovered() {
                let angle = (steps as f32 * LABEL_ROTATION_STEP_DEGREES).to_radians();
                self.viewer.rotate_label(hovered, Vec3::new(0.0, 0.0, angle));
            }
        }

        if let Some(click) = self.input.take_click() {
            self.viewer.pointer_clicked(click, &mut self.ui);
        } else if let Some(cursor) = self.input.take_cursor_moved() {
            self.viewer.pointer_moved(cursor, &mut self.ui);
        }
    }

    fn render_frame(&mut self) {
        let size = self.renderer.size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        let frame = match self.renderer.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(error = %err, "Skipping frame");
                return;
            }
        };
        let view_proj = self.viewer.camera().view_projection(self.viewer.surface_rect().aspect());
        let clear = self.viewer.settings().palette.background.to_rgb();
        {
            let draws = self.viewer.draw_list();
            if let Err(err) = self.renderer.render_scene(&frame, view_proj, &draws, clear) {
                tracing::warn!(error = ?err, "Scene render failed");
            }
        }

        #[cfg(feature = "panel")]
        if let Some(panel) = self.panel.as_mut() {
            let Some(window) = self.renderer.window() else {
                return;
            };
            let (actions, output) = panel.run(window, &self.viewer, &mut self.ui);
            for action in actions {
                panel::apply_action(action, &mut self.viewer, &mut self.ui);
            }
            let (device, queue) = match self.renderer.device_and_queue() {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::debug!(error = %err, "Dropping frame, renderer lost its device");
                    return;
                }
            };
            if let Err(err) = panel.paint(device, queue, output, frame) {
                tracing::warn!(error = ?err, "Panel render failed");
            }
            return;
        }

        frame.present();
    }

    #[cfg(feature = "panel")]
    fn init_panel(&mut self) {
        if self.panel.is_some() {
            return;
        }
        let Some(window) = self.renderer.window() else {
            return;
        };
        let (device, format) = match (self.renderer.device_and_queue(), self.renderer.surface_format()) {
            (Ok((device, _)), Ok(format)) => (device, format),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(error = ?err, "Panel disabled, renderer not ready");
                return;
            }
        };
        self.panel = Some(panel::PanelLayer::new(window, device, format, self.renderer.size()));
    }

    #[cfg(feature = "panel")]
    fn panel_consumes(&mut self, event: &WindowEvent) -> bool {
        match (self.renderer.window(), self.panel.as_mut()) {
            (Some(window), Some(panel)) => panel.on_window_event(window, event),
            _ => false,
        }
    }

    #[cfg(not(feature = "panel"))]
    fn panel_consumes(&mut self, _event: &WindowEvent) -> bool {
        false
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.renderer.resize(size);
        self.viewer.set_surface_rect(SurfaceRect::from_size(size.width, size.height));
        #[cfg(feature = "panel")]
        if let Some(panel) = self.panel.as_mut() {
            panel.resize(size);
        }
    }
}

fn load_plan(path: &Path) -> Result<FloorPlan> {
    FloorPlan::load(path).with_context(|| format!("Failed to load campus plan '{}'", path.display()))
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.renderer.ensure_window(event_loop) {
            tracing::error!(error = ?err, "Renderer initialization failed");
            self.should_close = true;
            return;
        }
        let size = self.renderer.size();
        self.viewer.set_surface_rect(SurfaceRect::from_size(size.width, size.height));
        #[cfg(feature = "panel")]
        self.init_panel();
        self.start_viewer();
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: winit::window::WindowId, event: WindowEvent) {
        let input_event = InputEvent::from_window_event(&event);
        let consumed = self.panel_consumes(&event);
        if !consumed {
            self.input.push(input_event);
        } else if matches!(input_event, InputEvent::CursorPos { .. } | InputEvent::CursorLeft) {
            // Pointer over the panel counts as having left the scene.
            self.input.push(InputEvent::CursorLeft);
        }

        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => self.resize(*size),
            WindowEvent::RedrawRequested => self.render_frame(),
            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, .. }, .. } if !consumed => {
                if let Key::Named(NamedKey::Escape) = logical_key {
                    if *state == ElementState::Pressed {
                        self.should_close = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        if self.viewer.has_pending_assets() {
            self.viewer.poll_assets();
        }
        self.handle_input();
        self.viewer.update();
        self.input.clear_frame();
        if let Some(window) = self.renderer.window() {
            window.request_redraw();
        }
    }
}
