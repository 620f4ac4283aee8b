use anyhow::Result;
use egui::Context as EguiCtx;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
use egui_winit::State as EguiWinit;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::floor::FloorId;
use crate::renderer::{egui_pass, SurfaceFrame};
use crate::ui_state::UiState;
use crate::viewer::Viewer;

const PANEL_WIDTH: f32 = 240.0;

/// What the panel asked the viewer to do this frame.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum PanelAction {
    ShowFloor(FloorId),
    Focus(String),
    Submit,
}

pub(super) struct PanelOutput {
    jobs: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
}

pub(super) struct PanelLayer {
    ctx: EguiCtx,
    state: EguiWinit,
    painter: EguiRenderer,
    screen: ScreenDescriptor,
}

impl PanelLayer {
    pub(super) fn new(
        window: &Window,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
    ) -> Self {
        let ctx = EguiCtx::default();
        let pixels_per_point = window.scale_factor() as f32;
        let state =
            EguiWinit::new(ctx.clone(), egui::ViewportId::ROOT, window, Some(pixels_per_point), window.theme(), None);
        let painter = EguiRenderer::new(device, format, RendererOptions::default());
        let screen = ScreenDescriptor { size_in_pixels: [size.width, size.height], pixels_per_point };
        Self { ctx, state, painter, screen }
    }

    /// Feeds `event` to egui. True when the scene should not see it.
    pub(super) fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        let pointer_event = matches!(
            event,
            WindowEvent::CursorMoved { .. } | WindowEvent::MouseInput { .. } | WindowEvent::MouseWheel { .. }
        );
        response.consumed || (pointer_event && self.ctx.is_pointer_over_area())
    }

    pub(super) fn resize(&mut self, size: PhysicalSize<u32>) {
        self.screen.size_in_pixels = [size.width, size.height];
    }

    pub(super) fn run(
        &mut self,
        window: &Window,
        viewer: &Viewer,
        ui_state: &mut UiState,
    ) -> (Vec<PanelAction>, PanelOutput) {
        let raw_input = self.state.take_egui_input(window);
        let floors = viewer.floors().ids();
        let mut actions = Vec::new();
        let full_output = self.ctx.run(raw_input, |ctx| {
            actions.clear();
            egui::SidePanel::left("campus_panel").exact_width(PANEL_WIDTH).show(ctx, |ui| {
                draw_panel(ui, viewer, &floors, ui_state, &mut actions);
            });
        });
        let egui::FullOutput { platform_output, textures_delta, shapes, pixels_per_point, .. } = full_output;
        self.state.handle_platform_output(window, platform_output);
        self.screen.pixels_per_point = pixels_per_point;
        let jobs = self.ctx.tessellate(shapes, pixels_per_point);
        (actions, PanelOutput { jobs, textures: textures_delta })
    }

    pub(super) fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output: PanelOutput,
        frame: SurfaceFrame,
    ) -> Result<()> {
        for (id, delta) in &output.textures.set {
            self.painter.update_texture(device, queue, *id, delta);
        }
        let result = egui_pass::render(device, queue, &mut self.painter, &output.jobs, &self.screen, frame);
        for id in &output.textures.free {
            self.painter.free_texture(id);
        }
        result
    }
}

fn draw_panel(
    ui: &mut egui::Ui,
    viewer: &Viewer,
    floors: &[FloorId],
    state: &mut UiState,
    actions: &mut Vec<PanelAction>,
) {
    ui.heading("Campus");
    if !viewer.font_ready() {
        ui.weak("Room labels not loaded");
    }
    if let Some(room) = &state.hovered_room {
        ui.label(format!("Pointer over {room}"));
    }
    ui.separator();

    if state.show_floor_buttons {
        ui.horizontal_wrapped(|ui| {
            for floor in floors {
                let active = state.is_floor_active(floor);
                if ui.selectable_label(active, floor.as_str()).clicked() {
                    actions.push(PanelAction::ShowFloor(floor.clone()));
                }
            }
        });
        ui.separator();
    }

    if state.show_rooms {
        egui::CollapsingHeader::new("Rooms").default_open(true).show(ui, |ui| {
            egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                let mut last: Option<&str> = None;
                for shape in viewer.shapes().iter().filter(|shape| state.is_floor_active(&shape.floor)) {
                    if last == Some(shape.name.as_str()) {
                        continue;
                    }
                    last = Some(shape.name.as_str());
                    let selected = state.current_room == shape.name;
                    if ui.selectable_label(selected, &shape.name).clicked() {
                        actions.push(PanelAction::Focus(shape.name.clone()));
                    }
                }
            });
        });
    }

    if state.show_filters {
        egui::CollapsingHeader::new("Filters").default_open(false).show(ui, |ui| {
            ui.checkbox(&mut state.show_meetings, "Meetings");
            ui.checkbox(&mut state.show_lectures, "Lectures");
            ui.checkbox(&mut state.show_rooms, "Room list");
            ui.horizontal(|ui| {
                ui.label("Date");
                ui.add(egui::DragValue::new(&mut state.date_filter.day).range(1..=31));
                ui.label("/");
                ui.add(egui::DragValue::new(&mut state.date_filter.month).range(1..=12));
            });
            time_row(ui, "From", &mut state.time_start_field);
            time_row(ui, "To", &mut state.time_end_field);
            if ui.button("Apply").clicked() {
                state.apply_time_filters();
            }
        });
    }

    if !state.current_room.is_empty() {
        ui.separator();
        ui.strong(&state.current_room);
        if let Some(id) = &state.current_room_id {
            ui.label(format!("Room id: {id}"));
        }
        if let Some(capacity) = state.current_capacity {
            ui.label(format!("Capacity: {capacity}"));
        }
        if state.show_submit && ui.button("Book").clicked() {
            actions.push(PanelAction::Submit);
        }
    }
}

fn time_row(ui: &mut egui::Ui, label: &str, time: &mut crate::ui_state::TimeOfDay) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut time.hour).range(0..=23));
        ui.label(":");
        ui.add(egui::DragValue::new(&mut time.minute).range(0..=59));
    });
}

pub(super) fn apply_action(action: PanelAction, viewer: &mut Viewer, ui: &mut UiState) {
    match action {
        PanelAction::ShowFloor(floor) => viewer.activate(std::slice::from_ref(&floor), ui),
        PanelAction::Focus(name) => {
            if !viewer.focus(&name, ui) {
                tracing::debug!(room = %name, "Panel focus found no room");
            }
        }
        PanelAction::Submit => match ui.submit() {
            Some(request) => tracing::info!(%request, "Booking submitted"),
            None => tracing::warn!("Booking needs a selected room and an end time after the start"),
        },
    }
}
