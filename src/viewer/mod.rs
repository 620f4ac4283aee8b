//! The viewer core: one owner for the camera, floor registry, room shapes and
//! the clickable-part index. Interaction entry points live in the submodules
//! as further `impl Viewer` blocks.

mod director;
mod dispatch;
mod draw;
mod floor_control;

pub use draw::{DrawKey, DrawKind, SceneDraw};

use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::camera3d::{Camera3D, ControlsSettings, MapControls, SurfaceRect};
use crate::config::{FloorStyle, ShapePalette, ViewerConfig};
use crate::floor::{FloorId, FloorModel, FloorRegistry};
use crate::font::Typeface;
use crate::loader::{AssetLoader, AssetSlot, PendingLoad, SlotChange};
use crate::picking::Ray;
use crate::plan::FloorPlan;
use crate::shape::{PickableShape, ShapeId, SurfaceId};

#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub focus_pull_back: f32,
    pub label_size: f32,
    pub floor_style: FloorStyle,
    pub palette: ShapePalette,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            focus_pull_back: 4.0,
            label_size: 0.03,
            floor_style: FloorStyle::default(),
            palette: ShapePalette::default(),
        }
    }
}

impl From<&ViewerConfig> for ViewerSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            focus_pull_back: config.focus_pull_back,
            label_size: config.label_size,
            floor_style: config.floor_style.clone(),
            palette: config.palette.clone(),
        }
    }
}

pub struct Viewer {
    camera: Camera3D,
    controls: MapControls,
    surface_rect: SurfaceRect,
    floors: FloorRegistry,
    shapes: Vec<PickableShape>,
    clickable: HashMap<SurfaceId, ShapeId>,
    font: AssetSlot<Typeface>,
    pointer_ndc: Option<Vec2>,
    hovered: Option<ShapeId>,
    settings: ViewerSettings,
}

impl Viewer {
    pub fn new(camera: Camera3D, controls: ControlsSettings, settings: ViewerSettings) -> Self {
        let mut controls = MapControls::new(controls);
        let mut camera = camera;
        controls.update(&mut camera);
        Self {
            camera,
            controls,
            surface_rect: SurfaceRect::from_size(1, 1),
            floors: FloorRegistry::new(),
            shapes: Vec::new(),
            clickable: HashMap::new(),
            font: AssetSlot::Idle,
            pointer_ndc: None,
            hovered: None,
            settings,
        }
    }

    /// Registers every floor and room in `plan`. Floors start hidden with their
    /// plan pose waiting for their model to load; rooms start hidden and unindexed.
    pub fn from_plan(plan: &FloorPlan, config: &ViewerConfig) -> Self {
        let mut viewer =
            Self::new(config.camera.build(), config.controls.settings(), ViewerSettings::from(config));
        for floor in &plan.floors {
            let pose = floor.camera.map(Into::into);
            viewer.register_floor(FloorModel::new(FloorId::new(&floor.name), floor.model.clone(), pose));
        }
        for shape in plan.build_shapes() {
            viewer.add_shape(shape);
        }
        tracing::info!(floors = viewer.floors.len(), rooms = viewer.shapes.len(), "Campus plan registered");
        viewer
    }

    pub fn register_floor(&mut self, floor: FloorModel) {
        self.floors.register(floor);
    }

    pub fn add_shape(&mut self, mut shape: PickableShape) -> ShapeId {
        let id = ShapeId(self.shapes.len());
        if let AssetSlot::Ready(typeface) = &self.font {
            shape.attach_label(typeface, self.settings.label_size);
        }
        let visible = shape.is_visible();
        self.shapes.push(shape);
        self.sync_clickable(id, visible);
        id
    }

    /// Queues every idle floor model and the label font on `loader`.
    pub fn request_assets(&mut self, loader: &AssetLoader, font_path: PathBuf) {
        self.floors.request_all(loader, self.settings.floor_style.edge_threshold_degrees);
        if matches!(self.font, AssetSlot::Idle) {
            let label = format!("font {}", font_path.display());
            self.attach_font_load(loader.spawn(label, move || Typeface::load(&font_path)));
        }
    }

    pub fn attach_font_load(&mut self, load: PendingLoad<Typeface>) {
        self.font = AssetSlot::Pending(load);
    }

    pub fn attach_floor_load(&mut self, floor: &FloorId, load: PendingLoad<crate::floor::FloorAsset>) -> bool {
        self.floors.attach_load(floor, load)
    }

    /// Observes finished loads. Returns true when anything new became drawable.
    pub fn poll_assets(&mut self) -> bool {
        let mut changed = false;
        for (floor, change) in self.floors.poll() {
            match change {
                SlotChange::Loaded => {
                    let triangles =
                        self.floors.get(&floor).and_then(|model| model.asset.ready()).map_or(0, |a| a.triangle_count());
                    tracing::info!(floor = %floor, triangles, "Floor model loaded");
                    changed = true;
                }
                SlotChange::Failed(err) => tracing::warn!(floor = %floor, "Floor model failed to load: {err}"),
                SlotChange::Unchanged => {}
            }
        }
        match self.font.resolve() {
            SlotChange::Loaded => {
                if let AssetSlot::Ready(typeface) = &self.font {
                    for shape in &mut self.shapes {
                        shape.attach_label(typeface, self.settings.label_size);
                    }
                    tracing::info!(labels = self.shapes.len(), "Label font loaded");
                }
                changed = true;
            }
            SlotChange::Failed(err) => tracing::warn!("Label font failed to load, rooms stay unlabelled: {err}"),
            SlotChange::Unchanged => {}
        }
        changed
    }

    pub fn has_pending_assets(&self) -> bool {
        self.font.is_pending() || self.floors.iter().any(|floor| floor.asset.is_pending())
    }

    pub fn set_surface_rect(&mut self, rect: SurfaceRect) {
        self.surface_rect = rect;
    }

    pub fn surface_rect(&self) -> SurfaceRect {
        self.surface_rect
    }

    /// Advances damped camera motion. Returns true when the camera moved.
    pub fn update(&mut self) -> bool {
        if !self.controls.has_pending_motion() {
            return false;
        }
        self.controls.update(&mut self.camera)
    }

    pub fn orbit(&mut self, delta_pixels: Vec2) {
        self.controls.rotate(delta_pixels, &self.surface_rect);
    }

    pub fn pan(&mut self, delta_pixels: Vec2) {
        self.controls.pan(delta_pixels, &self.camera, &self.surface_rect);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.controls.dolly(steps);
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn controls(&self) -> &MapControls {
        &self.controls
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn floors(&self) -> &FloorRegistry {
        &self.floors
    }

    pub fn shapes(&self) -> &[PickableShape] {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&PickableShape> {
        self.shapes.get(id.0)
    }

    pub fn find_shapes(&self, name: &str) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, shape)| shape.name == name)
            .map(|(index, _)| ShapeId(index))
            .collect()
    }

    pub fn hovered(&self) -> Option<ShapeId> {
        self.hovered
    }

    pub fn font_ready(&self) -> bool {
        self.font.ready().is_some()
    }

    pub fn is_clickable(&self, id: ShapeId) -> bool {
        self.shapes.get(id.0).is_some_and(|shape| self.clickable.get(&shape.surface_id()) == Some(&id))
    }

    pub fn clickable_count(&self) -> usize {
        self.clickable.len()
    }

    /// Shows or hides a room and keeps the clickable index in step with it.
    pub fn set_shape_visibility(&mut self, id: ShapeId, visible: bool) -> bool {
        let Some(shape) = self.shapes.get_mut(id.0) else {
            return false;
        };
        shape.set_visibility(visible);
        self.sync_clickable(id, visible);
        true
    }

    pub fn rotate_label(&mut self, id: ShapeId, delta: Vec3) {
        if let Some(shape) = self.shapes.get_mut(id.0) {
            shape.rotate_label(delta);
        }
    }

    fn sync_clickable(&mut self, id: ShapeId, visible: bool) {
        let Some(shape) = self.shapes.get(id.0) else {
            return;
        };
        if visible {
            self.clickable.insert(shape.surface_id(), id);
        } else {
            self.clickable.remove(&shape.surface_id());
        }
    }

    /// Nearest clickable shape along `ray`. Equal distances go to the shape
    /// registered first.
    pub fn pick_ray(&self, ray: &Ray) -> Option<(ShapeId, f32)> {
        let mut best: Option<(ShapeId, f32)> = None;
        for (index, shape) in self.shapes.iter().enumerate() {
            let id = ShapeId(index);
            if !self.is_clickable(id) {
                continue;
            }
            if let Some(distance) = shape.ray_hit(ray) {
                if best.is_none_or(|(_, current)| distance < current) {
                    best = Some((id, distance));
                }
            }
        }
        best
    }

    pub fn pick(&self, ndc: Vec2) -> Option<ShapeId> {
        let ray = self.camera.ray_from_ndc(ndc, self.surface_rect.aspect())?;
        self.pick_ray(&ray).map(|(id, _)| id)
    }
}
