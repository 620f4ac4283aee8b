use anyhow::Result;
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::fmt;
use uuid::Uuid;

use crate::floor::FloorId;
use crate::font::{TextGeometry, Typeface};
use crate::geometry::{Aabb, RoomPolygon};
use crate::picking::{ray_mesh_intersection, Ray};

/// Offset every label gets from its room center before the per-room offset.
pub const LABEL_BASE_OFFSET: Vec3 = Vec3::new(0.05, 0.05, 0.05);

/// Index of a shape in the viewer's registry. Stable for the viewer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub usize);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// Identity of a renderable surface, used as the clickable-index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceMaterial {
    #[default]
    Base,
    Highlight,
}

impl SurfaceMaterial {
    pub fn toggled(self) -> Self {
        match self {
            SurfaceMaterial::Base => SurfaceMaterial::Highlight,
            SurfaceMaterial::Highlight => SurfaceMaterial::Base,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub id: SurfaceId,
    polygon: RoomPolygon,
    indices: Vec<u32>,
    bounds: Aabb,
    pub material: SurfaceMaterial,
    pub visible: bool,
}

impl Surface {
    fn new(polygon: RoomPolygon) -> Self {
        let indices = polygon.fan_indices();
        let bounds = polygon.bounds();
        Self { id: SurfaceId::new(), polygon, indices, bounds, material: SurfaceMaterial::Base, visible: false }
    }

    pub fn positions(&self) -> &[Vec3] {
        self.polygon.points()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// Per-room label tweak: `offset` is applied on top of [`LABEL_BASE_OFFSET`]
/// (x subtracted, y and z added); `rotation` is an XYZ Euler triple in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub offset: Vec3,
    pub rotation: Vec3,
}

impl LabelPlacement {
    pub fn default_rotation() -> Vec3 {
        Vec3::new(-90.0_f32.to_radians(), 0.0, 45.0_f32.to_radians())
    }
}

impl Default for LabelPlacement {
    fn default() -> Self {
        Self { offset: Vec3::ZERO, rotation: Self::default_rotation() }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub text: TextGeometry,
    pub position: Vec3,
    pub rotation: Vec3,
    pub visible: bool,
}

impl Label {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_rotation_translation(rotation, self.position)
    }

    pub fn ray_hit(&self, ray: &Ray) -> Option<f32> {
        let text = &self.text;
        ray_mesh_intersection(ray, &text.cell_positions, &text.cell_indices, &text.bounds, &self.model_matrix())
    }
}

/// A room hotspot: its floor-plan surface plus an optional floating name label.
#[derive(Debug, Clone)]
pub struct PickableShape {
    pub name: String,
    pub floor: FloorId,
    pub room_id: Option<String>,
    pub capacity: Option<u32>,
    surface: Surface,
    placement: LabelPlacement,
    label: Option<Label>,
}

impl PickableShape {
    pub fn new(polygon: RoomPolygon, name: impl Into<String>, floor: FloorId, placement: LabelPlacement) -> Self {
        Self {
            name: name.into(),
            floor,
            room_id: None,
            capacity: None,
            surface: Surface::new(polygon),
            placement,
            label: None,
        }
    }

    pub fn from_points(
        points: Vec<Vec3>,
        name: impl Into<String>,
        floor: FloorId,
        placement: LabelPlacement,
    ) -> Result<Self> {
        Ok(Self::new(RoomPolygon::new(points)?, name, floor, placement))
    }

    pub fn with_metadata(mut self, room_id: Option<String>, capacity: Option<u32>) -> Self {
        self.room_id = room_id;
        self.capacity = capacity;
        self
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.id
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    pub fn placement(&self) -> LabelPlacement {
        self.placement
    }

    pub fn is_visible(&self) -> bool {
        self.surface.visible
    }

    pub fn material(&self) -> SurfaceMaterial {
        self.surface.material
    }

    pub fn is_highlighted(&self) -> bool {
        self.surface.material == SurfaceMaterial::Highlight
    }

    pub fn bounds(&self) -> Aabb {
        self.surface.bounds
    }

    /// Shows or hides surface and label. Always drops the highlight.
    pub fn set_visibility(&mut self, visible: bool) {
        self.surface.visible = visible;
        if let Some(label) = self.label.as_mut() {
            label.visible = visible;
        }
        self.surface.material = SurfaceMaterial::Base;
    }

    pub fn toggle_highlight(&mut self) {
        self.surface.material = self.surface.material.toggled();
    }

    pub fn reset_highlight(&mut self) {
        self.surface.material = SurfaceMaterial::Base;
    }

    pub fn label_position(&self) -> Vec3 {
        let offset = self.placement.offset;
        self.surface.bounds.center()
            + Vec3::new(
                -(LABEL_BASE_OFFSET.x + offset.x),
                LABEL_BASE_OFFSET.y + offset.y,
                LABEL_BASE_OFFSET.z + offset.z,
            )
    }

    /// Builds the name label from a loaded typeface. Replaces any existing label.
    pub fn attach_label(&mut self, typeface: &Typeface, size: f32) {
        let text = typeface.layout(&self.name, size);
        self.label = Some(Label {
            text,
            position: self.label_position(),
            rotation: self.placement.rotation,
            visible: self.surface.visible,
        });
    }

    /// Adds `delta` to the label's Euler rotation. No-op before a label exists.
    pub fn rotate_label(&mut self, delta: Vec3) {
        if let Some(label) = self.label.as_mut() {
            label.rotation += delta;
        }
    }

    /// Nearest ray distance over the surface and its label, visible parts only.
    pub fn ray_hit(&self, ray: &Ray) -> Option<f32> {
        if !self.surface.visible {
            return None;
        }
        let surface_hit = ray_mesh_intersection(
            ray,
            self.surface.positions(),
            &self.surface.indices,
            &self.surface.bounds,
            &Mat4::IDENTITY,
        );
        let label_hit = self.label.as_ref().filter(|label| label.visible).and_then(|label| label.ray_hit(ray));
        match (surface_hit, label_hit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (hit, None) | (None, hit) => hit,
        }
    }
}
