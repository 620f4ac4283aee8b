use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::camera3d::CameraPose;
use crate::floor::FloorId;
use crate::shape::{LabelPlacement, PickableShape};

/// Static campus description: which floors exist, where their models live,
/// and the room outlines drawn on top of them.
#[derive(Debug, Clone, Deserialize)]
pub struct FloorPlan {
    pub floors: Vec<FloorSpec>,
    #[serde(default)]
    pub rooms: Vec<RoomSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorSpec {
    pub name: String,
    pub model: PathBuf,
    /// Pose the camera returns to the first time this floor is activated.
    #[serde(default)]
    pub camera: Option<PoseData>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PoseData {
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl From<PoseData> for CameraPose {
    fn from(data: PoseData) -> Self {
        CameraPose::new(Vec3::from_array(data.position), Vec3::from_array(data.target))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSpec {
    pub name: String,
    pub floor: String,
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub label: Option<LabelSpec>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LabelSpec {
    #[serde(default)]
    pub rotation_degrees: Option<[f32; 3]>,
    #[serde(default)]
    pub offset: [f32; 3],
}

impl LabelSpec {
    pub fn placement(&self) -> LabelPlacement {
        let rotation = match self.rotation_degrees {
            Some([x, y, z]) => Vec3::new(x.to_radians(), y.to_radians(), z.to_radians()),
            None => LabelPlacement::default_rotation(),
        };
        LabelPlacement { offset: Vec3::from_array(self.offset), rotation }
    }
}

impl FloorPlan {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read floor plan {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Failed to parse floor plan {}", path.display()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let plan: FloorPlan = serde_json::from_slice(bytes)?;
        let mut seen = HashSet::new();
        for floor in &plan.floors {
            if !seen.insert(floor.name.as_str()) {
                bail!("Floor '{}' is listed more than once", floor.name);
            }
        }
        Ok(plan)
    }

    /// Builds one pickable shape per room, in plan order. Rooms with too few
    /// points are skipped with a warning; rooms tagged with an unknown floor
    /// are kept and simply never activated.
    pub fn build_shapes(&self) -> Vec<PickableShape> {
        let mut shapes = Vec::with_capacity(self.rooms.len());
        for room in &self.rooms {
            let points = room.points.iter().copied().map(Vec3::from_array).collect();
            let placement = room.label.map(|label| label.placement()).unwrap_or_default();
            match PickableShape::from_points(points, &room.name, FloorId::new(&room.floor), placement) {
                Ok(shape) => shapes.push(shape.with_metadata(room.id.clone(), room.capacity)),
                Err(err) => tracing::warn!(room = %room.name, "Skipping room: {err}"),
            }
        }
        shapes
    }
}
