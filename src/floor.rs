use anyhow::{anyhow, Context, Result};
use gltf::mesh::Mode;
use glam::{Mat4, Vec3};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::camera3d::CameraPose;
use crate::geometry::{indexed_triangles, Aabb};
use crate::loader::{AssetLoader, AssetSlot, PendingLoad, SlotChange};

/// Floor identifier as written in the floor plan, e.g. `"Floor 3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FloorId(String);

impl FloorId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FloorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FloorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One triangle primitive of a floor model, flattened into model space, plus
/// its outline edges as a line list.
#[derive(Debug, Clone, Default)]
pub struct FloorSurface {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub edge_positions: Vec<Vec3>,
    pub edge_indices: Vec<u32>,
    pub bounds: Aabb,
}

impl FloorSurface {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, edge_threshold_degrees: f32) -> Self {
        let bounds = Aabb::from_points(&positions);
        let (edge_positions, edge_indices) = extract_feature_edges(&positions, &indices, edge_threshold_degrees);
        Self { positions, indices, edge_positions, edge_indices, bounds }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloorAsset {
    pub surfaces: Vec<FloorSurface>,
    pub source: Option<PathBuf>,
}

impl FloorAsset {
    pub fn bounds(&self) -> Aabb {
        self.surfaces.iter().fold(Aabb::EMPTY, |acc, surface| acc.union(&surface.bounds))
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|surface| surface.indices.len() / 3).sum()
    }

    pub fn load_gltf(path: impl AsRef<Path>, edge_threshold_degrees: f32) -> Result<Self> {
        let path_ref = path.as_ref();
        let (document, buffers, _) = gltf::import(path_ref)
            .with_context(|| format!("Failed to import glTF from {}", path_ref.display()))?;
        let mut asset = Self::from_document(&document, &buffers, edge_threshold_degrees)
            .with_context(|| format!("Failed to read floor geometry from {}", path_ref.display()))?;
        asset.source = Some(path_ref.to_path_buf());
        Ok(asset)
    }

    pub fn from_slice(bytes: &[u8], edge_threshold_degrees: f32) -> Result<Self> {
        let (document, buffers, _) = gltf::import_slice(bytes).context("Failed to import glTF from memory")?;
        Self::from_document(&document, &buffers, edge_threshold_degrees)
    }

    fn from_document(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        edge_threshold_degrees: f32,
    ) -> Result<Self> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| anyhow!("No scenes found"))?;
        let mut surfaces = Vec::new();
        let mut stack: SmallVec<[(gltf::Node<'_>, Mat4); 32]> =
            scene.nodes().map(|node| (node, Mat4::IDENTITY)).collect();
        while let Some((node, parent)) = stack.pop() {
            let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
            if let Some(mesh) = node.mesh() {
                collect_mesh(&mesh, world, buffers, edge_threshold_degrees, &mut surfaces)?;
            }
            stack.extend(node.children().map(|child| (child, world)));
        }
        if surfaces.is_empty() {
            return Err(anyhow!("Scene contains no triangle meshes"));
        }
        Ok(Self { surfaces, source: None })
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    edge_threshold_degrees: f32,
    out: &mut Vec<FloorSurface>,
) -> Result<()> {
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("POSITION attribute missing on mesh {}", mesh.index()))?
            .map(|p| world.transform_point3(Vec3::from_array(p)))
            .collect();
        if positions.is_empty() {
            continue;
        }
        let indices: Vec<u32> = match reader.read_indices() {
            Some(read) => read.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        out.push(FloorSurface::new(positions, indices, edge_threshold_degrees));
    }
    Ok(())
}

type QuantizedPos = (i64, i64, i64);

fn quantize_position(pos: Vec3) -> QuantizedPos {
    let scale = 10000.0;
    ((pos.x * scale).round() as i64, (pos.y * scale).round() as i64, (pos.z * scale).round() as i64)
}

fn edge_key(a: QuantizedPos, b: QuantizedPos) -> (QuantizedPos, QuantizedPos) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Outline edges of a triangle mesh as a line list: edges whose two faces meet
/// at `threshold_degrees` or more, and edges with only one face. Vertices are
/// welded by quantized position so split normals don't break adjacency.
pub fn extract_feature_edges(positions: &[Vec3], indices: &[u32], threshold_degrees: f32) -> (Vec<Vec3>, Vec<u32>) {
    struct EdgeRecord {
        start: Vec3,
        end: Vec3,
        normal: Vec3,
        other: Option<Vec3>,
    }

    let threshold_dot = threshold_degrees.to_radians().cos();
    let mut order: Vec<EdgeRecord> = Vec::new();
    let mut lookup: HashMap<(QuantizedPos, QuantizedPos), usize> = HashMap::new();

    for [a, b, c] in indexed_triangles(positions, indices) {
        let Some(normal) = (b - a).cross(c - a).try_normalize() else {
            continue;
        };
        for (start, end) in [(a, b), (b, c), (c, a)] {
            let key = edge_key(quantize_position(start), quantize_position(end));
            if key.0 == key.1 {
                continue;
            }
            match lookup.get(&key) {
                Some(&slot) => {
                    let record = &mut order[slot];
                    if record.other.is_none() {
                        record.other = Some(normal);
                    }
                }
                None => {
                    lookup.insert(key, order.len());
                    order.push(EdgeRecord { start, end, normal, other: None });
                }
            }
        }
    }

    let mut edge_positions = Vec::new();
    let mut edge_indices = Vec::new();
    for record in order {
        let keep = match record.other {
            None => true,
            Some(other) => record.normal.dot(other) <= threshold_dot,
        };
        if keep {
            let base = edge_positions.len() as u32;
            edge_positions.push(record.start);
            edge_positions.push(record.end);
            edge_indices.extend_from_slice(&[base, base + 1]);
        }
    }
    (edge_positions, edge_indices)
}

/// A floor in the registry: its model slot, visibility, and the camera pose to
/// return to when it is next activated.
///
/// `default_pose` only becomes the remembered `pose` once the model has
/// loaded, and never replaces a pose saved before that.
pub struct FloorModel {
    pub id: FloorId,
    pub model_path: PathBuf,
    pub asset: AssetSlot<FloorAsset>,
    pub visible: bool,
    pub default_pose: Option<CameraPose>,
    pub pose: Option<CameraPose>,
}

impl FloorModel {
    pub fn new(id: FloorId, model_path: impl Into<PathBuf>, default_pose: Option<CameraPose>) -> Self {
        Self { id, model_path: model_path.into(), asset: AssetSlot::Idle, visible: false, default_pose, pose: None }
    }

    /// Visible geometry only exists once the asset has loaded.
    pub fn renderable(&self) -> Option<&FloorAsset> {
        if self.visible {
            self.asset.ready()
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct FloorRegistry {
    floors: Vec<FloorModel>,
}

impl FloorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, floor: FloorModel) {
        if let Some(existing) = self.get_mut(&floor.id) {
            tracing::warn!(floor = %floor.id, "Floor registered twice; keeping the latest entry");
            *existing = floor;
        } else {
            self.floors.push(floor);
        }
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn get(&self, id: &FloorId) -> Option<&FloorModel> {
        self.floors.iter().find(|floor| &floor.id == id)
    }

    pub fn get_mut(&mut self, id: &FloorId) -> Option<&mut FloorModel> {
        self.floors.iter_mut().find(|floor| &floor.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloorModel> {
        self.floors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FloorModel> {
        self.floors.iter_mut()
    }

    pub fn ids(&self) -> Vec<FloorId> {
        self.floors.iter().map(|floor| floor.id.clone()).collect()
    }

    pub fn visible_ids(&self) -> Vec<FloorId> {
        self.floors.iter().filter(|floor| floor.visible).map(|floor| floor.id.clone()).collect()
    }

    pub fn attach_load(&mut self, id: &FloorId, load: PendingLoad<FloorAsset>) -> bool {
        match self.get_mut(id) {
            Some(floor) => {
                floor.asset = AssetSlot::Pending(load);
                true
            }
            None => false,
        }
    }

    /// Queues every idle floor model on `loader`.
    pub fn request_all(&mut self, loader: &AssetLoader, edge_threshold_degrees: f32) {
        for floor in self.floors.iter_mut().filter(|floor| matches!(floor.asset, AssetSlot::Idle)) {
            let path = floor.model_path.clone();
            let load = loader.spawn(floor.id.to_string(), move || FloorAsset::load_gltf(&path, edge_threshold_degrees));
            floor.asset = AssetSlot::Pending(load);
        }
    }

    /// Resolves finished loads; returns the floors whose slot changed.
    pub fn poll(&mut self) -> Vec<(FloorId, SlotChange)> {
        let mut changes = Vec::new();
        for floor in &mut self.floors {
            match floor.asset.resolve() {
                SlotChange::Unchanged => {}
                SlotChange::Loaded => {
                    if floor.pose.is_none() {
                        floor.pose = floor.default_pose;
                    }
                    changes.push((floor.id.clone(), SlotChange::Loaded));
                }
                change => changes.push((floor.id.clone(), change)),
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::pending;

    fn cube() -> (Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        (positions, indices)
    }

    #[test]
    fn cube_keeps_only_its_twelve_creases() {
        let (positions, indices) = cube();
        let (edges, edge_indices) = extract_feature_edges(&positions, &indices, 1.0);
        assert_eq!(edge_indices.len(), 24);
        assert_eq!(edges.len(), 24);
    }

    #[test]
    fn flat_quad_reports_only_its_border() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 0.0, 1.0), Vec3::Z];
        let (edges, _) = extract_feature_edges(&positions, &[0, 1, 2, 0, 2, 3], 1.0);
        assert_eq!(edges.len() / 2, 4);
    }

    #[test]
    fn pending_floor_is_not_renderable_until_loaded() {
        let mut registry = FloorRegistry::new();
        let id = FloorId::new("Floor 1");
        registry.register(FloorModel::new(id.clone(), "uni_1.glb", None));
        let (completer, load) = pending("Floor 1");
        assert!(registry.attach_load(&id, load));
        registry.get_mut(&id).expect("floor").visible = true;
        assert!(registry.poll().is_empty());
        assert!(registry.get(&id).expect("floor").renderable().is_none());

        let (positions, indices) = cube();
        completer.complete(Ok(FloorAsset { surfaces: vec![FloorSurface::new(positions, indices, 1.0)], source: None }));
        assert_eq!(registry.poll(), vec![(id.clone(), SlotChange::Loaded)]);
        assert_eq!(registry.get(&id).expect("floor").renderable().expect("asset").triangle_count(), 12);
    }

    #[test]
    fn default_pose_is_remembered_once_the_model_loads() {
        let mut registry = FloorRegistry::new();
        let plan_pose = CameraPose::new(Vec3::new(1.0, 4.0, 1.0), Vec3::ZERO);
        let saved_pose = CameraPose::new(Vec3::new(-2.0, 3.0, 0.0), Vec3::X);
        let fresh = FloorId::new("Floor 1");
        let visited = FloorId::new("Floor 2");
        registry.register(FloorModel::new(fresh.clone(), "uni_1.glb", Some(plan_pose)));
        registry.register(FloorModel::new(visited.clone(), "uni_2.glb", Some(plan_pose)));
        assert!(registry.get(&fresh).expect("floor").pose.is_none());

        let (fresh_done, fresh_load) = pending("Floor 1");
        let (visited_done, visited_load) = pending("Floor 2");
        registry.attach_load(&fresh, fresh_load);
        registry.attach_load(&visited, visited_load);
        registry.get_mut(&visited).expect("floor").pose = Some(saved_pose);

        let (positions, indices) = cube();
        let asset = || FloorAsset { surfaces: vec![FloorSurface::new(positions.clone(), indices.clone(), 1.0)], source: None };
        fresh_done.complete(Ok(asset()));
        visited_done.complete(Ok(asset()));
        registry.poll();

        assert_eq!(registry.get(&fresh).expect("floor").pose, Some(plan_pose));
        assert_eq!(registry.get(&visited).expect("floor").pose, Some(saved_pose));
    }
}
