use glam::Vec3;

use super::Viewer;
use crate::camera3d::{framing_distance, CameraPose};
use crate::events::{RoomSelection, ViewerObserver};
use crate::floor::FloorId;
use crate::geometry::Aabb;
use crate::shape::ShapeId;

impl Viewer {
    /// Toggles the highlight on every room called `name` and frames it. With
    /// duplicate names the last one wins the camera. Returns false when no room
    /// matched.
    pub fn focus(&mut self, name: &str, observer: &mut dyn ViewerObserver) -> bool {
        let matches = self.find_shapes(name);
        let Some(&last) = matches.last() else {
            tracing::debug!(room = name, "Focus requested for unknown room");
            return false;
        };
        for id in &matches {
            if let Some(shape) = self.shapes.get_mut(id.0) {
                shape.toggle_highlight();
            }
            self.focus_shape(*id);
        }
        let selection = self.shapes.get(last.0).map(|shape| RoomSelection::from_shape(last, shape));
        observer.on_selection_changed(selection.as_ref());
        true
    }

    /// Moves the camera to frame one room without touching its highlight.
    pub fn focus_shape(&mut self, id: ShapeId) -> bool {
        let Some(bounds) = self.shapes.get(id.0).map(|shape| shape.bounds()) else {
            return false;
        };
        self.frame_bounds(&bounds);
        true
    }

    /// Keeps the current look direction, re-targets on the center of `bounds`
    /// and backs off far enough to fit it.
    pub fn frame_bounds(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let center = bounds.center();
        let distance = framing_distance(
            bounds,
            self.camera.fov_y_radians,
            self.surface_rect.aspect(),
            self.settings.focus_pull_back,
        )
        .max(self.camera.near);
        let direction = self.camera.look_direction();
        self.camera.position = center - direction * distance;
        self.camera.target = center;
        self.sync_controls();
    }

    pub fn camera_pose(&self) -> CameraPose {
        self.camera.pose()
    }

    pub fn set_camera_pose(&mut self, pose: CameraPose) {
        self.camera.apply_pose(&pose);
        self.sync_controls();
    }

    pub fn look_direction(&self) -> Vec3 {
        self.camera.look_direction()
    }

    /// Remembers the current pose for every floor that is visible right now.
    pub(super) fn snapshot_visible_floor_poses(&mut self) {
        let pose = self.camera_pose();
        for floor in self.floors.iter_mut().filter(|floor| floor.visible) {
            floor.pose = Some(pose);
        }
    }

    /// Jumps to the remembered pose of `floor`, if there is one.
    pub(super) fn restore_floor_pose(&mut self, floor: &FloorId) -> bool {
        let Some(pose) = self.floors.get(floor).and_then(|model| model.pose) else {
            return false;
        };
        self.set_camera_pose(pose);
        true
    }

    fn sync_controls(&mut self) {
        self.controls.stop();
        self.controls.update(&mut self.camera);
    }
}
