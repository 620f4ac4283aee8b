use super::Viewer;
use crate::events::ViewerObserver;
use crate::floor::FloorId;
use crate::shape::ShapeId;

impl Viewer {
    /// Shows exactly `floor_names` and their rooms, hides everything else, and
    /// returns the camera to where it was when the first requested floor was
    /// last on screen.
    pub fn activate(&mut self, floor_names: &[FloorId], observer: &mut dyn ViewerObserver) {
        self.snapshot_visible_floor_poses();

        for floor in self.floors.iter_mut() {
            floor.visible = floor_names.contains(&floor.id);
            if floor.visible && floor.asset.ready().is_none() {
                let state = floor.asset.state_name();
                tracing::debug!(floor = %floor.id, state, "Floor shown before its model is ready");
            }
        }
        for index in 0..self.shapes.len() {
            let visible = floor_names.contains(&self.shapes[index].floor);
            self.set_shape_visibility(ShapeId(index), visible);
        }

        if let Some(first) = floor_names.first() {
            self.restore_floor_pose(first);
        }

        self.hover_pass(observer);
        let names: Vec<&str> = floor_names.iter().map(FloorId::as_str).collect();
        tracing::info!(floors = ?names, rooms = self.clickable_count(), "Floors activated");
        observer.on_floor_changed(floor_names);
    }

    pub fn active_floors(&self) -> Vec<FloorId> {
        self.floors.visible_ids()
    }
}
