use std::fmt;

use crate::floor::FloorId;
use crate::shape::{PickableShape, ShapeId};

/// The room a `focus` call landed on.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSelection {
    pub shape: ShapeId,
    pub name: String,
    pub floor: FloorId,
    pub room_id: Option<String>,
    pub capacity: Option<u32>,
    pub highlighted: bool,
}

impl RoomSelection {
    pub fn from_shape(id: ShapeId, shape: &PickableShape) -> Self {
        Self {
            shape: id,
            name: shape.name.clone(),
            floor: shape.floor.clone(),
            room_id: shape.room_id.clone(),
            capacity: shape.capacity,
            highlighted: shape.is_highlighted(),
        }
    }
}

/// Receives viewer state changes. Every entry point on the viewer takes one by
/// `&mut`, so the UI layer never has to reach into viewer internals.
pub trait ViewerObserver {
    fn on_selection_changed(&mut self, _selection: Option<&RoomSelection>) {}
    fn on_floor_changed(&mut self, _floors: &[FloorId]) {}
    fn on_hover_changed(&mut self, _room: Option<&str>) {}
}

impl ViewerObserver for () {}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    SelectionChanged { room: Option<String> },
    FloorsChanged { floors: Vec<FloorId> },
    HoverChanged { room: Option<String> },
}

impl fmt::Display for ViewerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerEvent::SelectionChanged { room } => {
                write!(f, "SelectionChanged room={}", room.as_deref().unwrap_or("-"))
            }
            ViewerEvent::FloorsChanged { floors } => {
                let names: Vec<&str> = floors.iter().map(FloorId::as_str).collect();
                write!(f, "FloorsChanged floors=[{}]", names.join(", "))
            }
            ViewerEvent::HoverChanged { room } => write!(f, "HoverChanged room={}", room.as_deref().unwrap_or("-")),
        }
    }
}

/// Observer that just records what happened, in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ViewerEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: ViewerEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ViewerEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }
}

impl ViewerObserver for EventLog {
    fn on_selection_changed(&mut self, selection: Option<&RoomSelection>) {
        self.push(ViewerEvent::SelectionChanged { room: selection.map(|s| s.name.clone()) });
    }

    fn on_floor_changed(&mut self, floors: &[FloorId]) {
        self.push(ViewerEvent::FloorsChanged { floors: floors.to_vec() });
    }

    fn on_hover_changed(&mut self, room: Option<&str>) {
        self.push(ViewerEvent::HoverChanged { room: room.map(str::to_string) });
    }
}
