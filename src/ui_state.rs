use std::fmt;

use crate::events::{RoomSelection, ViewerObserver};
use crate::floor::FloorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self { hour: hour.min(23), minute: minute.min(59) }
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFilter {
    pub month: u8,
    pub day: u8,
}

/// Booking details gathered from the panel when the user hits submit.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub room: String,
    pub room_id: Option<String>,
    pub capacity: Option<u32>,
    pub date: DateFilter,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl fmt::Display for BookingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) on {:02}/{:02} {}-{}",
            self.room,
            self.room_id.as_deref().unwrap_or("no id"),
            self.date.day,
            self.date.month,
            self.start,
            self.end
        )
    }
}

/// Panel-facing state: which panel sections are open, which room is selected,
/// and the booking filters. Kept in sync with the viewer through
/// [`ViewerObserver`].
#[derive(Debug, Clone)]
pub struct UiState {
    pub show_filters: bool,
    pub show_floor_buttons: bool,
    pub show_meetings: bool,
    pub show_lectures: bool,
    pub show_rooms: bool,
    pub current_room: String,
    pub current_room_id: Option<String>,
    pub current_capacity: Option<u32>,
    pub show_submit: bool,
    /// Minutes since midnight, copied from the time fields when filters apply.
    pub time_start_filter: u32,
    pub time_end_filter: u32,
    pub date_filter: DateFilter,
    pub time_start_field: TimeOfDay,
    pub time_end_field: TimeOfDay,
    pub hovered_room: Option<String>,
    pub active_floors: Vec<FloorId>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_filters: true,
            show_floor_buttons: true,
            show_meetings: true,
            show_lectures: true,
            show_rooms: true,
            current_room: String::new(),
            current_room_id: None,
            current_capacity: None,
            show_submit: false,
            time_start_filter: 0,
            time_end_filter: 0,
            date_filter: DateFilter::default(),
            time_start_field: TimeOfDay::default(),
            time_end_field: TimeOfDay::default(),
            hovered_room: None,
            active_floors: Vec::new(),
        }
    }
}

impl UiState {
    pub fn apply_time_filters(&mut self) {
        self.time_start_filter = self.time_start_field.minutes();
        self.time_end_filter = self.time_end_field.minutes();
    }

    /// Builds the booking for the selected room; `None` while nothing is selected
    /// or the time range is empty.
    pub fn submit(&mut self) -> Option<BookingRequest> {
        if !self.show_submit || self.current_room.is_empty() {
            return None;
        }
        if self.time_end_field.minutes() <= self.time_start_field.minutes() {
            return None;
        }
        self.apply_time_filters();
        Some(BookingRequest {
            room: self.current_room.clone(),
            room_id: self.current_room_id.clone(),
            capacity: self.current_capacity,
            date: self.date_filter,
            start: self.time_start_field,
            end: self.time_end_field,
        })
    }

    pub fn is_floor_active(&self, floor: &FloorId) -> bool {
        self.active_floors.contains(floor)
    }
}

impl ViewerObserver for UiState {
    fn on_selection_changed(&mut self, selection: Option<&RoomSelection>) {
        match selection {
            Some(room) => {
                self.current_room = room.name.clone();
                self.current_room_id = room.room_id.clone();
                self.current_capacity = room.capacity;
                self.show_submit = true;
            }
            None => {
                self.current_room.clear();
                self.current_room_id = None;
                self.current_capacity = None;
                self.show_submit = false;
            }
        }
    }

    fn on_floor_changed(&mut self, floors: &[FloorId]) {
        self.active_floors = floors.to_vec();
    }

    fn on_hover_changed(&mut self, room: Option<&str>) {
        self.hovered_room = room.map(str::to_string);
    }
}
