use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Cursor travel, in pixels, below which a press-release pair still counts as a click.
const CLICK_SLOP: f32 = 4.0;
pub const FLOOR_SLOTS: usize = 4;

pub struct Input {
    bindings: InputBindings,
    cursor_pos: Option<Vec2>,
    press_origin: Option<Vec2>,
    left_pressed: bool,
    right_pressed: bool,
    orbit_modifier_held: bool,
    pan_delta: Vec2,
    orbit_delta: Vec2,
    wheel: f32,
    clicked_at: Option<Vec2>,
    cursor_moved: bool,
    cursor_left: bool,
    floor_requests: Vec<usize>,
    label_rotation_steps: i32,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        let bindings = InputBindings::load_or_default(path);
        Self::with_bindings(bindings)
    }

    fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            cursor_pos: None,
            press_origin: None,
            left_pressed: false,
            right_pressed: false,
            orbit_modifier_held: false,
            pan_delta: Vec2::ZERO,
            orbit_delta: Vec2::ZERO,
            wheel: 0.0,
            clicked_at: None,
            cursor_moved: false,
            cursor_left: false,
            floor_requests: Vec::new(),
            label_rotation_steps: 0,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { key, pressed } => self.apply_key_binding(&key, pressed),
            InputEvent::Wheel { delta } => self.wheel += delta,
            InputEvent::MouseButton { button, pressed } => self.apply_button(button, pressed),
            InputEvent::CursorPos { x, y } => {
                let pos = Vec2::new(x, y);
                if let Some(previous) = self.cursor_pos {
                    let delta = pos - previous;
                    if self.right_pressed || (self.left_pressed && self.orbit_modifier_held) {
                        self.orbit_delta += delta;
                    } else if self.left_pressed {
                        self.pan_delta += delta;
                    }
                }
                self.cursor_pos = Some(pos);
                self.cursor_moved = true;
            }
            InputEvent::CursorLeft => {
                self.cursor_left = self.cursor_pos.is_some();
                self.cursor_pos = None;
                self.press_origin = None;
                self.left_pressed = false;
                self.right_pressed = false;
            }
            InputEvent::Other => {}
        }
    }

    fn apply_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => {
                self.left_pressed = pressed;
                if pressed {
                    self.press_origin = self.cursor_pos;
                } else if let (Some(origin), Some(pos)) = (self.press_origin.take(), self.cursor_pos) {
                    if origin.distance(pos) <= CLICK_SLOP {
                        self.clicked_at = Some(pos);
                    }
                }
            }
            MouseButton::Right => self.right_pressed = pressed,
            _ => {}
        }
    }

    pub fn clear_frame(&mut self) {
        self.pan_delta = Vec2::ZERO;
        self.orbit_delta = Vec2::ZERO;
        self.wheel = 0.0;
        self.clicked_at = None;
        self.cursor_moved = false;
        self.cursor_left = false;
        self.floor_requests.clear();
        self.label_rotation_steps = 0;
    }

    pub fn consume_wheel_delta(&mut self) -> Option<f32> {
        if self.wheel.abs() > 0.0 {
            let d = self.wheel;
            self.wheel = 0.0;
            Some(d)
        } else {
            None
        }
    }

    pub fn take_pan_delta(&mut self) -> Option<Vec2> {
        take_nonzero(&mut self.pan_delta)
    }

    pub fn take_orbit_delta(&mut self) -> Option<Vec2> {
        take_nonzero(&mut self.orbit_delta)
    }

    pub fn take_click(&mut self) -> Option<Vec2> {
        self.clicked_at.take()
    }

    /// Latest cursor position if it moved since the last call.
    pub fn take_cursor_moved(&mut self) -> Option<Vec2> {
        let moved = std::mem::take(&mut self.cursor_moved);
        if moved {
            self.cursor_pos
        } else {
            None
        }
    }

    /// Zero-based floor slots requested by the floor hotkeys this frame.
    pub fn take_floor_requests(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.floor_requests)
    }

    /// Net label rotation steps; positive turns counter-clockwise.
    pub fn take_label_rotation(&mut self) -> i32 {
        std::mem::take(&mut self.label_rotation_steps)
    }

    /// True once per departure of the cursor, unless it came back this frame.
    pub fn take_cursor_left(&mut self) -> bool {
        std::mem::take(&mut self.cursor_left) && self.cursor_pos.is_none()
    }

    fn apply_key_binding(&mut self, key: &Key, pressed: bool) {
        if let Some(binding_key) = InputKeyBinding::from_event_key(key) {
            let actions: Vec<_> = self.bindings.actions_for_key(&binding_key).collect();
            for action in actions {
                self.update_action_state(action, pressed);
            }
        }
    }

    fn update_action_state(&mut self, action: InputAction, pressed: bool) {
        match action {
            InputAction::Floor(slot) => {
                if pressed {
                    self.floor_requests.push(slot);
                }
            }
            InputAction::LabelRotateLeft => {
                if pressed {
                    self.label_rotation_steps += 1;
                }
            }
            InputAction::LabelRotateRight => {
                if pressed {
                    self.label_rotation_steps -= 1;
                }
            }
            InputAction::OrbitModifier => self.orbit_modifier_held = pressed,
        }
    }
}

fn take_nonzero(value: &mut Vec2) -> Option<Vec2> {
    let taken = std::mem::take(value);
    if taken == Vec2::ZERO {
        None
    } else {
        Some(taken)
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_bindings(InputBindings::default())
    }
}

#[derive(Debug, Clone)]
struct InputBindings {
    key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>>,
}

impl InputBindings {
    fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<InputConfigFile>(&contents) {
                Ok(config) => Self::from_config(config, &path.display().to_string()),
                Err(err) => {
                    tracing::warn!("Failed to parse {}: {err}. Falling back to default bindings.", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                tracing::debug!("No input bindings at {}: {err}. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    fn from_config(config: InputConfigFile, origin: &str) -> Self {
        let overrides = config.into_overrides(origin);
        Self::with_overrides(overrides)
    }

    fn with_overrides(overrides: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in overrides {
            if keys.is_empty() {
                continue;
            }
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<InputKeyBinding>> {
        use InputAction::*;
        let mut map = HashMap::new();
        for slot in 0..FLOOR_SLOTS {
            map.insert(Floor(slot), vec![InputKeyBinding::character(&(slot + 1).to_string())]);
        }
        map.insert(LabelRotateLeft, vec![InputKeyBinding::character("q")]);
        map.insert(LabelRotateRight, vec![InputKeyBinding::character("e")]);
        map.insert(OrbitModifier, vec![InputKeyBinding::named(NamedKeyCode::Shift)]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    fn actions_for_key(&self, key: &InputKeyBinding) -> impl Iterator<Item = InputAction> + '_ {
        self.key_to_actions.get(key).into_iter().flatten().copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InputKeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl InputKeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn named(named: NamedKeyCode) -> Self {
        Self::Named(named)
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) => {
                let s = ch.to_string();
                if s.is_empty() {
                    None
                } else {
                    Some(Self::Character(s.to_lowercase()))
                }
            }
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Some(Self::Named(named));
        }
        if normalized.chars().count() == 1 {
            return Some(Self::Character(normalized));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    Shift,
    Control,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::Shift => Some(Self::Shift),
            NamedKey::Control => Some(Self::Control),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "shift" | "left_shift" | "right_shift" => Some(Self::Shift),
            "ctrl" | "control" | "left_ctrl" | "right_ctrl" => Some(Self::Control),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InputAction {
    Floor(usize),
    LabelRotateLeft,
    LabelRotateRight,
    OrbitModifier,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        if let Some(slot) = value.strip_prefix("floor_") {
            let slot: usize = slot.parse().ok()?;
            return (1..=FLOOR_SLOTS).contains(&slot).then(|| Self::Floor(slot - 1));
        }
        match value {
            "label_rotate_left" => Some(Self::LabelRotateLeft),
            "label_rotate_right" => Some(Self::LabelRotateRight),
            "orbit_modifier" => Some(Self::OrbitModifier),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<InputKeyBinding>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let action_key = action_name.trim().to_lowercase();
            let Some(action) = InputAction::from_str(&action_key) else {
                tracing::warn!("{origin}: unknown action '{action_name}', ignoring.");
                continue;
            };
            let mut parsed = Vec::new();
            for key in keys {
                match InputKeyBinding::from_config_value(&key) {
                    Some(binding) => parsed.push(binding),
                    None => tracing::warn!("{origin}: unknown key '{key}' for action '{action_name}', ignoring."),
                }
            }
            if parsed.is_empty() {
                tracing::warn!("{origin}: action '{action_name}' has no valid keys, keeping defaults.");
                continue;
            }
            overrides.insert(action, parsed);
        }
        overrides
    }
}

pub enum InputEvent {
    Key { key: Key, pressed: bool },
    Wheel { delta: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    CursorPos { x: f32, y: f32 },
    CursorLeft,
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    // Roughly one notch per 50 px of trackpad scroll.
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                InputEvent::Wheel { delta: d }
            }
            WindowEvent::CursorMoved { position, .. } => {
                InputEvent::CursorPos { x: position.x as f32, y: position.y as f32 }
            }
            WindowEvent::CursorLeft { .. } => InputEvent::CursorLeft,
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::KeyboardInput { event, .. } => InputEvent::Key {
                key: event.logical_key.clone(),
                pressed: event.state == ElementState::Pressed,
            },
            _ => InputEvent::Other,
        }
    }
}
