use campus_viewer::input::{Input, InputEvent};
use std::io::Write;
use tempfile::NamedTempFile;
use winit::event::MouseButton;
use winit::keyboard::{Key, NamedKey};

fn press(input: &mut Input, key: Key) {
    input.push(InputEvent::Key { key: key.clone(), pressed: true });
    input.push(InputEvent::Key { key, pressed: false });
}

#[test]
fn remapped_floor_keys_override_defaults() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, r#"{{"bindings":{{"floor_1":["u"],"floor_3":["o"]}}}}"#).expect("write remap config");

    let mut input = Input::from_config(temp.path());
    assert!(input.take_floor_requests().is_empty(), "no events yet");

    press(&mut input, Key::Character("u".into()));
    press(&mut input, Key::Character("1".into()));
    press(&mut input, Key::Character("O".into()));
    press(&mut input, Key::Character("2".into()));

    assert_eq!(input.take_floor_requests(), vec![0, 2, 1], "remapped keys fire, '1' no longer does");
}

#[test]
fn unknown_actions_and_keys_are_ignored() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, r#"{{"bindings":{{"teleport":["t"],"label_rotate_left":["not-a-key"]}}}}"#)
        .expect("write config");

    let mut input = Input::from_config(temp.path());
    press(&mut input, Key::Character("q".into()));
    assert_eq!(input.take_label_rotation(), 1, "default binding survives an invalid override");
}

#[test]
fn label_rotation_nets_left_against_right() {
    let mut input = Input::new();
    press(&mut input, Key::Character("q".into()));
    press(&mut input, Key::Character("q".into()));
    press(&mut input, Key::Character("e".into()));
    assert_eq!(input.take_label_rotation(), 1);
    assert_eq!(input.take_label_rotation(), 0);
}

#[test]
fn shift_drag_orbits_instead_of_panning() {
    let mut input = Input::new();
    input.push(InputEvent::CursorPos { x: 10.0, y: 10.0 });
    input.push(InputEvent::Key { key: Key::Named(NamedKey::Shift), pressed: true });
    input.push(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
    input.push(InputEvent::CursorPos { x: 40.0, y: 10.0 });
    input.push(InputEvent::MouseButton { button: MouseButton::Left, pressed: false });

    assert!(input.take_pan_delta().is_none());
    assert_eq!(input.take_orbit_delta().map(|delta| delta.x), Some(30.0));
    assert!(input.take_click().is_none(), "a long drag is not a click");
}

#[test]
fn missing_bindings_file_uses_defaults() {
    let mut input = Input::from_config("does/not/exist.json");
    press(&mut input, Key::Character("4".into()));
    assert_eq!(input.take_floor_requests(), vec![3]);
}

#[test]
fn cursor_departure_is_reported_once_unless_it_returns() {
    let mut input = Input::new();
    assert!(!input.take_cursor_left(), "never entered");

    input.push(InputEvent::CursorPos { x: 10.0, y: 10.0 });
    input.push(InputEvent::CursorLeft);
    input.push(InputEvent::CursorLeft);
    assert!(input.take_cursor_left());
    assert!(!input.take_cursor_left());

    input.push(InputEvent::CursorPos { x: 12.0, y: 10.0 });
    input.push(InputEvent::CursorLeft);
    input.push(InputEvent::CursorPos { x: 14.0, y: 10.0 });
    assert!(!input.take_cursor_left(), "came back within the frame");
    assert_eq!(input.take_cursor_moved(), Some(glam::Vec2::new(14.0, 10.0)));
}
