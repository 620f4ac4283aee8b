use campus_viewer::camera3d::{Camera3D, ControlsSettings};
use campus_viewer::floor::FloorId;
use campus_viewer::font::Typeface;
use campus_viewer::loader::pending;
use campus_viewer::picking::Ray;
use campus_viewer::shape::{LabelPlacement, PickableShape};
use campus_viewer::viewer::{DrawKey, Viewer, ViewerSettings};
use glam::Vec3;
use std::io::Write;
use tempfile::NamedTempFile;

const TYPEFACE: &str = r#"{
    "glyphs": {
        "A": { "ha": 1000, "x_min": 0, "x_max": 900, "o": "m 0 0 l 450 800 l 900 0 l 0 0" },
        " ": { "ha": 400, "x_min": 0, "x_max": 0 }
    },
    "familyName": "Block",
    "resolution": 1000,
    "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 800, "xMax": 1000 },
    "underlineThickness": 50
}"#;

fn viewer() -> Viewer {
    let camera = Camera3D::new(Vec3::new(0.0, 5.0, 2.0), Vec3::ZERO, 75.0_f32.to_radians(), 0.1, 1000.0);
    let settings = ViewerSettings { label_size: 1.0, ..ViewerSettings::default() };
    Viewer::new(camera, ControlsSettings::default(), settings)
}

/// A tiny room whose label lies flat and runs along +X well past the room.
fn tiny_room(name: &str) -> PickableShape {
    let points = vec![
        Vec3::new(-0.05, 0.0, -0.05),
        Vec3::new(0.05, 0.0, -0.05),
        Vec3::new(0.05, 0.0, 0.05),
        Vec3::new(-0.05, 0.0, 0.05),
    ];
    let placement = LabelPlacement { offset: Vec3::ZERO, rotation: Vec3::new(-90.0_f32.to_radians(), 0.0, 0.0) };
    PickableShape::from_points(points, name, FloorId::new("Floor 1"), placement).expect("valid room")
}

fn typeface() -> Typeface {
    Typeface::from_slice(TYPEFACE.as_bytes()).expect("typeface parses")
}

#[test]
fn typeface_loads_from_disk() {
    let mut file = NamedTempFile::new().expect("temp font");
    file.write_all(TYPEFACE.as_bytes()).expect("write font");
    let face = Typeface::load(file.path()).expect("load font");
    assert_eq!(face.family_name.as_deref(), Some("Block"));
    assert!((face.line_height() - 1050.0).abs() < 1e-3);
}

#[test]
fn labels_appear_when_the_font_arrives() {
    let mut viewer = viewer();
    let room = viewer.add_shape(tiny_room("AAAA"));
    let (completer, load) = pending::<Typeface>("font");
    viewer.attach_font_load(load);
    assert!(viewer.shape(room).expect("room").label().is_none());

    completer.complete(Ok(typeface()));
    assert!(viewer.poll_assets());
    assert!(viewer.font_ready());
    let label = viewer.shape(room).expect("room").label().expect("label attached");
    assert!(!label.visible, "label follows the hidden room");
    assert!((label.text.bounds.size().x - 4.0).abs() < 1e-4);

    viewer.activate(&[FloorId::new("Floor 1")], &mut ());
    assert!(viewer.shape(room).expect("room").label().expect("label").visible);
    assert!(viewer.draw_list().iter().any(|draw| draw.key == DrawKey::Label(room)));
}

#[test]
fn shapes_added_after_the_font_get_labels_immediately() {
    let mut viewer = viewer();
    let (completer, load) = pending::<Typeface>("font");
    viewer.attach_font_load(load);
    completer.complete(Ok(typeface()));
    viewer.poll_assets();

    let room = viewer.add_shape(tiny_room("A A"));
    let label = viewer.shape(room).expect("room").label().expect("label");
    assert_eq!(label.text.cell_indices.len(), 18, "three glyph cells, two triangles each");
}

#[test]
fn hitting_only_the_label_picks_its_room() {
    let mut viewer = viewer();
    let (completer, load) = pending::<Typeface>("font");
    viewer.attach_font_load(load);
    completer.complete(Ok(typeface()));
    viewer.poll_assets();
    let room = viewer.add_shape(tiny_room("AAAA"));
    viewer.activate(&[FloorId::new("Floor 1")], &mut ());

    // Two units along +X: well outside the room polygon, inside the third glyph cell.
    let ray = Ray::new(Vec3::new(2.0, 5.0, 0.0), Vec3::NEG_Y).expect("ray");
    let (hit, distance) = viewer.pick_ray(&ray).expect("label is pickable");
    assert_eq!(hit, room);
    assert!((distance - 4.95).abs() < 1e-3);

    let miss = Ray::new(Vec3::new(6.0, 5.0, 0.0), Vec3::NEG_Y).expect("ray");
    assert!(viewer.pick_ray(&miss).is_none());
}

#[test]
fn failed_font_leaves_rooms_unlabelled() {
    let mut viewer = viewer();
    let room = viewer.add_shape(tiny_room("AAAA"));
    let (completer, load) = pending::<Typeface>("font");
    viewer.attach_font_load(load);
    drop(completer);

    assert!(!viewer.poll_assets());
    assert!(!viewer.font_ready());
    assert!(viewer.shape(room).expect("room").label().is_none());
}

#[test]
fn label_rotation_accumulates_on_the_label() {
    let mut viewer = viewer();
    let (completer, load) = pending::<Typeface>("font");
    viewer.attach_font_load(load);
    completer.complete(Ok(typeface()));
    viewer.poll_assets();
    let room = viewer.add_shape(tiny_room("A"));
    let start = viewer.shape(room).expect("room").label().expect("label").rotation;

    let step = Vec3::new(0.0, 0.0, 5.0_f32.to_radians());
    viewer.rotate_label(room, step);
    viewer.rotate_label(room, step);

    let rotation = viewer.shape(room).expect("room").label().expect("label").rotation;
    assert!((rotation - (start + step * 2.0)).length() < 1e-6);
}
