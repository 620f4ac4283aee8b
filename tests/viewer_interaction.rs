use campus_viewer::camera3d::{Camera3D, CameraPose, ControlsSettings, SurfaceRect};
use campus_viewer::events::{EventLog, ViewerEvent};
use campus_viewer::floor::{FloorAsset, FloorId, FloorModel, FloorSurface};
use campus_viewer::loader::pending;
use campus_viewer::shape::{LabelPlacement, PickableShape, ShapeId};
use campus_viewer::viewer::{DrawKey, Viewer, ViewerSettings};
use glam::{Vec2, Vec3};

const SCREEN_CENTER: Vec2 = Vec2::new(400.0, 300.0);

fn viewer() -> Viewer {
    let camera = Camera3D::new(Vec3::new(0.0, 5.0, 2.0), Vec3::ZERO, 75.0_f32.to_radians(), 0.1, 1000.0);
    let mut viewer = Viewer::new(camera, ControlsSettings::default(), ViewerSettings::default());
    viewer.set_surface_rect(SurfaceRect::from_size(800, 600));
    viewer
}

fn square(name: &str, floor: &str, height: f32, center: Vec2, half: f32) -> PickableShape {
    let points = vec![
        Vec3::new(center.x - half, height, center.y - half),
        Vec3::new(center.x + half, height, center.y - half),
        Vec3::new(center.x + half, height, center.y + half),
        Vec3::new(center.x - half, height, center.y + half),
    ];
    PickableShape::from_points(points, name, FloorId::new(floor), LabelPlacement::default()).expect("valid square")
}

fn floor(name: &str) -> FloorId {
    FloorId::new(name)
}

fn assert_vec3_near(actual: Vec3, expected: Vec3) {
    assert!((actual - expected).length() < 1e-3, "expected {expected:?}, got {actual:?}");
}

#[test]
fn nearer_of_two_overlapping_rooms_wins_the_hover() {
    let mut viewer = viewer();
    let low = viewer.add_shape(square("Low", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    let high = viewer.add_shape(square("High", "Floor 1", 0.5, Vec2::ZERO, 1.0));
    let mut log = EventLog::default();
    viewer.activate(&[floor("Floor 1")], &mut log);

    viewer.pointer_moved(SCREEN_CENTER, &mut log);

    assert!(viewer.shape(high).expect("high").is_highlighted());
    assert!(!viewer.shape(low).expect("low").is_highlighted());
    assert_eq!(viewer.hovered(), Some(high));
    assert!(log.events().contains(&ViewerEvent::HoverChanged { room: Some("High".into()) }));
}

#[test]
fn moving_off_every_room_clears_the_highlight() {
    let mut viewer = viewer();
    let room = viewer.add_shape(square("Room", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    viewer.activate(&[floor("Floor 1")], &mut ());

    viewer.pointer_moved(SCREEN_CENTER, &mut ());
    assert!(viewer.shape(room).expect("room").is_highlighted());

    viewer.pointer_moved(Vec2::new(5.0, 5.0), &mut ());
    assert!(!viewer.shape(room).expect("room").is_highlighted());
    assert_eq!(viewer.hovered(), None);
}

#[test]
fn leaving_the_scene_drops_the_hover() {
    let mut viewer = viewer();
    let room = viewer.add_shape(square("Room", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    viewer.activate(&[floor("Floor 1")], &mut ());
    viewer.pointer_moved(SCREEN_CENTER, &mut ());
    assert_eq!(viewer.hovered(), Some(room));

    let mut log = EventLog::default();
    viewer.pointer_left(&mut log);

    assert_eq!(viewer.hovered(), None);
    assert_eq!(viewer.pointer_ndc(), None);
    assert!(!viewer.shape(room).expect("room").is_highlighted());
    assert_eq!(log.events(), &[ViewerEvent::HoverChanged { room: None }]);

    viewer.activate(&[floor("Floor 1")], &mut ());
    assert_eq!(viewer.hovered(), None, "re-running hover without a pointer picks nothing");
}

#[test]
fn click_behaves_like_a_move() {
    let mut viewer = viewer();
    let room = viewer.add_shape(square("Room", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    viewer.activate(&[floor("Floor 1")], &mut ());

    viewer.pointer_clicked(SCREEN_CENTER, &mut ());
    assert!(viewer.shape(room).expect("room").is_highlighted());
    viewer.pointer_clicked(SCREEN_CENTER, &mut ());
    assert!(viewer.shape(room).expect("room").is_highlighted(), "repeat click keeps the hover highlight");
}

#[test]
fn activate_shows_only_requested_floors_and_is_idempotent() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "missing/one.glb", None));
    viewer.register_floor(FloorModel::new(floor("Floor 2"), "missing/two.glb", None));
    let first = viewer.add_shape(square("101", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    let second = viewer.add_shape(square("201", "Floor 2", 0.0, Vec2::ZERO, 1.0));
    assert_eq!(viewer.clickable_count(), 0, "rooms start hidden and unindexed");

    for _ in 0..2 {
        viewer.activate(&[floor("Floor 2")], &mut ());
        assert!(!viewer.shape(first).expect("first").is_visible());
        assert!(viewer.shape(second).expect("second").is_visible());
        assert!(!viewer.is_clickable(first));
        assert!(viewer.is_clickable(second));
        assert_eq!(viewer.clickable_count(), 1);
        assert_eq!(viewer.active_floors(), vec![floor("Floor 2")]);
    }

    viewer.pointer_moved(SCREEN_CENTER, &mut ());
    assert_eq!(viewer.hovered(), Some(second));
}

#[test]
fn hidden_rooms_are_never_picked() {
    let mut viewer = viewer();
    let room = viewer.add_shape(square("Room", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    viewer.activate(&[floor("Floor 1")], &mut ());
    viewer.set_shape_visibility(room, true);
    viewer.set_shape_visibility(room, false);

    assert!(!viewer.is_clickable(room));
    viewer.pointer_moved(SCREEN_CENTER, &mut ());
    assert_eq!(viewer.hovered(), None);
    assert!(!viewer.shape(room).expect("room").is_highlighted());
}

#[test]
fn floor_poses_survive_switching_back_and_forth() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "missing/one.glb", None));
    viewer.register_floor(FloorModel::new(floor("Floor 2"), "missing/two.glb", None));
    let pose_one = CameraPose::new(Vec3::new(1.0, 4.0, 3.0), Vec3::new(0.5, 0.0, 0.5));
    let pose_two = CameraPose::new(Vec3::new(-2.0, 6.0, 1.0), Vec3::new(-1.0, 0.0, 0.0));

    viewer.activate(&[floor("Floor 1")], &mut ());
    viewer.set_camera_pose(pose_one);
    viewer.activate(&[floor("Floor 2")], &mut ());
    viewer.set_camera_pose(pose_two);

    viewer.activate(&[floor("Floor 1")], &mut ());
    assert_vec3_near(viewer.camera_pose().position, pose_one.position);
    assert_vec3_near(viewer.camera_pose().target, pose_one.target);

    viewer.activate(&[floor("Floor 2")], &mut ());
    assert_vec3_near(viewer.camera_pose().position, pose_two.position);
    assert_vec3_near(viewer.camera_pose().target, pose_two.target);
}

#[test]
fn floor_without_remembered_pose_keeps_the_camera() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "missing/one.glb", None));
    let before = viewer.camera_pose();
    viewer.activate(&[floor("Floor 1")], &mut ());
    assert_vec3_near(viewer.camera_pose().position, before.position);
}

#[test]
fn pending_floor_keeps_the_camera_until_its_model_loads() {
    let mut viewer = viewer();
    let plan_pose = CameraPose::new(Vec3::new(1.0, 4.0, 1.0), Vec3::new(0.5, 0.0, 0.5));
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "late.glb", Some(plan_pose)));
    let (_completer, load) = pending::<FloorAsset>("late floor");
    viewer.attach_floor_load(&floor("Floor 1"), load);
    let before = viewer.camera_pose();

    viewer.activate(&[floor("Floor 1")], &mut ());

    assert_vec3_near(viewer.camera_pose().position, before.position);
    assert_vec3_near(viewer.camera_pose().target, before.target);
}

#[test]
fn multi_floor_activation_saves_every_visible_floor_and_restores_the_first() {
    let mut viewer = viewer();
    for name in ["A", "B", "C"] {
        viewer.register_floor(FloorModel::new(floor(name), "missing.glb", None));
    }
    let shared = CameraPose::new(Vec3::new(1.0, 4.0, 1.0), Vec3::new(0.5, 0.0, 0.5));
    let elsewhere = CameraPose::new(Vec3::new(-2.0, 6.0, 1.0), Vec3::new(-1.0, 0.0, 0.0));

    viewer.activate(&[floor("A"), floor("B")], &mut ());
    viewer.set_camera_pose(shared);
    viewer.activate(&[floor("C")], &mut ());
    for name in ["A", "B"] {
        let saved = viewer.floors().get(&floor(name)).and_then(|model| model.pose).expect("pose saved on hide");
        assert_vec3_near(saved.position, shared.position);
    }

    viewer.set_camera_pose(elsewhere);
    viewer.activate(&[floor("B"), floor("A")], &mut ());
    assert_vec3_near(viewer.camera_pose().position, shared.position);
    assert_vec3_near(viewer.camera_pose().target, shared.target);
    assert_eq!(viewer.active_floors(), vec![floor("A"), floor("B")]);

    viewer.activate(&[floor("C"), floor("A")], &mut ());
    assert_vec3_near(viewer.camera_pose().position, elsewhere.position);
    assert_vec3_near(viewer.camera_pose().target, elsewhere.target);
}

#[test]
fn pending_floor_renders_once_its_load_resolves() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "late.glb", None));
    let (completer, load) = pending::<FloorAsset>("late floor");
    assert!(viewer.attach_floor_load(&floor("Floor 1"), load));

    viewer.activate(&[floor("Floor 1")], &mut ());
    let model = viewer.floors().get(&floor("Floor 1")).expect("registered");
    assert!(model.visible);
    assert!(model.renderable().is_none());
    assert!(viewer.has_pending_assets());
    assert!(!viewer.poll_assets());

    let surface = FloorSurface::new(
        vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
        vec![0, 1, 2],
        1.0,
    );
    completer.complete(Ok(FloorAsset { surfaces: vec![surface], source: None }));
    assert!(viewer.poll_assets());
    assert!(!viewer.has_pending_assets());

    let draws = viewer.draw_list();
    assert!(draws.iter().any(|draw| draw.key == DrawKey::FloorSurface { floor: 0, surface: 0 }));
    assert!(draws.iter().any(|draw| draw.key == DrawKey::FloorEdges { floor: 0, surface: 0 }));
}

#[test]
fn failed_floor_load_leaves_the_floor_absent() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "broken.glb", None));
    let (completer, load) = pending::<FloorAsset>("broken floor");
    viewer.attach_floor_load(&floor("Floor 1"), load);
    viewer.activate(&[floor("Floor 1")], &mut ());

    completer.complete(Err(anyhow::anyhow!("corrupt file")));
    assert!(!viewer.poll_assets());
    assert!(viewer.draw_list().is_empty());
}

#[test]
fn focus_keeps_look_direction_and_centers_the_room() {
    let mut viewer = viewer();
    let room = viewer.add_shape(square("Lab", "Floor 1", 0.0, Vec2::new(2.5, 4.5), 0.5));
    viewer.activate(&[floor("Floor 1")], &mut ());
    let direction = viewer.look_direction();
    let mut log = EventLog::default();

    assert!(viewer.focus("Lab", &mut log));

    assert_vec3_near(viewer.camera().target, Vec3::new(2.5, 0.0, 4.5));
    assert_vec3_near(viewer.look_direction(), direction);
    assert!(viewer.shape(room).expect("room").is_highlighted());
    assert!(!viewer.controls().has_pending_motion());
    assert!(log.events().contains(&ViewerEvent::SelectionChanged { room: Some("Lab".into()) }));

    assert!(viewer.focus("Lab", &mut ()));
    assert!(!viewer.shape(room).expect("room").is_highlighted(), "second focus toggles back");
}

#[test]
fn focus_on_unknown_room_changes_nothing() {
    let mut viewer = viewer();
    viewer.add_shape(square("Lab", "Floor 1", 0.0, Vec2::ZERO, 0.5));
    let before = viewer.camera_pose();
    assert!(!viewer.focus("Nowhere", &mut ()));
    assert_eq!(viewer.camera_pose(), before);
}

#[test]
fn duplicate_names_frame_the_last_match() {
    let mut viewer = viewer();
    let first = viewer.add_shape(square("Twin", "Floor 1", 0.0, Vec2::new(-3.0, 0.0), 0.5));
    let last = viewer.add_shape(square("Twin", "Floor 1", 0.0, Vec2::new(3.0, 0.0), 0.5));
    assert!(viewer.focus("Twin", &mut ()));
    assert_vec3_near(viewer.camera().target, Vec3::new(3.0, 0.0, 0.0));
    assert!(viewer.shape(first).expect("first").is_highlighted());
    assert!(viewer.shape(last).expect("last").is_highlighted());
}

#[test]
fn draw_list_puts_translucent_floors_last() {
    let mut viewer = viewer();
    viewer.register_floor(FloorModel::new(floor("Floor 1"), "one.glb", None));
    let (completer, load) = pending::<FloorAsset>("floor");
    viewer.attach_floor_load(&floor("Floor 1"), load);
    let room = viewer.add_shape(square("Room", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    completer.complete(Ok(FloorAsset {
        surfaces: vec![FloorSurface::new(
            vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
            vec![0, 1, 2],
            1.0,
        )],
        source: None,
    }));
    viewer.poll_assets();
    viewer.activate(&[floor("Floor 1")], &mut ());

    let draws = viewer.draw_list();
    let last = draws.last().expect("draws");
    assert_eq!(last.key, DrawKey::FloorSurface { floor: 0, surface: 0 });
    assert!(last.translucent);
    assert!(draws.iter().any(|draw| draw.key == DrawKey::Room(room)));
    assert!(draws.iter().filter(|draw| draw.translucent).count() == 1);
}

#[test]
fn rooms_keep_registration_order_ids() {
    let mut viewer = viewer();
    let a = viewer.add_shape(square("A", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    let b = viewer.add_shape(square("B", "Floor 1", 0.0, Vec2::ZERO, 1.0));
    assert_eq!((a, b), (ShapeId(0), ShapeId(1)));
    assert_eq!(viewer.find_shapes("B"), vec![b]);

    viewer.activate(&[floor("Floor 1")], &mut ());
    viewer.pointer_moved(SCREEN_CENTER, &mut ());
    assert_eq!(viewer.hovered(), Some(a), "coplanar tie goes to the first registered room");
}
