use campus_viewer::config::ViewerConfig;
use campus_viewer::floor::{FloorAsset, FloorId, FloorSurface};
use campus_viewer::loader::pending;
use campus_viewer::plan::FloorPlan;
use campus_viewer::viewer::Viewer;
use glam::Vec3;
use std::collections::HashSet;

fn shipped_plan() -> FloorPlan {
    FloorPlan::load(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/campus_plan.json")).expect("shipped plan loads")
}

#[test]
fn shipped_plan_lists_four_floors_and_all_rooms() {
    let plan = shipped_plan();
    assert_eq!(
        plan.floors.iter().map(|floor| FloorId::new(&floor.name)).collect::<Vec<_>>(),
        vec![FloorId::new("Floor 1"), FloorId::new("Floor 2"), FloorId::new("Floor 3"), FloorId::new("Floor 4")]
    );
    let shapes = plan.build_shapes();
    assert_eq!(shapes.len(), 31);
    assert_eq!(shapes.iter().filter(|shape| shape.floor == FloorId::new("Floor 3")).count(), 22);
    assert_eq!(shapes.iter().filter(|shape| shape.floor == FloorId::new("Floor 1")).count(), 9);
    let names: HashSet<&str> = shapes.iter().map(|shape| shape.name.as_str()).collect();
    assert_eq!(names.len(), 31, "room names are unique");
}

#[test]
fn viewer_from_plan_starts_with_everything_hidden() {
    let plan = shipped_plan();
    let viewer = Viewer::from_plan(&plan, &ViewerConfig::default());
    assert_eq!(viewer.floors().len(), 4);
    assert!(viewer.floors().visible_ids().is_empty());
    assert_eq!(viewer.clickable_count(), 0);
    assert!(viewer.floors().iter().all(|floor| floor.default_pose.is_some()), "every shipped floor has a camera pose");
    assert!(viewer.floors().iter().all(|floor| floor.pose.is_none()), "poses are only remembered after loading");
}

#[test]
fn first_activation_keeps_the_configured_start_camera() {
    let plan = shipped_plan();
    let mut viewer = Viewer::from_plan(&plan, &ViewerConfig::default());
    let start = viewer.camera_pose();

    viewer.activate(&[FloorId::new("Floor 3")], &mut ());

    assert_eq!(viewer.clickable_count(), 22);
    let pose = viewer.camera_pose();
    assert!((pose.position - start.position).length() < 1e-4);
    assert!((pose.target - start.target).length() < 1e-4);
}

#[test]
fn loaded_floor_returns_to_its_plan_pose() {
    let plan = shipped_plan();
    let mut viewer = Viewer::from_plan(&plan, &ViewerConfig::default());
    let first = FloorId::new("Floor 1");
    let third = FloorId::new("Floor 3");
    let plan_pose = viewer.floors().get(&third).and_then(|model| model.default_pose).expect("plan pose");

    let (completer, load) = pending::<FloorAsset>("Floor 3");
    assert!(viewer.attach_floor_load(&third, load));
    let surface = FloorSurface::new(vec![Vec3::ZERO, Vec3::X, Vec3::Z], vec![0, 1, 2], 1.0);
    completer.complete(Ok(FloorAsset { surfaces: vec![surface], source: None }));
    assert!(viewer.poll_assets());

    viewer.activate(std::slice::from_ref(&first), &mut ());
    viewer.activate(std::slice::from_ref(&third), &mut ());

    assert!((viewer.camera_pose().target - plan_pose.target).length() < 1e-3);
}
