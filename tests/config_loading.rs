use campus_viewer::cli::CliOverrides;
use campus_viewer::config::{AppConfig, HexColor};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn shipped_config_matches_builtin_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/viewer.json");
    let shipped = AppConfig::load(path).expect("shipped config parses");
    let defaults = AppConfig::default();
    assert_eq!(shipped.window.width, defaults.window.width);
    assert_eq!(shipped.viewer.initial_floors, defaults.viewer.initial_floors);
    assert_eq!(shipped.viewer.palette.highlight, defaults.viewer.palette.highlight);
    assert_eq!(shipped.viewer.floor_style.edge_color, HexColor(0x3e4452));
    assert!((shipped.viewer.camera.fov_degrees - 75.0).abs() < f32::EPSILON);
}

#[test]
fn partial_config_keeps_defaults_for_missing_fields() {
    let mut file = NamedTempFile::new().expect("temp config");
    write!(file, r##"{{ "viewer": {{ "focus_pull_back": 2.5, "palette": {{ "highlight": "#ff0000" }} }} }}"##)
        .expect("write config");
    let config = AppConfig::load(file.path()).expect("partial config parses");
    assert_eq!(config.viewer.focus_pull_back, 2.5);
    assert_eq!(config.viewer.palette.highlight, HexColor(0xff0000));
    assert_eq!(config.viewer.palette.base, HexColor(0x423e52));
    assert_eq!(config.window.title, "Campus Viewer");
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let mut file = NamedTempFile::new().expect("temp config");
    write!(file, "{{ not json").expect("write config");
    assert!(AppConfig::load(file.path()).is_err());
    let config = AppConfig::load_or_default(file.path());
    assert_eq!(config.viewer.label_size, 0.03);
}

#[test]
fn bad_color_is_a_parse_error() {
    let mut file = NamedTempFile::new().expect("temp config");
    write!(file, r##"{{ "viewer": {{ "palette": {{ "base": "#12345" }} }} }}"##).expect("write config");
    let err = AppConfig::load(file.path()).expect_err("five digit color");
    assert!(format!("{err:#}").contains("six hex digits"));
}

#[test]
fn command_line_overrides_flow_into_config() {
    let cli = CliOverrides::parse([
        "campus_viewer",
        "--width",
        "1024",
        "--vsync",
        "off",
        "--floor",
        "Floor 3",
        "--floor",
        "Floor 4",
        "--config",
        "custom.json",
    ])
    .expect("flags parse");
    assert_eq!(cli.config_path(), PathBuf::from("custom.json"));

    let overrides = cli.into_config_overrides();
    let mut config = AppConfig::default();
    config.apply_overrides(&overrides);
    assert_eq!(config.window.width, 1024);
    assert_eq!(config.window.height, 720);
    assert!(!config.window.vsync);
    assert_eq!(config.viewer.initial_floors, vec!["Floor 3".to_string(), "Floor 4".to_string()]);
}
