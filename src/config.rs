use anyhow::{Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::camera3d::{Camera3D, ControlsSettings};

pub const DEFAULT_CONFIG_PATH: &str = "config/viewer.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
    #[serde(default = "WindowConfig::default_vsync")]
    pub vsync: bool,
    #[serde(default)]
    pub fullscreen: bool,
}

/// sRGB color written either as `"#rrggbb"` or as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HexColorRepr")]
pub struct HexColor(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum HexColorRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<HexColorRepr> for HexColor {
    type Error = String;

    fn try_from(value: HexColorRepr) -> std::result::Result<Self, Self::Error> {
        match value {
            HexColorRepr::Number(raw) if raw <= 0xFF_FF_FF => Ok(HexColor(raw)),
            HexColorRepr::Number(raw) => Err(format!("color {raw:#x} does not fit in 24 bits")),
            HexColorRepr::Text(text) => {
                let digits = text.trim().trim_start_matches('#').trim_start_matches("0x");
                if digits.len() != 6 {
                    return Err(format!("color '{text}' must have six hex digits"));
                }
                u32::from_str_radix(digits, 16).map(HexColor).map_err(|err| format!("color '{text}': {err}"))
            }
        }
    }
}

impl HexColor {
    /// Channels in 0..=1, still sRGB encoded.
    pub fn to_rgb(self) -> [f32; 3] {
        let r = ((self.0 >> 16) & 0xFF) as f32 / 255.0;
        let g = ((self.0 >> 8) & 0xFF) as f32 / 255.0;
        let b = (self.0 & 0xFF) as f32 / 255.0;
        [r, g, b]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_position")]
    pub position: [f32; 3],
    #[serde(default = "CameraConfig::default_target")]
    pub target: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "ControlsConfig::default_enable_damping")]
    pub enable_damping: bool,
    #[serde(default = "ControlsConfig::default_damping_factor")]
    pub damping_factor: f32,
    #[serde(default = "ControlsConfig::default_speed")]
    pub rotate_speed: f32,
    #[serde(default = "ControlsConfig::default_speed")]
    pub zoom_speed: f32,
    #[serde(default = "ControlsConfig::default_speed")]
    pub pan_speed: f32,
    #[serde(default = "ControlsConfig::default_max_polar_degrees")]
    pub max_polar_degrees: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorStyle {
    /// Uniform scale applied to every floor model.
    #[serde(default = "FloorStyle::default_scale")]
    pub scale: f32,
    #[serde(default = "FloorStyle::default_surface_color")]
    pub surface_color: HexColor,
    #[serde(default = "FloorStyle::default_opacity")]
    pub opacity: f32,
    #[serde(default = "FloorStyle::default_edge_color")]
    pub edge_color: HexColor,
    #[serde(default = "FloorStyle::default_edge_threshold_degrees")]
    pub edge_threshold_degrees: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapePalette {
    #[serde(default = "ShapePalette::default_base")]
    pub base: HexColor,
    #[serde(default = "ShapePalette::default_highlight")]
    pub highlight: HexColor,
    #[serde(default = "ShapePalette::default_label")]
    pub label: HexColor,
    /// Clear color behind the scene.
    #[serde(default = "ShapePalette::default_background")]
    pub background: HexColor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_plan_path")]
    pub plan_path: PathBuf,
    #[serde(default = "ViewerConfig::default_font_path")]
    pub font_path: PathBuf,
    #[serde(default = "ViewerConfig::default_initial_floors")]
    pub initial_floors: Vec<String>,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default = "ViewerConfig::default_focus_pull_back")]
    pub focus_pull_back: f32,
    #[serde(default = "ViewerConfig::default_label_size")]
    pub label_size: f32,
    #[serde(default)]
    pub floor_style: FloorStyle,
    #[serde(default)]
    pub palette: ShapePalette,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    pub floors: Option<Vec<String>>,
}

impl WindowConfig {
    fn default_title() -> String {
        "Campus Viewer".to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }

    const fn default_vsync() -> bool {
        true
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
            vsync: Self::default_vsync(),
            fullscreen: false,
        }
    }
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        75.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1000.0
    }

    const fn default_position() -> [f32; 3] {
        [3.3, 3.0, 3.0]
    }

    const fn default_target() -> [f32; 3] {
        [0.0, 0.0, 0.75]
    }

    pub fn build(&self) -> Camera3D {
        Camera3D::new(
            Vec3::from_array(self.position),
            Vec3::from_array(self.target),
            self.fov_degrees.to_radians(),
            self.near,
            self.far,
        )
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            position: Self::default_position(),
            target: Self::default_target(),
        }
    }
}

impl ControlsConfig {
    const fn default_enable_damping() -> bool {
        true
    }

    const fn default_damping_factor() -> f32 {
        0.1
    }

    const fn default_speed() -> f32 {
        0.7
    }

    const fn default_max_polar_degrees() -> f32 {
        90.0
    }

    pub fn settings(&self) -> ControlsSettings {
        ControlsSettings {
            enable_damping: self.enable_damping,
            damping_factor: self.damping_factor.clamp(0.0, 1.0),
            rotate_speed: self.rotate_speed,
            zoom_speed: self.zoom_speed,
            pan_speed: self.pan_speed,
            max_polar_angle: self.max_polar_degrees.to_radians(),
            ..ControlsSettings::default()
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: Self::default_enable_damping(),
            damping_factor: Self::default_damping_factor(),
            rotate_speed: Self::default_speed(),
            zoom_speed: Self::default_speed(),
            pan_speed: Self::default_speed(),
            max_polar_degrees: Self::default_max_polar_degrees(),
        }
    }
}

impl FloorStyle {
    const fn default_scale() -> f32 {
        0.01
    }

    const fn default_surface_color() -> HexColor {
        HexColor(0x423e52)
    }

    const fn default_opacity() -> f32 {
        0.75
    }

    const fn default_edge_color() -> HexColor {
        HexColor(0x3e4452)
    }

    const fn default_edge_threshold_degrees() -> f32 {
        1.0
    }
}

impl Default for FloorStyle {
    fn default() -> Self {
        Self {
            scale: Self::default_scale(),
            surface_color: Self::default_surface_color(),
            opacity: Self::default_opacity(),
            edge_color: Self::default_edge_color(),
            edge_threshold_degrees: Self::default_edge_threshold_degrees(),
        }
    }
}

impl ShapePalette {
    const fn default_base() -> HexColor {
        HexColor(0x423e52)
    }

    const fn default_highlight() -> HexColor {
        HexColor(0x8c879f)
    }

    const fn default_label() -> HexColor {
        HexColor(0x000000)
    }

    const fn default_background() -> HexColor {
        HexColor(0xf4f3f7)
    }
}

impl Default for ShapePalette {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            highlight: Self::default_highlight(),
            label: Self::default_label(),
            background: Self::default_background(),
        }
    }
}

impl ViewerConfig {
    fn default_plan_path() -> PathBuf {
        PathBuf::from("assets/campus_plan.json")
    }

    fn default_font_path() -> PathBuf {
        PathBuf::from("assets/fonts/helvetiker_regular.typeface.json")
    }

    fn default_initial_floors() -> Vec<String> {
        vec!["Floor 1".to_string()]
    }

    const fn default_focus_pull_back() -> f32 {
        4.0
    }

    const fn default_label_size() -> f32 {
        0.03
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            plan_path: Self::default_plan_path(),
            font_path: Self::default_font_path(),
            initial_floors: Self::default_initial_floors(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            focus_pull_back: Self::default_focus_pull_back(),
            label_size: Self::default_label_size(),
            floor_style: FloorStyle::default(),
            palette: ShapePalette::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
        if let Some(floors) = overrides.floors.as_ref() {
            self.viewer.initial_floors = floors.clone();
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.vsync.is_none() && self.floors.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.vsync.is_some() {
            fields.push("vsync");
        }
        if self.floors.is_some() {
            fields.push("floors");
        }
        fields
    }
}
