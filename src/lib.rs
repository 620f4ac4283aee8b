pub mod app;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod events;
pub mod floor;
pub mod font;
pub mod geometry;
pub mod input;
pub mod loader;
pub mod picking;
pub mod plan;
pub mod renderer;
pub mod shape;
pub mod ui_state;
pub mod viewer;

pub use app::{run, run_with_overrides, App};
