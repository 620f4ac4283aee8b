use glam::{Mat4, Vec3};

use super::Viewer;
use crate::config::HexColor;
use crate::shape::{ShapeId, SurfaceMaterial};

/// Stable identity of a piece of geometry, used to cache GPU buffers across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKey {
    FloorSurface { floor: usize, surface: usize },
    FloorEdges { floor: usize, surface: usize },
    Room(ShapeId),
    Label(ShapeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Triangles,
    Lines,
}

/// One flat-colored draw. Color is sRGB with straight alpha.
#[derive(Debug, Clone)]
pub struct SceneDraw<'a> {
    pub key: DrawKey,
    pub kind: DrawKind,
    pub positions: &'a [Vec3],
    pub indices: &'a [u32],
    pub model: Mat4,
    pub color: [f32; 4],
    pub translucent: bool,
}

fn rgba(color: HexColor, alpha: f32) -> [f32; 4] {
    let [r, g, b] = color.to_rgb();
    [r, g, b, alpha]
}

impl Viewer {
    /// Everything visible this frame: opaque draws first, translucent floor
    /// surfaces last.
    pub fn draw_list(&self) -> Vec<SceneDraw<'_>> {
        let style = &self.settings.floor_style;
        let palette = &self.settings.palette;
        let floor_model = Mat4::from_scale(Vec3::splat(style.scale));
        let mut opaque = Vec::new();
        let mut translucent = Vec::new();

        for (floor_index, floor) in self.floors.iter().enumerate() {
            let Some(asset) = floor.renderable() else {
                continue;
            };
            for (surface_index, surface) in asset.surfaces.iter().enumerate() {
                if !surface.edge_indices.is_empty() {
                    opaque.push(SceneDraw {
                        key: DrawKey::FloorEdges { floor: floor_index, surface: surface_index },
                        kind: DrawKind::Lines,
                        positions: &surface.edge_positions,
                        indices: &surface.edge_indices,
                        model: floor_model,
                        color: rgba(style.edge_color, 1.0),
                        translucent: false,
                    });
                }
                let draw = SceneDraw {
                    key: DrawKey::FloorSurface { floor: floor_index, surface: surface_index },
                    kind: DrawKind::Triangles,
                    positions: &surface.positions,
                    indices: &surface.indices,
                    model: floor_model,
                    color: rgba(style.surface_color, style.opacity.clamp(0.0, 1.0)),
                    translucent: style.opacity < 1.0,
                };
                if draw.translucent {
                    translucent.push(draw);
                } else {
                    opaque.push(draw);
                }
            }
        }

        for (index, shape) in self.shapes.iter().enumerate() {
            if !shape.is_visible() {
                continue;
            }
            let id = ShapeId(index);
            let color = match shape.material() {
                SurfaceMaterial::Base => palette.base,
                SurfaceMaterial::Highlight => palette.highlight,
            };
            opaque.push(SceneDraw {
                key: DrawKey::Room(id),
                kind: DrawKind::Triangles,
                positions: shape.surface().positions(),
                indices: shape.surface().indices(),
                model: Mat4::IDENTITY,
                color: rgba(color, 1.0),
                translucent: false,
            });
            let label = shape.label().filter(|label| label.visible && !label.text.outline_indices.is_empty());
            if let Some(label) = label {
                opaque.push(SceneDraw {
                    key: DrawKey::Label(id),
                    kind: DrawKind::Lines,
                    positions: &label.text.outline_positions,
                    indices: &label.text.outline_indices,
                    model: label.model_matrix(),
                    color: rgba(palette.label, 1.0),
                    translucent: false,
                });
            }
        }

        opaque.extend(translucent);
        opaque
    }
}
