use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::geometry::Aabb;

const CURVE_SEGMENTS: usize = 6;

/// Typeface in the JSON layout produced by the three.js facetype converter.
#[derive(Debug, Clone, Deserialize)]
pub struct Typeface {
    pub glyphs: HashMap<String, Glyph>,
    pub resolution: f32,
    #[serde(rename = "boundingBox")]
    pub bounding_box: TypefaceBounds,
    #[serde(rename = "underlineThickness", default)]
    pub underline_thickness: f32,
    #[serde(rename = "familyName", default)]
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Glyph {
    pub ha: f32,
    #[serde(default)]
    pub x_min: f32,
    #[serde(default)]
    pub x_max: f32,
    /// Outline command stream: `m x y`, `l x y`, `q x y cx cy`, `b x y c1x c1y c2x c2y`.
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TypefaceBounds {
    #[serde(rename = "yMin")]
    pub y_min: f32,
    #[serde(rename = "yMax")]
    pub y_max: f32,
    #[serde(rename = "xMin", default)]
    pub x_min: f32,
    #[serde(rename = "xMax", default)]
    pub x_max: f32,
}

/// Flat text laid out in the local XY plane.
///
/// `outline_*` is a line list tracing the glyph outlines; `cell_*` holds one
/// quad per glyph advance and is what ray picks test against.
#[derive(Debug, Clone, Default)]
pub struct TextGeometry {
    pub outline_positions: Vec<Vec3>,
    pub outline_indices: Vec<u32>,
    pub cell_positions: Vec<Vec3>,
    pub cell_indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Typeface {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read typeface {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Failed to parse typeface {}", path.display()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let typeface: Typeface = serde_json::from_slice(bytes)?;
        if typeface.resolution <= 0.0 {
            return Err(anyhow!("Typeface resolution must be positive, got {}", typeface.resolution));
        }
        Ok(typeface)
    }

    pub fn line_height(&self) -> f32 {
        self.bounding_box.y_max - self.bounding_box.y_min + self.underline_thickness
    }

    /// Lays out `text` at `size` world units per em. Characters missing from
    /// the typeface are skipped without advancing.
    pub fn layout(&self, text: &str, size: f32) -> TextGeometry {
        let scale = size / self.resolution;
        let line_height = self.line_height() * scale;
        let cell_bottom = self.bounding_box.y_min * scale;
        let cell_top = self.bounding_box.y_max * scale;

        let mut geometry = TextGeometry::default();
        let mut pen = Vec2::ZERO;
        for ch in text.chars() {
            if ch == '\n' {
                pen.x = 0.0;
                pen.y -= line_height;
                continue;
            }
            let mut utf8 = [0u8; 4];
            let Some(glyph) = self.glyphs.get(&*ch.encode_utf8(&mut utf8)) else {
                continue;
            };
            let advance = glyph.ha * scale;
            if let Some(outline) = glyph.o.as_deref() {
                append_outline(&mut geometry, outline, scale, pen);
            }
            if advance > 0.0 {
                let base = geometry.cell_positions.len() as u32;
                let corners = [
                    Vec3::new(pen.x, pen.y + cell_bottom, 0.0),
                    Vec3::new(pen.x + advance, pen.y + cell_bottom, 0.0),
                    Vec3::new(pen.x + advance, pen.y + cell_top, 0.0),
                    Vec3::new(pen.x, pen.y + cell_top, 0.0),
                ];
                for corner in corners {
                    geometry.bounds.include(corner);
                }
                geometry.cell_positions.extend_from_slice(&corners);
                geometry.cell_indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            pen.x += advance;
        }
        geometry
    }
}

fn append_outline(geometry: &mut TextGeometry, outline: &str, scale: f32, offset: Vec2) {
    let mut tokens = outline.split_whitespace();
    let mut cursor: Option<Vec2> = None;
    let next_point = |tokens: &mut std::str::SplitWhitespace<'_>| -> Option<Vec2> {
        let x: f32 = tokens.next()?.parse().ok()?;
        let y: f32 = tokens.next()?.parse().ok()?;
        Some(Vec2::new(x, y) * scale + offset)
    };

    while let Some(command) = tokens.next() {
        match command {
            "m" => {
                let Some(point) = next_point(&mut tokens) else { return };
                cursor = Some(point);
            }
            "l" => {
                let Some(point) = next_point(&mut tokens) else { return };
                if let Some(start) = cursor {
                    push_segment(geometry, start, point);
                }
                cursor = Some(point);
            }
            "q" => {
                let (Some(end), Some(control)) = (next_point(&mut tokens), next_point(&mut tokens)) else {
                    return;
                };
                if let Some(start) = cursor {
                    let mut previous = start;
                    for step in 1..=CURVE_SEGMENTS {
                        let t = step as f32 / CURVE_SEGMENTS as f32;
                        let u = 1.0 - t;
                        let point = start * (u * u) + control * (2.0 * u * t) + end * (t * t);
                        push_segment(geometry, previous, point);
                        previous = point;
                    }
                }
                cursor = Some(end);
            }
            "b" => {
                let (Some(end), Some(c1), Some(c2)) =
                    (next_point(&mut tokens), next_point(&mut tokens), next_point(&mut tokens))
                else {
                    return;
                };
                if let Some(start) = cursor {
                    let mut previous = start;
                    for step in 1..=CURVE_SEGMENTS {
                        let t = step as f32 / CURVE_SEGMENTS as f32;
                        let u = 1.0 - t;
                        let point =
                            start * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + end * (t * t * t);
                        push_segment(geometry, previous, point);
                        previous = point;
                    }
                }
                cursor = Some(end);
            }
            "z" => {}
            _ => return,
        }
    }
}

fn push_segment(geometry: &mut TextGeometry, a: Vec2, b: Vec2) {
    let base = geometry.outline_positions.len() as u32;
    geometry.outline_positions.push(a.extend(0.0));
    geometry.outline_positions.push(b.extend(0.0));
    geometry.outline_indices.extend_from_slice(&[base, base + 1]);
}
