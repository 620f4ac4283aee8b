use anyhow::{bail, Result};
use glam::{Mat4, Vec3};

/// Axis-aligned bounds in whatever space the owning geometry lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb { min: Vec3::splat(f32::INFINITY), max: Vec3::splat(f32::NEG_INFINITY) };

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.include(*point);
        }
        bounds
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, transform: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.include(transform.transform_point3(corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Outline of a room, triangulated as a fan around the first point.
///
/// Points are expected to be coplanar and convex; anything else still
/// triangulates, just not correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomPolygon {
    points: Vec<Vec3>,
}

impl RoomPolygon {
    pub fn new(points: Vec<Vec3>) -> Result<Self> {
        if points.len() < 3 {
            bail!("Room polygon needs at least 3 points, got {}", points.len());
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn fan_indices(&self) -> Vec<u32> {
        let count = self.points.len() as u32;
        let mut indices = Vec::with_capacity((self.points.len() - 2) * 3);
        for i in 1..count - 1 {
            indices.extend_from_slice(&[0, i, i + 1]);
        }
        indices
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }
}

/// Iterates the triangles of an indexed list, skipping out-of-range indices.
pub fn indexed_triangles<'a>(
    positions: &'a [Vec3],
    indices: &'a [u32],
) -> impl Iterator<Item = [Vec3; 3]> + 'a {
    indices.chunks_exact(3).filter_map(move |tri| {
        let a = positions.get(tri[0] as usize)?;
        let b = positions.get(tri[1] as usize)?;
        let c = positions.get(tri[2] as usize)?;
        Some([*a, *b, *c])
    })
}
