use crate::geometry::{indexed_triangles, Aabb};
use glam::{Mat4, Vec3};

/// World-space ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    let origin_arr = origin.to_array();
    let dir_arr = dir.to_array();
    let min_arr = min.to_array();
    let max_arr = max.to_array();
    for i in 0..3 {
        let o = origin_arr[i];
        let d = dir_arr[i];
        let min_axis = min_arr[i];
        let max_axis = max_arr[i];
        if d.abs() < 1e-6 {
            if o < min_axis || o > max_axis {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min_axis - o) * inv_d;
            let mut t2 = (max_axis - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    let hit = origin + dir * t_hit;
    Some((t_hit, hit))
}

/// Double-sided Möller-Trumbore test. Returns the ray distance of the hit.
pub fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Nearest hit against an indexed triangle list placed by `transform`.
///
/// `local_bounds` is used as a broad-phase reject before touching triangles.
/// The returned distance is measured in world space along `ray`.
pub fn ray_mesh_intersection(
    ray: &Ray,
    positions: &[Vec3],
    indices: &[u32],
    local_bounds: &Aabb,
    transform: &Mat4,
) -> Option<f32> {
    if local_bounds.is_empty() {
        return None;
    }
    let world_bounds = local_bounds.transformed(transform);
    // Flat room outlines have zero thickness; pad so the slab test still accepts them.
    let pad = Vec3::splat(1e-4);
    ray_aabb_intersection(ray.origin, ray.direction, world_bounds.min - pad, world_bounds.max + pad)?;

    let identity = *transform == Mat4::IDENTITY;
    let mut best: Option<f32> = None;
    for [a, b, c] in indexed_triangles(positions, indices) {
        let (a, b, c) = if identity {
            (a, b, c)
        } else {
            (transform.transform_point3(a), transform.transform_point3(b), transform.transform_point3(c))
        };
        if let Some(distance) = ray_triangle_intersection(ray, a, b, c) {
            if best.is_none_or(|current| distance < current) {
                best = Some(distance);
            }
        }
    }
    best
}
