use glam::{Mat4, Vec2, Vec3, Vec4};
use std::f32::consts::{PI, TAU};

use crate::geometry::Aabb;
use crate::picking::Ray;

const DEFAULT_UP: Vec3 = Vec3::Y;
const POLAR_EPSILON: f32 = 1e-6;

/// Where the camera sits and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }
}

/// Perspective camera looking at `target`, which doubles as the orbit target.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Unit vector the camera is pointing along.
    pub fn look_direction(&self) -> Vec3 {
        (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose { position: self.position, target: self.target }
    }

    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.position = pose.position;
        self.target = pose.target;
    }

    /// World-space ray from the camera through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Option<Ray> {
        let inv_view_proj = self.view_projection(aspect).inverse();
        let far = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        if far.w.abs() < f32::EPSILON {
            return None;
        }
        let world = far.truncate() / far.w;
        Ray::new(self.position, world - self.position)
    }
}

/// Camera distance that frames `bounds` at the current field of view.
///
/// The `tan(fov * 2)` term and the pull-back multiplier are tuned by eye for the
/// campus plans rather than derived from the frustum.
pub fn framing_distance(bounds: &Aabb, fov_y_radians: f32, aspect: f32, pull_back: f32) -> f32 {
    let half_extent = bounds.max_extent() * 0.5;
    (half_extent * (fov_y_radians * 2.0).tan()).abs() * aspect * pull_back
}

/// Rectangle occupied by the render surface, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl SurfaceRect {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width as f32, height as f32))
    }

    pub fn is_degenerate(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    pub fn aspect(&self) -> f32 {
        if self.size.y <= 0.0 {
            1.0
        } else {
            self.size.x / self.size.y
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x <= self.origin.x + self.size.x
            && point.y <= self.origin.y + self.size.y
    }

    pub fn to_ndc(&self, screen: Vec2) -> Option<Vec2> {
        if self.is_degenerate() {
            return None;
        }
        let x = ((screen.x - self.origin.x) / self.size.x) * 2.0 - 1.0;
        let y = -((screen.y - self.origin.y) / self.size.y) * 2.0 + 1.0;
        Some(Vec2::new(x, y))
    }
}

#[derive(Debug, Clone)]
pub struct ControlsSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.1,
            rotate_speed: 0.7,
            zoom_speed: 0.7,
            pan_speed: 0.7,
            min_polar_angle: 0.0,
            max_polar_angle: PI / 2.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

/// Map-style orbit controls: drag pans across the ground plane, secondary drag
/// orbits, wheel dollies. Input accumulates as pending motion that `update`
/// applies (and, with damping, bleeds off over several frames).
#[derive(Debug, Clone)]
pub struct MapControls {
    pub settings: ControlsSettings,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl MapControls {
    pub fn new(settings: ControlsSettings) -> Self {
        Self { settings, delta_theta: 0.0, delta_phi: 0.0, scale: 1.0, pan_offset: Vec3::ZERO }
    }

    pub fn has_pending_motion(&self) -> bool {
        self.delta_theta.abs() > POLAR_EPSILON
            || self.delta_phi.abs() > POLAR_EPSILON
            || (self.scale - 1.0).abs() > POLAR_EPSILON
            || self.pan_offset.length_squared() > POLAR_EPSILON * POLAR_EPSILON
    }

    /// Drops any motion still waiting to be applied.
    pub fn stop(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
    }

    pub fn rotate(&mut self, delta_pixels: Vec2, rect: &SurfaceRect) {
        if rect.is_degenerate() {
            return;
        }
        let speed = self.settings.rotate_speed;
        self.delta_theta -= TAU * delta_pixels.x / rect.size.y * speed;
        self.delta_phi -= TAU * delta_pixels.y / rect.size.y * speed;
    }

    /// Pans parallel to the ground plane, the way map viewers do.
    pub fn pan(&mut self, delta_pixels: Vec2, camera: &Camera3D, rect: &SurfaceRect) {
        if rect.is_degenerate() {
            return;
        }
        let offset = camera.position - camera.target;
        let target_distance = offset.length() * (camera.fov_y_radians * 0.5).tan();
        let forward = camera.look_direction();
        let right = forward.cross(camera.up).try_normalize().unwrap_or(Vec3::X);
        let ground_forward = camera.up.cross(right).try_normalize().unwrap_or(Vec3::NEG_Z);
        let speed = self.settings.pan_speed;
        let left = -right * (2.0 * delta_pixels.x * target_distance / rect.size.y) * speed;
        let along = ground_forward * (2.0 * delta_pixels.y * target_distance / rect.size.y) * speed;
        self.pan_offset += left + along;
    }

    /// Positive steps move toward the target.
    pub fn dolly(&mut self, steps: f32) {
        if steps == 0.0 {
            return;
        }
        let factor = 0.95_f32.powf(self.settings.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else {
            self.scale /= factor;
        }
    }

    /// Applies pending motion to the camera. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut Camera3D) -> bool {
        let before = camera.pose();
        let step = if self.settings.enable_damping { self.settings.damping_factor } else { 1.0 };

        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 { (offset.y / radius).clamp(-1.0, 1.0).acos() } else { 0.0 };

        theta += self.delta_theta * step;
        phi += self.delta_phi * step;
        phi = phi.clamp(self.settings.min_polar_angle, self.settings.max_polar_angle);
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        radius = (radius * self.scale).clamp(self.settings.min_distance, self.settings.max_distance);
        camera.target += self.pan_offset * step;

        let sin_phi = phi.sin();
        let offset = Vec3::new(radius * sin_phi * theta.sin(), radius * phi.cos(), radius * sin_phi * theta.cos());
        camera.position = camera.target + offset;

        if self.settings.enable_damping {
            self.delta_theta *= 1.0 - self.settings.damping_factor;
            self.delta_phi *= 1.0 - self.settings.damping_factor;
            self.pan_offset *= 1.0 - self.settings.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        let after = camera.pose();
        (after.position - before.position).length_squared() > 1e-12
            || (after.target - before.target).length_squared() > 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera3D {
        Camera3D::new(Vec3::new(3.3, 3.0, 3.0), Vec3::new(0.0, 0.0, 0.75), 75.0_f32.to_radians(), 0.1, 1000.0)
    }

    #[test]
    fn view_projection_is_finite() {
        let vp = camera().view_projection(16.0 / 9.0);
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn surface_rect_maps_corners_to_ndc() {
        let rect = SurfaceRect::new(Vec2::new(100.0, 50.0), Vec2::new(800.0, 600.0));
        assert_eq!(rect.to_ndc(Vec2::new(100.0, 50.0)), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(rect.to_ndc(Vec2::new(900.0, 650.0)), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(rect.to_ndc(Vec2::new(500.0, 350.0)), Some(Vec2::ZERO));
        assert!(SurfaceRect::from_size(0, 10).to_ndc(Vec2::ZERO).is_none());
    }

    #[test]
    fn center_ray_follows_look_direction() {
        let camera = camera();
        let ray = camera.ray_from_ndc(Vec2::ZERO, 1.5).expect("ray");
        assert!((ray.direction - camera.look_direction()).length() < 1e-4);
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn off_center_ray_passes_through_the_projected_point() {
        let camera = camera();
        let rect = SurfaceRect::from_size(1280, 720);
        let point = Vec3::new(0.4, 0.0, 1.2);
        let clip = camera.view_projection(rect.aspect()) * point.extend(1.0);
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        let ray = camera.ray_from_ndc(ndc, rect.aspect()).expect("ray");
        let expected = (point - camera.position).normalize();
        assert!((ray.direction - expected).length() < 1e-3);
    }

    #[test]
    fn idle_update_keeps_pose() {
        let mut camera = camera();
        let before = camera.pose();
        let mut controls = MapControls::new(ControlsSettings::default());
        controls.update(&mut camera);
        assert!((camera.position - before.position).length() < 1e-4);
        assert_eq!(camera.target, before.target);
    }

    #[test]
    fn polar_angle_is_clamped_above_ground() {
        let mut camera = camera();
        let mut controls = MapControls::new(ControlsSettings { enable_damping: false, ..Default::default() });
        controls.rotate(Vec2::new(0.0, -5000.0), &SurfaceRect::from_size(800, 600));
        controls.update(&mut camera);
        assert!(camera.position.y >= camera.target.y - 1e-4);
    }

    #[test]
    fn damped_pan_converges_to_full_offset() {
        let mut camera = camera();
        let start_target = camera.target;
        let rect = SurfaceRect::from_size(800, 600);
        let mut damped = MapControls::new(ControlsSettings::default());
        damped.pan(Vec2::new(40.0, 0.0), &camera, &rect);
        let mut undamped_camera = camera.clone();
        let mut undamped = MapControls::new(ControlsSettings { enable_damping: false, ..Default::default() });
        undamped.pan(Vec2::new(40.0, 0.0), &undamped_camera, &rect);
        undamped.update(&mut undamped_camera);

        for _ in 0..400 {
            damped.update(&mut camera);
        }
        assert!(!damped.has_pending_motion());
        assert!((camera.target - undamped_camera.target).length() < 1e-3);
        assert!((camera.target.y - start_target.y).abs() < 1e-5, "map pan stays on the ground plane");
    }

    #[test]
    fn dolly_in_shrinks_distance() {
        let mut camera = camera();
        let before = camera.position.distance(camera.target);
        let mut controls = MapControls::new(ControlsSettings { enable_damping: false, ..Default::default() });
        controls.dolly(3.0);
        controls.update(&mut camera);
        assert!(camera.position.distance(camera.target) < before);
    }

    #[test]
    fn framing_distance_scales_with_extent_and_aspect() {
        let bounds = Aabb::from_points(&[Vec3::ZERO, Vec3::new(0.4, 0.0, 0.2)]);
        let fov = 75.0_f32.to_radians();
        let base = framing_distance(&bounds, fov, 1.0, 4.0);
        let expected = (0.2 * (fov * 2.0).tan()).abs() * 4.0;
        assert!((base - expected).abs() < 1e-6);
        assert!((framing_distance(&bounds, fov, 2.0, 4.0) - base * 2.0).abs() < 1e-6);
    }
}
