/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::geometry::Aabb;
use crate::picker::Ray;
use crate::transform::OrbitState;

/// Perspective camera looking at `target`
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera for a `width` x `height` surface whose pixels are
    /// `pixel_aspect` times taller than wide.
    pub fn new(width: u32, height: u32, pixel_aspect: f32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: surface_aspect(width, height, pixel_aspect),
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32, pixel_aspect: f32) {
        self.aspect = surface_aspect(width, height, pixel_aspect);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with `depth` in normalized device units, or
    /// `None` when the point lies behind the camera. Points outside the
    /// screen rectangle are still returned so that partially visible
    /// primitives can be clipped by the rasterizer.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        view_projection: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip: Vector4<f32> = view_projection * point.to_homogeneous();

        // Prevent division by near-zero or negative w
        if clip.w < 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        if !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }

    /// World-space ray through screen position `(x, y)`.
    pub fn screen_ray(&self, x: f32, y: f32, width: u32, height: u32) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;

        let ndc_x = 2.0 * x / width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height as f32;

        let near = inverse.transform_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc_x, ndc_y, 1.0));

        let direction = (far - near).try_normalize(1e-12)?;
        Some(Ray::new(near, direction))
    }

    /// Move the camera so the whole of `bounds` is visible, keeping the
    /// current viewing direction.
    pub fn fit_to_bounds(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let radius = bounds.radius().max(1e-3);

        let half_vertical = self.fov * 0.5;
        let half_horizontal = ((self.fov * 0.5).tan() * self.aspect).atan();
        let half_angle = half_vertical.min(half_horizontal);
        let distance = radius / half_angle.sin();

        let direction = (self.position - self.target)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);

        self.target = center;
        self.position = center + direction * distance;
        self.near = (distance - radius).max(distance * 0.01) * 0.5;
        self.far = (distance + radius) * 2.0;
    }

    /// Orbit around the target, preserving distance.
    pub fn orbit(&mut self, orbit: &OrbitState) {
        let distance = (self.position - self.target).norm();
        let rotated = orbit.eye_direction();
        self.position = self.target + rotated * distance;

        // Keep `up` from becoming parallel to the view direction
        let right = rotated.cross(&Vector3::y());
        self.up = if right.norm() < 1e-4 {
            Vector3::z()
        } else {
            right.cross(&rotated).normalize()
        };
    }

    /// Direction from the target towards the camera
    pub fn eye_direction(&self) -> Vector3<f32> {
        (self.position - self.target)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z)
    }
}

fn surface_aspect(width: u32, height: u32, pixel_aspect: f32) -> f32 {
    // A collapsed surface still needs a projection nalgebra accepts
    if width == 0 || height == 0 {
        return 1.0;
    }
    width as f32 / (height as f32 * pixel_aspect.max(1e-3))
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600, 1.0)
    }
}
