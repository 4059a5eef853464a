//! Pinhole camera model in normalized image coordinates.

use nalgebra::{Isometry3, Point3};

use super::provider::{CameraModel, ProjectedPoint};
use crate::tracker::{EstimatedSize, Rect};

/// Minimum camera-space depth for a point to count as in front of the sensor.
const MIN_PROJECTION_DEPTH: f32 = 1e-4;

/// Pinhole camera with x right, y down, z forward in camera space.
///
/// Focal lengths and principal point are expressed in normalized image units,
/// i.e. pixels divided by the image width / height.
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeCamera {
    /// Camera-to-world transform
    pub pose: Isometry3<f32>,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Default for PinholeCamera {
    fn default() -> Self {
        Self::new(Isometry3::identity(), 1.0, 1.0)
    }
}

impl PinholeCamera {
    /// Camera with the principal point at the image center.
    pub fn new(pose: Isometry3<f32>, fx: f32, fy: f32) -> Self {
        Self {
            pose,
            fx,
            fy,
            cx: 0.5,
            cy: 0.5,
        }
    }

    /// Build from pixel intrinsics and the image resolution.
    pub fn from_pixels(
        pose: Isometry3<f32>,
        fx_px: f32,
        fy_px: f32,
        cx_px: f32,
        cy_px: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            pose,
            fx: fx_px / w,
            fy: fy_px / h,
            cx: cx_px / w,
            cy: cy_px / h,
        }
    }

    pub fn with_pose(mut self, pose: Isometry3<f32>) -> Self {
        self.pose = pose;
        self
    }
}

impl CameraModel for PinholeCamera {
    fn project(&self, world: &Point3<f32>, allow_offscreen: bool) -> Option<ProjectedPoint> {
        let p = self.pose.inverse_transform_point(world);
        if !(p.z > MIN_PROJECTION_DEPTH) {
            return None;
        }
        let x = self.cx + self.fx * p.x / p.z;
        let y = self.cy + self.fy * p.y / p.z;
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let on_screen = (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y);
        if !allow_offscreen && !on_screen {
            return None;
        }
        Some(ProjectedPoint { x, y, depth: p.z })
    }

    fn unproject(&self, point: (f32, f32), depth: f32) -> Option<Point3<f32>> {
        if !(depth > 0.0) || self.fx == 0.0 || self.fy == 0.0 {
            return None;
        }
        let camera_point = Point3::new(
            (point.0 - self.cx) * depth / self.fx,
            (point.1 - self.cy) * depth / self.fy,
            depth,
        );
        Some(self.pose.transform_point(&camera_point))
    }

    fn estimate_size(&self, region: &Rect, depth: f32) -> Option<EstimatedSize> {
        if !(depth > 0.0) || region.is_degenerate() || self.fx == 0.0 || self.fy == 0.0 {
            return None;
        }
        Some(EstimatedSize::new(
            region.width * depth / self.fx,
            region.height * depth / self.fy,
        ))
    }

    fn normalized_extent(&self, size: &EstimatedSize, depth: f32) -> Option<(f32, f32)> {
        if !(depth > 0.0) {
            return None;
        }
        Some((size.width * self.fx / depth, size.height * self.fy / depth))
    }

    fn sensor_position(&self) -> Point3<f32> {
        Point3::from(self.pose.translation.vector)
    }
}
