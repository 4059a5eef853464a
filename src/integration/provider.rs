//! Traits for depth and camera backends.

use nalgebra::Point3;

use crate::tracker::{DepthSample, EstimatedSize, Rect};

/// A world point projected into the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    /// Normalized image x
    pub x: f32,
    /// Normalized image y
    pub y: f32,
    /// Camera-space depth along the optical axis, in meters
    pub depth: f32,
}

/// Sparse sampling grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleGrid {
    pub cols: usize,
    pub rows: usize,
}

impl SampleGrid {
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Geometry of the camera for one frame.
///
/// All image coordinates are normalized with a top-left origin.
pub trait CameraModel {
    /// Project a world point. Returns `None` behind the sensor, or off-screen
    /// when `allow_offscreen` is false.
    fn project(&self, world: &Point3<f32>, allow_offscreen: bool) -> Option<ProjectedPoint>;

    /// World position of the normalized image point at the given depth.
    fn unproject(&self, point: (f32, f32), depth: f32) -> Option<Point3<f32>>;

    /// Physical size of a normalized region at the given depth.
    fn estimate_size(&self, region: &Rect, depth: f32) -> Option<EstimatedSize>;

    /// Normalized image extent (width, height) of a physical size at the given depth.
    fn normalized_extent(&self, size: &EstimatedSize, depth: f32) -> Option<(f32, f32)>;

    fn sensor_position(&self) -> Point3<f32>;

    /// Distance from the sensor to a world point.
    fn distance_to(&self, world: &Point3<f32>) -> f32 {
        nalgebra::distance(&self.sensor_position(), world)
    }
}

/// Depth sensor plus camera geometry, refreshed once per frame.
///
/// # Example
///
/// ```ignore
/// use depthtrack_rs::{DepthProvider, CameraModel};
///
/// struct LidarProvider { /* depth buffer, intrinsics, pose */ }
///
/// impl DepthProvider for LidarProvider {
///     type Snapshot = PinholeCamera;
///
///     fn refresh(&mut self, timestamp: f64) { /* pull the latest depth frame */ }
///     fn sample_depth(&self, region: &Rect, grid: SampleGrid) -> Option<DepthSample> { None }
///     fn snapshot(&self) -> PinholeCamera { self.camera.clone() }
/// }
/// ```
pub trait DepthProvider: CameraModel {
    /// Frozen camera state handed to the matcher and published with the frame.
    type Snapshot: CameraModel + Clone;

    /// Pull the latest depth frame and camera pose.
    fn refresh(&mut self, timestamp: f64);

    /// Depth statistics over a grid inside a normalized region. `None` when the
    /// region is degenerate or holds no valid depth.
    fn sample_depth(&self, region: &Rect, grid: SampleGrid) -> Option<DepthSample>;

    fn snapshot(&self) -> Self::Snapshot;
}
