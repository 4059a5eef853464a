//! Depth provider backed by a dense depth image.

use nalgebra::Point3;
use ndarray::{Array1, Array2};

use super::camera::PinholeCamera;
use super::provider::{CameraModel, DepthProvider, ProjectedPoint, SampleGrid};
use crate::tracker::{DepthSample, EstimatedSize, Rect};

/// Dense depth image (rows x cols, meters) plus the camera that captured it.
///
/// Non-finite and non-positive depth values count as invalid samples.
#[derive(Debug, Clone)]
pub struct DepthMapProvider {
    depth: Array2<f32>,
    camera: PinholeCamera,
    last_refresh: Option<f64>,
}

impl DepthMapProvider {
    pub fn new(depth: Array2<f32>, camera: PinholeCamera) -> Self {
        Self {
            depth,
            camera,
            last_refresh: None,
        }
    }

    /// Replace the depth image, e.g. when a new sensor frame arrives.
    pub fn set_depth(&mut self, depth: Array2<f32>) {
        self.depth = depth;
    }

    pub fn set_camera(&mut self, camera: PinholeCamera) {
        self.camera = camera;
    }

    pub fn depth(&self) -> &Array2<f32> {
        &self.depth
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    /// Timestamp passed to the latest `refresh`.
    pub fn last_refresh(&self) -> Option<f64> {
        self.last_refresh
    }

    fn depth_at(&self, u: f32, v: f32) -> Option<f32> {
        let (rows, cols) = self.depth.dim();
        if rows == 0 || cols == 0 {
            return None;
        }
        let col = ((u * cols as f32).floor() as usize).min(cols - 1);
        let row = ((v * rows as f32).floor() as usize).min(rows - 1);
        let value = self.depth[[row, col]];
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

/// Linear interpolation between order statistics of a sorted slice.
fn percentile(sorted: &[f32], q: f32) -> f32 {
    let pos = q * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let t = pos - lo as f32;
    sorted[lo] * (1.0 - t) + sorted[hi] * t
}

impl CameraModel for DepthMapProvider {
    fn project(&self, world: &Point3<f32>, allow_offscreen: bool) -> Option<ProjectedPoint> {
        self.camera.project(world, allow_offscreen)
    }

    fn unproject(&self, point: (f32, f32), depth: f32) -> Option<Point3<f32>> {
        self.camera.unproject(point, depth)
    }

    fn estimate_size(&self, region: &Rect, depth: f32) -> Option<EstimatedSize> {
        self.camera.estimate_size(region, depth)
    }

    fn normalized_extent(&self, size: &EstimatedSize, depth: f32) -> Option<(f32, f32)> {
        self.camera.normalized_extent(size, depth)
    }

    fn sensor_position(&self) -> Point3<f32> {
        self.camera.sensor_position()
    }
}

impl DepthProvider for DepthMapProvider {
    type Snapshot = PinholeCamera;

    fn refresh(&mut self, timestamp: f64) {
        self.last_refresh = Some(timestamp);
    }

    fn sample_depth(&self, region: &Rect, grid: SampleGrid) -> Option<DepthSample> {
        if grid.is_empty() {
            return None;
        }
        let [x1, y1, x2, y2] = region.to_tlbr();
        let clipped = Rect::from_tlbr(x1.max(0.0), y1.max(0.0), x2.min(1.0), y2.min(1.0));
        if clipped.is_degenerate() {
            return None;
        }

        let mut values = Vec::with_capacity(grid.len());
        for r in 0..grid.rows {
            let v = clipped.y + (r as f32 + 0.5) / grid.rows as f32 * clipped.height;
            for c in 0..grid.cols {
                let u = clipped.x + (c as f32 + 0.5) / grid.cols as f32 * clipped.width;
                if let Some(d) = self.depth_at(u, v) {
                    values.push(d);
                }
            }
        }
        if values.is_empty() {
            return None;
        }

        values.sort_by(f32::total_cmp);
        let (p25, median, p75) = (
            percentile(&values, 0.25),
            percentile(&values, 0.5),
            percentile(&values, 0.75),
        );
        let valid_count = values.len();
        let samples = Array1::from(values);

        Some(DepthSample {
            p25,
            median,
            p75,
            std_dev: samples.std(0.0),
            valid_ratio: valid_count as f32 / grid.len() as f32,
            valid_count,
            total_count: grid.len(),
        })
    }

    fn snapshot(&self) -> PinholeCamera {
        self.camera.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GRID: SampleGrid = SampleGrid { cols: 4, rows: 4 };

    #[test]
    fn test_uniform_depth() {
        let provider = DepthMapProvider::new(Array2::from_elem((48, 64), 2.0), PinholeCamera::default());
        let sample = provider.sample_depth(&Rect::new(0.25, 0.25, 0.5, 0.5), GRID).unwrap();
        assert_relative_eq!(sample.median, 2.0);
        assert_relative_eq!(sample.std_dev, 0.0);
        assert_relative_eq!(sample.valid_ratio, 1.0);
        assert_eq!(sample.valid_count, 16);
        assert_eq!(sample.total_count, 16);
    }

    #[test]
    fn test_invalid_pixels_lower_ratio() {
        // Left half of the image has no depth
        let mut depth = Array2::from_elem((10, 10), 3.0);
        depth.slice_mut(ndarray::s![.., ..5]).fill(f32::NAN);
        let provider = DepthMapProvider::new(depth, PinholeCamera::default());
        let sample = provider.sample_depth(&Rect::new(0.0, 0.0, 1.0, 1.0), GRID).unwrap();
        assert_eq!(sample.valid_count, 8);
        assert_relative_eq!(sample.valid_ratio, 0.5);
    }

    #[test]
    fn test_percentiles() {
        // Four columns at 1, 2, 3, 4 meters
        let depth = Array2::from_shape_fn((4, 4), |(_, c)| (c + 1) as f32);
        let provider = DepthMapProvider::new(depth, PinholeCamera::default());
        let sample = provider
            .sample_depth(&Rect::new(0.0, 0.0, 1.0, 1.0), SampleGrid { cols: 4, rows: 1 })
            .unwrap();
        assert_relative_eq!(sample.median, 2.5);
        assert_relative_eq!(sample.p25, 1.75);
        assert_relative_eq!(sample.p75, 3.25);
        assert_relative_eq!(sample.std_dev, 1.25f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_no_depth_or_degenerate() {
        let provider = DepthMapProvider::new(Array2::zeros((8, 8)), PinholeCamera::default());
        assert!(provider.sample_depth(&Rect::new(0.2, 0.2, 0.3, 0.3), GRID).is_none());

        let provider = DepthMapProvider::new(Array2::from_elem((8, 8), 1.0), PinholeCamera::default());
        assert!(provider.sample_depth(&Rect::new(0.2, 0.2, 0.0, 0.3), GRID).is_none());
        assert!(provider.sample_depth(&Rect::new(1.2, 0.2, 0.3, 0.3), GRID).is_none());
    }

    #[test]
    fn test_refresh_records_timestamp() {
        let mut provider = DepthMapProvider::new(Array2::zeros((1, 1)), PinholeCamera::default());
        assert_eq!(provider.last_refresh(), None);
        provider.refresh(1.5);
        assert_eq!(provider.last_refresh(), Some(1.5));
    }
}
