//! Per-frame detection records, before and after lifting to 3D.

use nalgebra::Point3;

use crate::tracker::rect::Rect;
use crate::tracker::size::EstimatedSize;

/// Raw 2D detection as produced by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection2D {
    /// Normalized bounding box (top-left origin)
    pub bbox: Rect,
    /// Class label
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Cross-frame track hint from the detector, if it tracks
    pub track_hint: Option<i64>,
}

impl Detection2D {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            label: label.into(),
            confidence,
            track_hint: None,
        }
    }

    pub fn from_rect(bbox: Rect, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
            track_hint: None,
        }
    }

    pub fn with_track_hint(mut self, hint: i64) -> Self {
        self.track_hint = Some(hint);
        self
    }
}

/// Depth statistics over a sparse sampling grid inside a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSample {
    pub p25: f32,
    pub median: f32,
    pub p75: f32,
    pub std_dev: f32,
    /// Fraction of grid points with a usable depth value
    pub valid_ratio: f32,
    pub valid_count: usize,
    pub total_count: usize,
}

/// Floor for the median depth when computing relative spread.
pub const MIN_DEPTH_FOR_RELATIVE_STD: f32 = 0.01;

impl DepthSample {
    /// Standard deviation relative to the median depth.
    pub fn relative_std(&self) -> f32 {
        self.std_dev / self.median.max(MIN_DEPTH_FOR_RELATIVE_STD)
    }

    /// Quality in [0, 1]: 0.6 from spread (linear decay to zero at
    /// `max_relative_std`) plus 0.4 from the valid-sample ratio.
    pub fn quality(&self, max_relative_std: f32) -> f32 {
        let std_score = (1.0 - self.relative_std() / max_relative_std).clamp(0.0, 1.0);
        0.6 * std_score + 0.4 * self.valid_ratio.clamp(0.0, 1.0)
    }
}

/// Outcome of the 3D -> 2D consistency check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateVerdict {
    Passed,
    Failed(ReprojectionError),
    /// The camera could not reproject the position.
    Skipped,
}

impl GateVerdict {
    pub fn is_failed(&self) -> bool {
        matches!(self, GateVerdict::Failed(_))
    }
}

/// Absolute reprojection error per axis, in normalized image units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprojectionError {
    pub dx: f32,
    pub dy: f32,
}

/// A detection lifted to 3D.
#[derive(Debug, Clone)]
pub struct Detection3D {
    pub bbox: Rect,
    pub label: String,
    pub confidence: f32,
    pub world_position: Point3<f32>,
    pub depth_quality: f32,
    pub depth_std_dev: f32,
    pub valid_ratio: f32,
    pub size: EstimatedSize,
    pub track_hint: Option<i64>,
    /// Reprojected world position, normalized image coordinates
    pub reprojected: Option<(f32, f32)>,
    /// Larger of the per-axis reprojection errors relative to box width / height
    pub reprojection_error: Option<f32>,
    pub gate: GateVerdict,
    /// Vertical position of the depth sample inside the box (0 = top, 1 = bottom)
    pub sampling_ratio: f32,
}
