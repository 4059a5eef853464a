use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Out-of-frame tolerance for projecting confirmed objects.
pub const CONFIRMED_BOUNDS: f32 = 0.1;

/// Configuration shared by the lifter, matcher and lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // Lifting
    pub min_confidence: f32,
    /// Boxes with an edge within this margin of the frame border are dropped
    pub edge_margin: f32,
    /// Fraction of box width trimmed on each side before depth sampling
    pub horizontal_inset: f32,
    pub sample_band_top: f32,
    pub sample_band_bottom: f32,
    pub depth_grid_cols: usize,
    pub depth_grid_rows: usize,
    /// Relative depth std-dev at which the spread score reaches zero
    pub max_relative_std: f32,
    pub min_depth_quality: f32,
    pub min_valid_ratio: f32,
    /// Meters
    pub min_object_height: f32,
    /// Fractions of box width / height
    pub reprojection_tolerance_x: f32,
    pub reprojection_tolerance_y: f32,
    pub enforce_consistency_gate: bool,

    // Matching
    pub high_iou_threshold: f32,
    pub min_iou_threshold: f32,
    pub max_center_distance: f32,
    /// Out-of-frame tolerance for projecting non-confirmed objects
    pub extended_bounds: f32,

    // Smoothing
    pub position_smoothing: f32,
    pub size_smoothing: f32,
    pub confidence_smoothing: f32,

    // Lifecycle
    pub confirmation_frames: u32,
    pub stale_frames: u32,
    pub lost_frames: u32,
    /// Meters
    pub recapture_distance: f32,
    /// Meters
    pub min_new_candidate_distance: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            edge_margin: 0.01,
            horizontal_inset: 0.2,
            sample_band_top: 0.3,
            sample_band_bottom: 0.7,
            depth_grid_cols: 5,
            depth_grid_rows: 5,
            max_relative_std: 0.3,
            min_depth_quality: 0.5,
            min_valid_ratio: 0.5,
            min_object_height: 0.03,
            reprojection_tolerance_x: 0.25,
            reprojection_tolerance_y: 0.25,
            enforce_consistency_gate: true,
            high_iou_threshold: 0.75,
            min_iou_threshold: 0.1,
            max_center_distance: 0.2,
            extended_bounds: 0.5,
            position_smoothing: 0.4,
            size_smoothing: 0.2,
            confidence_smoothing: 0.3,
            confirmation_frames: 3,
            stale_frames: 10,
            lost_frames: 30,
            recapture_distance: 0.08,
            min_new_candidate_distance: 0.05,
        }
    }
}

impl TrackerConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let fractions = [
            ("min_confidence", self.min_confidence),
            ("edge_margin", self.edge_margin),
            ("sample_band_top", self.sample_band_top),
            ("sample_band_bottom", self.sample_band_bottom),
            ("min_depth_quality", self.min_depth_quality),
            ("min_valid_ratio", self.min_valid_ratio),
            ("high_iou_threshold", self.high_iou_threshold),
            ("min_iou_threshold", self.min_iou_threshold),
            ("position_smoothing", self.position_smoothing),
            ("size_smoothing", self.size_smoothing),
            ("confidence_smoothing", self.confidence_smoothing),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::invalid(field, format!("must be in [0, 1], got {value}")));
            }
        }

        if !(0.0..0.5).contains(&self.horizontal_inset) {
            return Err(TrackerError::invalid(
                "horizontal_inset",
                format!("must be in [0, 0.5), got {}", self.horizontal_inset),
            ));
        }
        if self.sample_band_top >= self.sample_band_bottom {
            return Err(TrackerError::invalid(
                "sample_band_top",
                "must be below sample_band_bottom",
            ));
        }

        let positives = [
            ("max_relative_std", self.max_relative_std),
            ("max_center_distance", self.max_center_distance),
            ("recapture_distance", self.recapture_distance),
        ];
        for (field, value) in positives {
            if !(value > 0.0 && value.is_finite()) {
                return Err(TrackerError::invalid(field, format!("must be positive, got {value}")));
            }
        }

        let non_negatives = [
            ("min_object_height", self.min_object_height),
            ("reprojection_tolerance_x", self.reprojection_tolerance_x),
            ("reprojection_tolerance_y", self.reprojection_tolerance_y),
            ("extended_bounds", self.extended_bounds),
            ("min_new_candidate_distance", self.min_new_candidate_distance),
        ];
        for (field, value) in non_negatives {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(TrackerError::invalid(field, format!("must be non-negative, got {value}")));
            }
        }

        if self.depth_grid_cols == 0 || self.depth_grid_rows == 0 {
            return Err(TrackerError::invalid("depth_grid_cols", "grid must be at least 1x1"));
        }

        let frames = [
            ("confirmation_frames", self.confirmation_frames),
            ("stale_frames", self.stale_frames),
            ("lost_frames", self.lost_frames),
        ];
        for (field, value) in frames {
            if value == 0 {
                return Err(TrackerError::invalid(field, "must be at least 1"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_smoothing() {
        let config = TrackerConfig {
            position_smoothing: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidConfig { field: "position_smoothing", .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_band() {
        let config = TrackerConfig {
            sample_band_top: 0.8,
            sample_band_bottom: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_frames() {
        let config = TrackerConfig {
            stale_frames: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{ "min_confidence": 0.7, "enforce_consistency_gate": false }"#)
                .unwrap();
        assert_eq!(config.min_confidence, 0.7);
        assert!(!config.enforce_consistency_gate);
        assert_eq!(config.stale_frames, TrackerConfig::default().stale_frames);
    }
}
