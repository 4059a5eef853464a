//! Lifts 2D detections to quality-gated 3D observations.
//!
//! Each detection passes through, in order: confidence and screen-edge checks,
//! depth sampling in a central band of the box, depth quality, unprojection,
//! physical size, and a 3D -> 2D reprojection consistency check. Any failing
//! stage drops the detection for this frame.

use std::collections::HashMap;

use tracing::trace;

use crate::error::LiftRejection;
use crate::integration::{DepthProvider, SampleGrid};
use crate::tracker::config::TrackerConfig;
use crate::tracker::detection::{Detection2D, Detection3D, GateVerdict, ReprojectionError};

const MIN_SAMPLING_RATIO: f32 = 0.1;
const MAX_SAMPLING_RATIO: f32 = 0.95;
const DEFAULT_SAMPLING_RATIO: f32 = 0.5;

/// Observations accepted for one frame plus tallies of what was dropped.
#[derive(Debug, Clone, Default)]
pub struct LiftReport {
    pub accepted: Vec<Detection3D>,
    pub rejected: HashMap<LiftRejection, usize>,
}

impl LiftReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct DepthLifter {
    config: TrackerConfig,
}

impl DepthLifter {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Lift every detection, keeping input order among the accepted ones.
    pub fn lift<P: DepthProvider + ?Sized>(&self, detections: &[Detection2D], provider: &P) -> LiftReport {
        let mut report = LiftReport::default();
        for (index, detection) in detections.iter().enumerate() {
            match self.lift_one(detection, provider) {
                Ok(observation) => report.accepted.push(observation),
                Err(reason) => {
                    trace!(index, label = %detection.label, %reason, "detection dropped");
                    *report.rejected.entry(reason).or_default() += 1;
                }
            }
        }
        report
    }

    pub fn lift_one<P: DepthProvider + ?Sized>(
        &self,
        detection: &Detection2D,
        provider: &P,
    ) -> Result<Detection3D, LiftRejection> {
        let cfg = &self.config;
        let bbox = detection.bbox;

        if !(detection.confidence >= cfg.min_confidence) {
            return Err(LiftRejection::LowConfidence);
        }
        if bbox.is_at_screen_edge(cfg.edge_margin) {
            return Err(LiftRejection::AtScreenEdge);
        }

        let region = bbox.sampling_region(cfg.horizontal_inset, cfg.sample_band_top, cfg.sample_band_bottom);
        if region.is_degenerate() {
            return Err(LiftRejection::DegenerateRegion);
        }
        let grid = SampleGrid {
            cols: cfg.depth_grid_cols,
            rows: cfg.depth_grid_rows,
        };
        let sample = provider.sample_depth(&region, grid).ok_or(LiftRejection::NoDepth)?;

        let depth_quality = sample.quality(cfg.max_relative_std);
        if depth_quality < cfg.min_depth_quality {
            return Err(LiftRejection::LowDepthQuality);
        }
        if sample.valid_ratio < cfg.min_valid_ratio {
            return Err(LiftRejection::LowValidRatio);
        }

        let center = bbox.center();
        let world_position = provider
            .unproject(center, sample.median)
            .filter(|p| p.coords.iter().all(|c| c.is_finite()))
            .ok_or(LiftRejection::NonFiniteWorldPosition)?;

        let size = provider
            .estimate_size(&bbox, sample.median)
            .ok_or(LiftRejection::NoSizeEstimate)?;
        if !(size.height >= cfg.min_object_height) {
            return Err(LiftRejection::TooSmall);
        }

        let reprojected = provider
            .project(&world_position, true)
            .map(|p| (p.x, p.y));
        let (gate, reprojection_error) = match reprojected {
            Some((px, py)) => {
                let error = ReprojectionError {
                    dx: (px - center.0).abs(),
                    dy: (py - center.1).abs(),
                };
                let within = error.dx <= cfg.reprojection_tolerance_x * bbox.width
                    && error.dy <= cfg.reprojection_tolerance_y * bbox.height;
                let relative = (error.dx / bbox.width).max(error.dy / bbox.height);
                let gate = if within {
                    GateVerdict::Passed
                } else {
                    GateVerdict::Failed(error)
                };
                (gate, Some(relative))
            }
            None => (GateVerdict::Skipped, None),
        };
        if gate.is_failed() && cfg.enforce_consistency_gate {
            return Err(LiftRejection::InconsistentReprojection);
        }

        let sampling_ratio = reprojected
            .map(|(_, py)| ((py - bbox.y) / bbox.height).clamp(MIN_SAMPLING_RATIO, MAX_SAMPLING_RATIO))
            .unwrap_or(DEFAULT_SAMPLING_RATIO);

        Ok(Detection3D {
            bbox,
            label: detection.label.clone(),
            confidence: detection.confidence,
            world_position,
            depth_quality,
            depth_std_dev: sample.std_dev,
            valid_ratio: sample.valid_ratio,
            size,
            track_hint: detection.track_hint,
            reprojected,
            reprojection_error,
            gate,
            sampling_ratio,
        })
    }
}
