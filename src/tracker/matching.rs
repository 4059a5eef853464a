//! Back-projection matching of tracked objects against 3D observations.

use crate::integration::CameraModel;
use crate::tracker::config::{CONFIRMED_BOUNDS, TrackerConfig};
use crate::tracker::detection::Detection3D;
use crate::tracker::rect::{Rect, iou_batch};
use crate::tracker::track_state::TrackState;
use crate::tracker::tracked_object::{ObjectId, TrackedObject};

/// Weight of center proximity in the stage-2 score; IoU gets the rest.
const DISTANCE_WEIGHT: f32 = 0.8;
const IOU_WEIGHT: f32 = 0.2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// (object, index into the frame's observations)
    pub matches: Vec<(ObjectId, usize)>,
    pub unmatched_detections: Vec<usize>,
    /// Projected objects that received no observation
    pub missed: Vec<ObjectId>,
}

/// A tracked object's screen rectangle for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub id: ObjectId,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
struct Candidate {
    projection: usize,
    detection: usize,
    score: f32,
}

#[derive(Debug, Clone)]
pub struct BackProjectionMatcher {
    high_iou_threshold: f32,
    min_iou_threshold: f32,
    max_center_distance: f32,
    extended_bounds: f32,
}

impl BackProjectionMatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            high_iou_threshold: config.high_iou_threshold,
            min_iou_threshold: config.min_iou_threshold,
            max_center_distance: config.max_center_distance,
            extended_bounds: config.extended_bounds,
        }
    }

    /// Project every non-terminal object, dropping those outside their bounds.
    ///
    /// Confirmed objects get the tight [`CONFIRMED_BOUNDS`] tolerance, everything
    /// else the configured extended bounds.
    pub fn project<'a, C, I>(&self, objects: I, camera: &C) -> Vec<Projection>
    where
        C: CameraModel + ?Sized,
        I: IntoIterator<Item = &'a TrackedObject>,
    {
        objects
            .into_iter()
            .filter(|obj| !obj.state.is_terminal())
            .filter_map(|obj| {
                let bounds = match obj.state {
                    TrackState::Confirmed => CONFIRMED_BOUNDS,
                    _ => self.extended_bounds,
                };
                obj.projected_rect(camera, bounds)
                    .map(|rect| Projection { id: obj.id(), rect })
            })
            .collect()
    }

    /// Associate objects with observations in two greedy stages.
    pub fn match_objects<'a, C, I>(
        &self,
        objects: I,
        detections: &[Detection3D],
        camera: &C,
    ) -> MatchResult
    where
        C: CameraModel + ?Sized,
        I: IntoIterator<Item = &'a TrackedObject>,
    {
        let projections = self.project(objects, camera);
        self.match_projections(&projections, detections)
    }

    pub fn match_projections(&self, projections: &[Projection], detections: &[Detection3D]) -> MatchResult {
        let proj_rects: Vec<Rect> = projections.iter().map(|p| p.rect).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let ious = iou_batch(&proj_rects, &det_rects);

        let mut used_projections = vec![false; projections.len()];
        let mut used_detections = vec![false; detections.len()];
        let mut matches = Vec::new();

        // Stage 1: first projection clearing the high threshold wins
        for j in 0..detections.len() {
            for i in 0..projections.len() {
                if used_projections[i] {
                    continue;
                }
                if ious[[i, j]] >= self.high_iou_threshold {
                    used_projections[i] = true;
                    used_detections[j] = true;
                    matches.push((projections[i].id, j));
                    break;
                }
            }
        }

        // Stage 2: best composite score first
        let mut candidates = Vec::new();
        for (i, proj) in projections.iter().enumerate() {
            if used_projections[i] {
                continue;
            }
            for (j, det) in detections.iter().enumerate() {
                if used_detections[j] {
                    continue;
                }
                let iou = ious[[i, j]];
                if iou < self.min_iou_threshold {
                    continue;
                }
                let distance = proj.rect.center_distance(&det.bbox);
                let proximity = 1.0 - (distance / self.max_center_distance).min(1.0);
                candidates.push(Candidate {
                    projection: i,
                    detection: j,
                    score: DISTANCE_WEIGHT * proximity + IOU_WEIGHT * iou,
                });
            }
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        for candidate in candidates {
            if used_projections[candidate.projection] || used_detections[candidate.detection] {
                continue;
            }
            used_projections[candidate.projection] = true;
            used_detections[candidate.detection] = true;
            matches.push((projections[candidate.projection].id, candidate.detection));
        }

        let unmatched_detections = used_detections
            .iter()
            .enumerate()
            .filter_map(|(j, &used)| if used { None } else { Some(j) })
            .collect();
        let missed = used_projections
            .iter()
            .zip(projections)
            .filter_map(|(&used, p)| if used { None } else { Some(p.id) })
            .collect();

        MatchResult {
            matches,
            unmatched_detections,
            missed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::PinholeCamera;
    use crate::tracker::detection::GateVerdict;
    use crate::tracker::size::EstimatedSize;
    use crate::tracker::track_state::LifecycleThresholds;
    use nalgebra::Point3;

    fn observation(bbox: Rect) -> Detection3D {
        Detection3D {
            bbox,
            label: "box".into(),
            confidence: 0.9,
            world_position: Point3::origin(),
            depth_quality: 1.0,
            depth_std_dev: 0.0,
            valid_ratio: 1.0,
            size: EstimatedSize::new(0.2, 0.2),
            track_hint: None,
            reprojected: None,
            reprojection_error: None,
            gate: GateVerdict::Skipped,
            sampling_ratio: 0.5,
        }
    }

    fn projection(id: u64, rect: Rect) -> Projection {
        Projection { id: ObjectId(id), rect }
    }

    fn matcher() -> BackProjectionMatcher {
        BackProjectionMatcher::new(&TrackerConfig::default())
    }

    #[test]
    fn test_high_iou_matches_in_stage_one() {
        let projections = [projection(1, Rect::new(0.4, 0.4, 0.2, 0.2))];
        // IoU 0.9 and roughly 0.33
        let detections = [
            observation(Rect::new(0.4, 0.4, 0.2, 0.18)),
            observation(Rect::new(0.5, 0.4, 0.2, 0.2)),
        ];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches, vec![(ObjectId(1), 0)]);
        assert_eq!(result.unmatched_detections, vec![1]);
        assert!(result.missed.is_empty());
    }

    #[test]
    fn test_stage_one_is_first_fit() {
        // Both projections clear the high threshold; the first one wins
        // even though the second overlaps more.
        let projections = [
            projection(1, Rect::new(0.4, 0.4, 0.2, 0.17)),
            projection(2, Rect::new(0.4, 0.4, 0.2, 0.2)),
        ];
        let detections = [observation(Rect::new(0.4, 0.4, 0.2, 0.2))];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches, vec![(ObjectId(1), 0)]);
        assert_eq!(result.missed, vec![ObjectId(2)]);
    }

    #[test]
    fn test_stage_two_prefers_closer_centers() {
        let projections = [
            projection(1, Rect::new(0.30, 0.4, 0.2, 0.2)),
            projection(2, Rect::new(0.42, 0.4, 0.2, 0.2)),
        ];
        // Detection center 0.55: distance 0.15 to #1 and 0.03 to #2
        let detections = [observation(Rect::new(0.45, 0.4, 0.2, 0.2))];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches, vec![(ObjectId(2), 0)]);
        assert_eq!(result.missed, vec![ObjectId(1)]);
    }

    #[test]
    fn test_stage_two_respects_min_iou() {
        let projections = [projection(1, Rect::new(0.1, 0.1, 0.1, 0.1))];
        let detections = [observation(Rect::new(0.19, 0.19, 0.1, 0.1))];
        let result = matcher().match_projections(&projections, &detections);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_detections, vec![0]);
        assert_eq!(result.missed, vec![ObjectId(1)]);
    }

    #[test]
    fn test_stage_two_ties_keep_enumeration_order() {
        // Identical projections score exactly the same (IoU 0.6, below stage 1)
        let projections = [
            projection(7, Rect::new(0.4, 0.4, 0.2, 0.2)),
            projection(3, Rect::new(0.4, 0.4, 0.2, 0.2)),
        ];
        let detections = [observation(Rect::new(0.45, 0.4, 0.2, 0.2))];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches, vec![(ObjectId(7), 0)]);
        assert_eq!(result.missed, vec![ObjectId(3)]);

        let projections = [projection(1, Rect::new(0.4, 0.4, 0.2, 0.2))];
        let detections = [
            observation(Rect::new(0.45, 0.4, 0.2, 0.2)),
            observation(Rect::new(0.45, 0.4, 0.2, 0.2)),
        ];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches, vec![(ObjectId(1), 0)]);
        assert_eq!(result.unmatched_detections, vec![1]);
    }

    #[test]
    fn test_each_side_used_once() {
        let projections = [
            projection(1, Rect::new(0.40, 0.4, 0.2, 0.2)),
            projection(2, Rect::new(0.41, 0.4, 0.2, 0.2)),
        ];
        let detections = [
            observation(Rect::new(0.45, 0.4, 0.2, 0.2)),
            observation(Rect::new(0.46, 0.4, 0.2, 0.2)),
        ];
        let result = matcher().match_projections(&projections, &detections);
        assert_eq!(result.matches.len(), 2);
        let mut objects: Vec<_> = result.matches.iter().map(|m| m.0).collect();
        objects.sort();
        assert_eq!(objects, vec![ObjectId(1), ObjectId(2)]);
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        let result = matcher().match_projections(&[], &[observation(Rect::new(0.4, 0.4, 0.1, 0.1))]);
        assert_eq!(result.unmatched_detections, vec![0]);

        let result = matcher().match_projections(&[projection(3, Rect::new(0.4, 0.4, 0.1, 0.1))], &[]);
        assert_eq!(result.missed, vec![ObjectId(3)]);
    }

    #[test]
    fn test_projection_bounds_depend_on_state() {
        let thresholds = LifecycleThresholds {
            confirmation_frames: 2,
            stale_frames: 5,
            lost_frames: 10,
        };
        let mut obs = observation(Rect::new(0.4, 0.4, 0.2, 0.2));
        obs.size = EstimatedSize::new(0.4, 0.4);
        // u = 0.5 + 1.6 / 2 = 1.3, rect spans [1.2, 1.4]
        obs.world_position = Point3::new(1.6, 0.0, 2.0);

        let candidate = TrackedObject::new(ObjectId(1), &obs, thresholds, 0.0);
        let mut confirmed = TrackedObject::new(ObjectId(2), &obs, thresholds, 0.0);
        confirmed.state = TrackState::Confirmed;
        let mut lost = TrackedObject::new(ObjectId(3), &obs, thresholds, 0.0);
        lost.state = TrackState::Lost;

        let camera = PinholeCamera::default();
        let projections = matcher().project([&candidate, &confirmed, &lost], &camera);
        let ids: Vec<_> = projections.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ObjectId(1)]);
    }
}
