//! Persistent tracked object with smoothed 3D state.

use std::fmt;

use nalgebra::Point3;

use crate::integration::CameraModel;
use crate::tracker::detection::Detection3D;
use crate::tracker::rect::Rect;
use crate::tracker::size::{EstimatedSize, ema};
use crate::tracker::track_state::{LifecycleThresholds, TrackEvent, TrackState};

/// Stable identity of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// EMA factors applied on every observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub position: f32,
    pub size: f32,
    pub confidence: f32,
}

/// A state change produced by a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TrackState,
    pub to: TrackState,
}

/// Single tracked object.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    id: ObjectId,
    label: String,
    /// Current lifecycle state
    pub state: TrackState,
    /// Smoothed world position
    pub position: Point3<f32>,
    /// Smoothed physical size
    pub size: EstimatedSize,
    /// Smoothed detection confidence
    pub confidence: f32,
    /// Smoothed vertical position of the depth sample within the silhouette
    pub sampling_ratio: f32,
    /// Total number of observations since spawn
    pub observation_count: u32,
    pub consecutive_observed: u32,
    pub consecutive_missed: u32,
    /// Timestamp of the last observation, in seconds
    pub last_observed: f64,
    pub thresholds: LifecycleThresholds,
}

impl TrackedObject {
    /// Spawn a new candidate seeded from an observation.
    ///
    /// The seeding observation counts toward confirmation, so a one-frame
    /// threshold confirms immediately.
    pub fn new(
        id: ObjectId,
        observation: &Detection3D,
        thresholds: LifecycleThresholds,
        timestamp: f64,
    ) -> Self {
        let mut object = Self {
            id,
            label: observation.label.clone(),
            state: TrackState::Candidate,
            position: observation.world_position,
            size: observation.size,
            confidence: observation.confidence,
            sampling_ratio: observation.sampling_ratio,
            observation_count: 1,
            consecutive_observed: 1,
            consecutive_missed: 0,
            last_observed: timestamp,
            thresholds,
        };
        object.apply(TrackEvent::Observed {
            consecutive: object.consecutive_observed,
        });
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Blend in a matched or recaptured observation and advance the lifecycle.
    pub fn observe(
        &mut self,
        observation: &Detection3D,
        smoothing: &Smoothing,
        timestamp: f64,
    ) -> Option<Transition> {
        let a = smoothing.position;
        self.position = Point3::from(
            self.position.coords * (1.0 - a) + observation.world_position.coords * a,
        );
        self.sampling_ratio = ema(self.sampling_ratio, observation.sampling_ratio, a);
        self.size = self.size.blend(&observation.size, smoothing.size);
        self.confidence = ema(self.confidence, observation.confidence, smoothing.confidence);

        self.observation_count += 1;
        self.consecutive_observed += 1;
        self.consecutive_missed = 0;
        self.last_observed = timestamp;

        self.apply(TrackEvent::Observed {
            consecutive: self.consecutive_observed,
        })
    }

    /// Record a frame without any observation.
    pub fn miss(&mut self) -> Option<Transition> {
        if self.state.is_terminal() {
            return None;
        }
        self.consecutive_observed = 0;
        self.consecutive_missed += 1;
        self.apply(TrackEvent::Missed {
            consecutive: self.consecutive_missed,
        })
    }

    fn apply(&mut self, event: TrackEvent) -> Option<Transition> {
        let from = self.state;
        let to = from.next(event, &self.thresholds);
        self.state = to;
        (from != to).then_some(Transition { from, to })
    }

    /// Screen rectangle of the object, or `None` when it is behind the camera or
    /// entirely outside the frame grown by `bounds`.
    pub fn projected_rect<C: CameraModel + ?Sized>(&self, camera: &C, bounds: f32) -> Option<Rect> {
        let projected = camera.project(&self.position, true)?;
        let (width, height) = camera.normalized_extent(&self.size, projected.depth)?;
        let rect = Rect::new(
            projected.x - width / 2.0,
            projected.y - self.sampling_ratio * height,
            width,
            height,
        );
        if rect.is_degenerate() || !rect.x.is_finite() || !rect.y.is_finite() {
            return None;
        }
        rect.overlaps_frame(bounds).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::PinholeCamera;
    use crate::tracker::detection::GateVerdict;
    use approx::assert_relative_eq;

    const THRESHOLDS: LifecycleThresholds = LifecycleThresholds {
        confirmation_frames: 2,
        stale_frames: 2,
        lost_frames: 4,
    };

    const SMOOTHING: Smoothing = Smoothing {
        position: 0.5,
        size: 0.5,
        confidence: 0.5,
    };

    fn observation(x: f32, confidence: f32) -> Detection3D {
        Detection3D {
            bbox: Rect::new(0.4, 0.4, 0.2, 0.2),
            label: "box".into(),
            confidence,
            world_position: Point3::new(x, 0.0, 2.0),
            depth_quality: 1.0,
            depth_std_dev: 0.0,
            valid_ratio: 1.0,
            size: EstimatedSize::new(0.4, 0.4),
            track_hint: None,
            reprojected: Some((0.5, 0.5)),
            reprojection_error: Some(0.0),
            gate: GateVerdict::Passed,
            sampling_ratio: 0.5,
        }
    }

    #[test]
    fn test_observe_smooths_and_confirms() {
        let mut obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        let transition = obj.observe(&observation(1.0, 1.0), &SMOOTHING, 0.1);

        assert_relative_eq!(obj.position.x, 0.5);
        assert_relative_eq!(obj.confidence, 0.8);
        assert_eq!(obj.observation_count, 2);
        assert_eq!(obj.last_observed, 0.1);
        assert_eq!(
            transition,
            Some(Transition {
                from: TrackState::Candidate,
                to: TrackState::Confirmed
            })
        );
    }

    #[test]
    fn test_single_frame_threshold_confirms_on_spawn() {
        let thresholds = LifecycleThresholds {
            confirmation_frames: 1,
            ..THRESHOLDS
        };
        let obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), thresholds, 0.0);
        assert_eq!(obj.state, TrackState::Confirmed);
        assert_eq!(obj.consecutive_observed, 1);

        let obj = TrackedObject::new(ObjectId(2), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        assert_eq!(obj.state, TrackState::Candidate);
    }

    #[test]
    fn test_counters_are_exclusive() {
        let mut obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        obj.miss();
        assert_eq!(obj.consecutive_observed, 0);
        assert_eq!(obj.consecutive_missed, 1);
        obj.observe(&observation(0.0, 0.6), &SMOOTHING, 0.2);
        assert_eq!(obj.consecutive_observed, 1);
        assert_eq!(obj.consecutive_missed, 0);
    }

    #[test]
    fn test_lost_ignores_misses() {
        let mut obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        obj.miss();
        assert!(obj.miss().is_some());
        assert_eq!(obj.state, TrackState::Lost);
        assert_eq!(obj.miss(), None);
        assert_eq!(obj.consecutive_missed, 2);
    }

    #[test]
    fn test_projected_rect_round_trips_box() {
        let camera = PinholeCamera::default();
        let obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        // 0.4 m at 2 m with unit focal length spans 0.2 of the frame
        let rect = obj.projected_rect(&camera, 0.1).unwrap();
        assert_relative_eq!(rect.x, 0.4, epsilon = 1e-5);
        assert_relative_eq!(rect.y, 0.4, epsilon = 1e-5);
        assert_relative_eq!(rect.width, 0.2, epsilon = 1e-5);
        assert_relative_eq!(rect.height, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_projected_rect_out_of_bounds() {
        let camera = PinholeCamera::default();
        let mut obj = TrackedObject::new(ObjectId(1), &observation(0.0, 0.6), THRESHOLDS, 0.0);
        // Center at u = 0.5 + 2.0 / 2.0 = 1.5, rect spans [1.4, 1.6]
        obj.position = Point3::new(2.0, 0.0, 2.0);
        assert!(obj.projected_rect(&camera, 0.1).is_none());
        assert!(obj.projected_rect(&camera, 0.5).is_some());
        // Behind the camera
        obj.position = Point3::new(0.0, 0.0, -2.0);
        assert!(obj.projected_rect(&camera, 0.5).is_none());
    }
}
