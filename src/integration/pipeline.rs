//! TrackerPipeline for combining detection, depth lifting and 3D tracking.

use std::collections::HashMap;

use tracing::{debug, debug_span};

use super::detector::{DetectionSource, NoDetector};
use super::provider::DepthProvider;
use crate::error::{LiftRejection, TrackerError};
use crate::tracker::{
    BackProjectionMatcher, DepthLifter, Detection2D, ObjectManager, TrackedObject, TrackerConfig,
};

/// Per-frame counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub detections: usize,
    pub lifted: usize,
    pub rejected: HashMap<LiftRejection, usize>,
    pub matched: usize,
    pub recaptured: usize,
    pub spawned: usize,
    pub suppressed: usize,
    pub missed: usize,
    pub purged: usize,
}

/// What the pipeline publishes after each frame.
#[derive(Debug, Clone)]
pub struct FrameOutput<S> {
    pub frame_id: u64,
    pub timestamp: f64,
    /// Non-terminal objects after the frame, in creation order
    pub objects: Vec<TrackedObject>,
    /// Camera state the frame was matched against
    pub camera: S,
    pub stats: FrameStats,
}

/// End-to-end tracker: detector (optional) + depth provider + 3D tracking.
///
/// Each frame runs strictly in order: refresh depth, lift detections, snapshot
/// the camera, back-project and match, apply matches, recapture, spawn
/// candidates, advance missed objects, purge lost ones, publish.
pub struct TrackerPipeline<P: DepthProvider, D: DetectionSource = NoDetector> {
    detector: Option<D>,
    provider: P,
    lifter: DepthLifter,
    matcher: BackProjectionMatcher,
    objects: ObjectManager,
    frame_id: u64,
    latest: Option<FrameOutput<P::Snapshot>>,
}

impl<P: DepthProvider> TrackerPipeline<P, NoDetector> {
    /// Create a pipeline fed with detections through [`Self::process_detections`].
    pub fn new(provider: P, config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::build(None, provider, config)
    }
}

impl<P: DepthProvider, D: DetectionSource> TrackerPipeline<P, D> {
    /// Create a pipeline that runs `detector` on every frame.
    pub fn with_detector(detector: D, provider: P, config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::build(Some(detector), provider, config)
    }

    fn build(detector: Option<D>, provider: P, config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            detector,
            provider,
            matcher: BackProjectionMatcher::new(&config),
            objects: ObjectManager::new(&config),
            lifter: DepthLifter::new(config),
            frame_id: 0,
            latest: None,
        })
    }

    /// Run the detector on an image and track its detections.
    ///
    /// Returns `Ok(None)` without touching any state when no detector is configured.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        timestamp: f64,
    ) -> Result<Option<&FrameOutput<P::Snapshot>>, D::Error> {
        let Some(detector) = self.detector.as_mut() else {
            return Ok(None);
        };
        let detections = detector.detect(input, width, height, timestamp)?;
        Ok(Some(self.process_detections(&detections, timestamp)))
    }

    /// Track a frame's detections supplied by the caller.
    pub fn process_detections(&mut self, detections: &[Detection2D], timestamp: f64) -> &FrameOutput<P::Snapshot> {
        self.frame_id += 1;
        let _span = debug_span!("frame", frame_id = self.frame_id).entered();

        self.provider.refresh(timestamp);
        let lifted = self.lifter.lift(detections, &self.provider);
        let camera = self.provider.snapshot();

        let result = self.matcher.match_objects(self.objects.iter(), &lifted.accepted, &camera);
        let update = self.objects.update(&lifted.accepted, &result, timestamp);

        let stats = FrameStats {
            detections: detections.len(),
            lifted: lifted.accepted.len(),
            rejected: lifted.rejected,
            matched: update.matched,
            recaptured: update.recaptured,
            spawned: update.spawned,
            suppressed: update.suppressed,
            missed: update.missed,
            purged: update.purged,
        };
        debug!(
            detections = stats.detections,
            lifted = stats.lifted,
            matched = stats.matched,
            recaptured = stats.recaptured,
            spawned = stats.spawned,
            purged = stats.purged,
            live = self.objects.len(),
            "frame processed"
        );

        self.latest.insert(FrameOutput {
            frame_id: self.frame_id,
            timestamp,
            objects: self.objects.iter().cloned().collect(),
            camera,
            stats,
        })
    }

    /// Output of the most recent frame.
    pub fn latest(&self) -> Option<&FrameOutput<P::Snapshot>> {
        self.latest.as_ref()
    }

    /// Live objects.
    pub fn objects(&self) -> impl Iterator<Item = &TrackedObject> + '_ {
        self.objects.iter()
    }

    /// Get a reference to the object manager.
    pub fn object_manager(&self) -> &ObjectManager {
        &self.objects
    }

    /// Get a mutable reference to the object manager, e.g. for forced removal.
    pub fn object_manager_mut(&mut self) -> &mut ObjectManager {
        &mut self.objects
    }

    /// Get a reference to the depth provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a mutable reference to the depth provider.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> Option<&D> {
        self.detector.as_ref()
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> Option<&mut D> {
        self.detector.as_mut()
    }
}
