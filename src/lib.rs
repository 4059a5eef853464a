//! Depth-lifted 3D multi-object tracking.
//!
//! Per frame, 2D detections are lifted to 3D observations with a depth provider,
//! associated against existing objects by back-projecting them into the image,
//! and fed through a candidate / confirmed / stale / lost lifecycle.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{LiftRejection, TrackerError};
pub use integration::{
    CameraModel, DepthMapProvider, DepthProvider, DetectionBuilder, DetectionSource,
    FrameOutput, FrameStats, NoDetector, PinholeCamera, ProjectedPoint, TrackerPipeline,
};
pub use tracker::{
    DepthLifter, DepthSample, Detection2D, Detection3D, EstimatedSize, GateVerdict,
    LiftReport, MatchResult, ObjectId, ObjectManager, Rect, TrackState, TrackedObject,
    TrackerConfig,
};
