//! Integration module connecting detectors and depth sensors with the 3D tracker.
//!
//! This module provides the traits the tracker calls through (detection source,
//! depth/camera provider), reference implementations of the latter, and the
//! per-frame pipeline that ties them together.

mod builder;
mod camera;
mod depth_map;
mod detector;
mod pipeline;
mod provider;

pub use builder::DetectionBuilder;
pub use camera::PinholeCamera;
pub use depth_map::DepthMapProvider;
pub use detector::{DetectionSource, NoDetector};
pub use pipeline::{FrameOutput, FrameStats, TrackerPipeline};
pub use provider::{CameraModel, DepthProvider, ProjectedPoint, SampleGrid};
