mod config;
mod detection;
mod lifter;
mod matching;
mod object_manager;
mod rect;
mod size;
mod track_state;
mod tracked_object;

pub use config::{CONFIRMED_BOUNDS, TrackerConfig};
pub use detection::{DepthSample, Detection2D, Detection3D, GateVerdict, ReprojectionError};
pub use lifter::{DepthLifter, LiftReport};
pub use matching::{BackProjectionMatcher, MatchResult, Projection};
pub use object_manager::{FrameUpdate, ObjectManager};
pub use rect::{Rect, iou_batch};
pub use size::EstimatedSize;
pub use track_state::{LifecycleThresholds, TrackEvent, TrackState};
pub use tracked_object::{ObjectId, Smoothing, TrackedObject, Transition};
