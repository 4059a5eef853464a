use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid config: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl TrackerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Why a 2D detection was not lifted to a 3D observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LiftRejection {
    #[error("confidence below minimum")]
    LowConfidence,
    #[error("box touches the screen edge")]
    AtScreenEdge,
    #[error("depth sampling region is degenerate")]
    DegenerateRegion,
    #[error("no depth available for region")]
    NoDepth,
    #[error("depth quality below minimum")]
    LowDepthQuality,
    #[error("valid depth ratio below minimum")]
    LowValidRatio,
    #[error("unprojected world position is not finite")]
    NonFiniteWorldPosition,
    #[error("no physical size estimate")]
    NoSizeEstimate,
    #[error("estimated height below minimum")]
    TooSmall,
    #[error("reprojection inconsistent with box center")]
    InconsistentReprojection,
}
