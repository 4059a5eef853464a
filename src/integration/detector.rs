//! Trait for 2D object detection backends.

use std::convert::Infallible;

use crate::tracker::Detection2D;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the tracking pipeline.
///
/// # Example
///
/// ```ignore
/// use depthtrack_rs::{DetectionSource, Detection2D};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, input: &[u8], width: u32, height: u32, timestamp: f64) -> Result<Vec<Detection2D>, Self::Error> {
///         // Run inference and return normalized detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on raw image data and return detections with normalized boxes.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes (format depends on implementation)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `timestamp` - Capture time of the frame, in seconds
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        timestamp: f64,
    ) -> Result<Vec<Detection2D>, Self::Error>;
}

/// Placeholder detector for pipelines fed with detections directly.
#[derive(Debug, Clone, Copy)]
pub enum NoDetector {}

impl DetectionSource for NoDetector {
    type Error = Infallible;

    fn detect(&mut self, _: &[u8], _: u32, _: u32, _: f64) -> Result<Vec<Detection2D>, Self::Error> {
        match *self {}
    }
}
