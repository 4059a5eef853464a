//! Builder for creating Detection2D objects from various input formats.

use crate::tracker::Detection2D;

/// Builder for creating `Detection2D` objects from various input formats.
///
/// Coordinates are expected in normalized image units; use [`DetectionBuilder::pixels`]
/// to convert from pixel coordinates.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
    label: String,
    track_hint: Option<i64>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    /// Divide the current box by the image size, turning pixels into normalized units.
    pub fn pixels(mut self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        self.x1 /= w;
        self.x2 /= w;
        self.y1 /= h;
        self.y2 /= h;
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn track_hint(mut self, hint: i64) -> Self {
        self.track_hint = Some(hint);
        self
    }

    /// Build the final `Detection2D`.
    pub fn build(self) -> Detection2D {
        let mut detection = Detection2D::new(self.x1, self.y1, self.x2, self.y2, self.label, self.confidence);
        detection.track_hint = self.track_hint;
        detection
    }
}
