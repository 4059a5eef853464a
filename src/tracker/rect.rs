/// Axis-aligned rectangle in normalized image coordinates.
///
/// Origin is the top-left corner of the frame, both axes span 0..1 over the
/// visible image. Boxes are stored as TLWH: top-left x, top-left y, width, height.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from its center and dimensions.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center point of the rectangle.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the rectangle.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when width or height is not a positive finite number.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
    }

    /// Calculate Intersection over Union (IoU) with another rectangle.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Euclidean distance between the two rectangle centers.
    pub fn center_distance(&self, other: &Rect) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// True if any edge lies within `margin` of the [0, 1] frame boundary.
    pub fn is_at_screen_edge(&self, margin: f32) -> bool {
        self.x <= margin
            || self.y <= margin
            || self.right() >= 1.0 - margin
            || self.bottom() >= 1.0 - margin
    }

    /// True if the rectangle overlaps the frame grown by `tolerance` on every side.
    pub fn overlaps_frame(&self, tolerance: f32) -> bool {
        self.right() >= -tolerance
            && self.x <= 1.0 + tolerance
            && self.bottom() >= -tolerance
            && self.y <= 1.0 + tolerance
    }

    /// Sub-region trimmed by `inset` of the width on both sides and restricted
    /// vertically to the `[band_top, band_bottom]` fraction of the height.
    pub fn sampling_region(&self, inset: f32, band_top: f32, band_bottom: f32) -> Rect {
        Rect {
            x: self.x + self.width * inset,
            y: self.y + self.height * band_top,
            width: self.width * (1.0 - 2.0 * inset),
            height: self.height * (band_bottom - band_top),
        }
    }
}

use ndarray::Array2;

/// Calculate IoU matrix between two sets of rectangles.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}
