/// Physical extent of an object in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimatedSize {
    pub width: f32,
    pub height: f32,
}

impl EstimatedSize {
    #[inline]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Exponential blend toward `observed`: `self * (1 - alpha) + observed * alpha`.
    pub fn blend(&self, observed: &EstimatedSize, alpha: f32) -> EstimatedSize {
        EstimatedSize {
            width: ema(self.width, observed.width, alpha),
            height: ema(self.height, observed.height, alpha),
        }
    }
}

#[inline]
pub(crate) fn ema(old: f32, observed: f32, alpha: f32) -> f32 {
    old * (1.0 - alpha) + observed * alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_area() {
        assert_relative_eq!(EstimatedSize::new(0.5, 2.0).area(), 1.0);
    }

    #[test]
    fn test_blend_midpoint() {
        let blended = EstimatedSize::new(1.0, 2.0).blend(&EstimatedSize::new(3.0, 4.0), 0.5);
        assert_relative_eq!(blended.width, 2.0);
        assert_relative_eq!(blended.height, 3.0);
    }

    proptest! {
        #[test]
        fn blend_end_points(
            w1 in 0.0f32..5.0, h1 in 0.0f32..5.0,
            w2 in 0.0f32..5.0, h2 in 0.0f32..5.0,
        ) {
            let s1 = EstimatedSize::new(w1, h1);
            let s2 = EstimatedSize::new(w2, h2);
            prop_assert_eq!(s1.blend(&s2, 0.0), s1);
            prop_assert_eq!(s1.blend(&s2, 1.0), s2);
        }
    }
}
