// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box constraints handed from parent to child during layout.

use kurbo::Size;

/// Size used for an axis when invalid constraints carry no usable maximum.
pub const FALLBACK_SIZE: Size = Size::new(800.0, 600.0);

/// Minimum and maximum extents a node may take on each axis.
///
/// Maxima may be `f64::INFINITY`. Constraints are valid when `0 <= min <= max` on
/// both axes; see [`Constraints::is_valid`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Constraints {
    /// Smallest allowed width.
    pub min_width: f64,
    /// Largest allowed width (may be infinite).
    pub max_width: f64,
    /// Smallest allowed height.
    pub min_height: f64,
    /// Largest allowed height (may be infinite).
    pub max_height: f64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Constraints {
    /// No lower bound and no upper bound on either axis.
    pub const UNBOUNDED: Self = Self::new(0.0, f64::INFINITY, 0.0, f64::INFINITY);

    /// Create constraints from explicit bounds.
    pub const fn new(min_width: f64, max_width: f64, min_height: f64, max_height: f64) -> Self {
        Self {
            min_width,
            max_width,
            min_height,
            max_height,
        }
    }

    /// Constraints that admit exactly `size`.
    pub const fn tight(size: Size) -> Self {
        Self::new(size.width, size.width, size.height, size.height)
    }

    /// Constraints that admit anything from zero up to `size`.
    pub const fn loose(size: Size) -> Self {
        Self::new(0.0, size.width, 0.0, size.height)
    }

    /// Whether mins are non-negative and do not exceed maxima. NaN is never valid.
    pub fn is_valid(&self) -> bool {
        self.min_width >= 0.0
            && self.min_height >= 0.0
            && self.min_width.is_finite()
            && self.min_height.is_finite()
            && self.min_width <= self.max_width
            && self.min_height <= self.max_height
    }

    /// Whether both axes admit exactly one extent.
    pub fn is_tight(&self) -> bool {
        self.min_width == self.max_width && self.min_height == self.max_height
    }

    /// Whether the maximum width is finite.
    pub fn has_bounded_width(&self) -> bool {
        self.max_width.is_finite()
    }

    /// Whether the maximum height is finite.
    pub fn has_bounded_height(&self) -> bool {
        self.max_height.is_finite()
    }

    /// The loose constraints used in place of invalid ones.
    ///
    /// Each axis keeps its requested maximum when that is a usable number and
    /// otherwise falls back to [`FALLBACK_SIZE`].
    pub fn fallback(&self) -> Self {
        let pick = |max: f64, default: f64| {
            if max.is_finite() && max >= 0.0 {
                max
            } else {
                default
            }
        };
        Self::loose(Size::new(
            pick(self.max_width, FALLBACK_SIZE.width),
            pick(self.max_height, FALLBACK_SIZE.height),
        ))
    }

    /// Clamp a natural size into these constraints.
    ///
    /// A finite maximum clamps into `[min, max]`; an unbounded one only lifts the
    /// natural extent up to the minimum. When `min > max` the minimum wins.
    pub fn constrain(&self, natural: Size) -> Size {
        let axis = |value: f64, min: f64, max: f64| {
            let value = if value.is_nan() { min } else { value };
            if max.is_finite() {
                value.min(max).max(min)
            } else {
                value.max(min)
            }
        };
        Size::new(
            axis(natural.width, self.min_width, self.max_width),
            axis(natural.height, self.min_height, self.max_height),
        )
    }

    /// Shrink both axes by the given amounts, keeping minima non-negative.
    pub fn deflate(&self, dw: f64, dh: f64) -> Self {
        let max_width = (self.max_width - dw).max(0.0);
        let max_height = (self.max_height - dh).max(0.0);
        Self {
            min_width: (self.min_width - dw).clamp(0.0, max_width),
            max_width,
            min_height: (self.min_height - dh).clamp(0.0, max_height),
            max_height,
        }
    }

    /// The same maxima with minima dropped to zero.
    pub fn loosen(&self) -> Self {
        Self::new(0.0, self.max_width, 0.0, self.max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity() {
        assert!(Constraints::UNBOUNDED.is_valid());
        assert!(Constraints::tight(Size::new(10.0, 20.0)).is_valid());
        assert!(!Constraints::new(50.0, 10.0, 0.0, 10.0).is_valid());
        assert!(!Constraints::new(-1.0, 10.0, 0.0, 10.0).is_valid());
        assert!(!Constraints::new(f64::NAN, 10.0, 0.0, 10.0).is_valid());
        assert!(!Constraints::new(f64::INFINITY, f64::INFINITY, 0.0, 10.0).is_valid());
    }

    #[test]
    fn tightness() {
        assert!(Constraints::tight(Size::new(3.0, 4.0)).is_tight());
        assert!(!Constraints::loose(Size::new(3.0, 4.0)).is_tight());
        assert!(!Constraints::new(3.0, 3.0, 0.0, 4.0).is_tight());
    }

    #[test]
    fn fallback_keeps_usable_maxima() {
        let bad = Constraints::new(500.0, 300.0, 10.0, 5.0);
        assert_eq!(bad.fallback(), Constraints::loose(Size::new(300.0, 5.0)));

        let unbounded = Constraints::new(5.0, f64::INFINITY, 9.0, -3.0);
        assert_eq!(unbounded.fallback(), Constraints::loose(FALLBACK_SIZE));
    }

    #[test]
    fn constrain_clamps_finite_and_lifts_unbounded() {
        let c = Constraints::new(10.0, 100.0, 20.0, f64::INFINITY);
        assert_eq!(c.constrain(Size::new(5.0, 5.0)), Size::new(10.0, 20.0));
        assert_eq!(
            c.constrain(Size::new(500.0, 500.0)),
            Size::new(100.0, 500.0)
        );
        assert_eq!(c.constrain(Size::new(50.0, 50.0)), Size::new(50.0, 50.0));
    }

    #[test]
    fn constrained_size_always_within_bounds() {
        let sizes = [0.0, 1.0, 9.5, 10.0, 55.0, 100.0, 1e9, f64::INFINITY];
        let bounds = [
            (0.0, 0.0),
            (0.0, 10.0),
            (5.0, 50.0),
            (10.0, 10.0),
            (3.0, 1e6),
        ];
        for &(min_w, max_w) in &bounds {
            for &(min_h, max_h) in &bounds {
                let c = Constraints::new(min_w, max_w, min_h, max_h);
                for &w in &sizes {
                    for &h in &sizes {
                        let s = c.constrain(Size::new(w, h));
                        assert!(
                            min_w <= s.width && s.width <= max_w,
                            "width {} outside [{min_w}, {max_w}]",
                            s.width
                        );
                        assert!(
                            min_h <= s.height && s.height <= max_h,
                            "height {} outside [{min_h}, {max_h}]",
                            s.height
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn deflate_keeps_valid() {
        let c = Constraints::new(10.0, 40.0, 0.0, f64::INFINITY).deflate(30.0, 8.0);
        assert!(c.is_valid());
        assert_eq!(c.max_width, 10.0);
        assert_eq!(c.min_width, 0.0);
        assert_eq!(c.max_height, f64::INFINITY);

        let tiny = Constraints::tight(Size::new(4.0, 4.0)).deflate(10.0, 10.0);
        assert_eq!(tiny, Constraints::tight(Size::ZERO));
    }
}
