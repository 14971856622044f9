// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// Axis-aligned bounding box in 2D.
///
/// A box is *degenerate* when it has no area (`max_x <= min_x || max_y <= min_y`). Every
/// structure in this crate drops degenerate boxes on insertion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb2D<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (top)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (bottom)
    pub max_y: T,
}

impl<T> Aabb2D<T> {
    /// Create a new AABB from min/max corners.
    #[inline(always)]
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb2D<T> {
    /// Whether this AABB contains the point. Edges are inclusive.
    #[inline]
    pub fn contains_point(&self, x: T, y: T) -> bool {
        self.min_x <= x && self.min_y <= y && x <= self.max_x && y <= self.max_y
    }

    /// The intersection of two AABBs. The result may be empty.
    #[inline]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min_x: max_t(self.min_x, other.min_x),
            min_y: max_t(self.min_y, other.min_y),
            max_x: min_t(self.max_x, other.max_x),
            max_y: min_t(self.max_y, other.max_y),
        }
    }

    /// Determines whether this AABB overlaps with another in any way.
    ///
    /// Note that the edge of the AABB is considered to be part of itself, meaning
    /// that two AABBs that share an edge are considered to overlap.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyan_index::Aabb2D;
    ///
    /// let a = Aabb2D::new(0.0, 0.0, 10.0, 10.0);
    /// assert!(a.overlaps(&Aabb2D::new(10.0, 0.0, 20.0, 10.0)));
    /// assert!(!a.overlaps(&Aabb2D::new(11.0, 0.0, 20.0, 10.0)));
    /// ```
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// The smallest AABB enclosing two AABBs.
    #[inline]
    pub fn union(&self, other: Self) -> Self {
        Self {
            min_x: min_t(self.min_x, other.min_x),
            min_y: min_t(self.min_y, other.min_y),
            max_x: max_t(self.max_x, other.max_x),
            max_y: max_t(self.max_y, other.max_y),
        }
    }

    /// Return true if the AABB is degenerate (no area or inverted). Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }
}

impl<T: Scalar> Aabb2D<T> {
    /// Create an AABB from origin and size.
    #[inline]
    pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: T::add(x, w),
            max_y: T::add(y, h),
        }
    }

    /// Compute the area of an AABB using the scalar's widened accumulator type.
    ///
    /// Degenerate boxes have zero area.
    #[inline]
    pub fn area(&self) -> T::Acc {
        let w = T::max(T::sub(self.max_x, self.min_x), T::zero());
        let h = T::max(T::sub(self.max_y, self.min_y), T::zero());
        T::widen(w) * T::widen(h)
    }

    /// Horizontal center, used to order entries in bulk builders.
    #[inline]
    pub fn center_x(&self) -> T {
        T::mid(self.min_x, self.max_x)
    }

    /// Vertical center, used to order entries in bulk builders.
    #[inline]
    pub fn center_y(&self) -> T {
        T::mid(self.min_y, self.max_y)
    }

    /// Per-axis gap between two boxes: `max(0, max(a_min, b_min) - min(a_max, b_max))`.
    ///
    /// Overlapping or touching boxes have a gap of zero on that axis.
    #[inline]
    pub fn gap(&self, other: &Self) -> (T, T) {
        let gx = T::sub(
            T::max(self.min_x, other.min_x),
            T::min(self.max_x, other.max_x),
        );
        let gy = T::sub(
            T::max(self.min_y, other.min_y),
            T::min(self.max_y, other.max_y),
        );
        (T::max(gx, T::zero()), T::max(gy, T::zero()))
    }

    /// Whether the gap to `other` is at most `threshold` on both axes.
    #[inline]
    pub fn within_gap(&self, other: &Self, threshold: T) -> bool {
        let (gx, gy) = self.gap(other);
        gx <= threshold && gy <= threshold
    }

    /// Grow the box by `amount` on every side.
    #[inline]
    pub fn inflate(&self, amount: T) -> Self {
        Self {
            min_x: T::sub(self.min_x, amount),
            min_y: T::sub(self.min_y, amount),
            max_x: T::add(self.max_x, amount),
            max_y: T::add(self.max_y, amount),
        }
    }
}

/// Numeric scalar abstraction for 2D AABBs.
///
/// This trait provides the minimal set of operations required for area metrics,
/// centroid ordering and gap computations, with an associated widened accumulator
/// type for area (`f64`→`f64`, `i64`→`i128`).
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type suitable for area computations.
    type Acc: Copy
        + PartialOrd
        + core::ops::Add<Output = Self::Acc>
        + core::ops::Sub<Output = Self::Acc>
        + core::ops::Mul<Output = Self::Acc>
        + Debug;

    /// Add two scalar values.
    fn add(a: Self, b: Self) -> Self;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Max of the two scalar values.
    fn max(a: Self, b: Self) -> Self;

    /// Min of the two scalar values.
    fn min(a: Self, b: Self) -> Self;

    /// Midpoint between a and b (used for centroid ordering and quadrant splits).
    fn mid(a: Self, b: Self) -> Self;

    /// Convert a scalar to the accumulator type.
    fn widen(v: Self) -> Self::Acc;
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max(a: Self, b: Self) -> Self {
        Self::max(a, b)
    }

    #[inline]
    fn min(a: Self, b: Self) -> Self {
        Self::min(a, b)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline(always)]
    fn widen(v: Self) -> Self::Acc {
        v
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a.saturating_add(b)
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a.saturating_sub(b)
    }

    #[inline(always)]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn max(a: Self, b: Self) -> Self {
        core::cmp::max(a, b)
    }

    #[inline]
    fn min(a: Self, b: Self) -> Self {
        core::cmp::min(a, b)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Average without overflow: (a & b) + ((a ^ b) >> 1)
        (a & b) + ((a ^ b) >> 1)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v as i128
    }
}

/// Helper alias for the widened accumulator type `Scalar::Acc` associated with a `T: Scalar`.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

/// Order two scalars, treating incomparable values as equal.
#[inline]
pub(crate) fn cmp_t<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2D;

    #[test]
    fn aabb_area_and_empty() {
        const EPSILON: f64 = 1e-10;

        let mut aabb = Aabb2D::<f64>::new(5., 7., 10., 9.);
        assert!((aabb.area() - 5. * 2.).abs() < EPSILON);
        assert!(!aabb.is_empty());

        // "negative" AABBs are considered empty (and get zero area)
        aabb.max_x = -aabb.max_x;
        assert!(aabb.area() < EPSILON);
        assert!(aabb.is_empty());

        // zero-area AABBs are considered empty
        aabb.max_x = aabb.min_x;
        assert!(aabb.area() < EPSILON);
        assert!(aabb.is_empty());
    }

    #[test]
    fn gap_is_zero_for_overlap_and_positive_for_separation() {
        let a = Aabb2D::new(0, 0, 10, 10);
        assert_eq!(a.gap(&Aabb2D::new(5, 5, 15, 15)), (0, 0));
        assert_eq!(a.gap(&Aabb2D::new(12, 0, 22, 10)), (2, 0));
        assert_eq!(a.gap(&Aabb2D::new(-30, 40, -20, 50)), (20, 30));

        assert!(a.within_gap(&Aabb2D::new(12, 0, 22, 10), 64));
        assert!(!a.within_gap(&Aabb2D::new(1010, 0, 1020, 10), 64));
        // Exactly at the threshold still counts.
        assert!(a.within_gap(&Aabb2D::new(74, 0, 80, 10), 64));
    }

    #[test]
    fn inflated_overlap_matches_gap_predicate() {
        let a = Aabb2D::new(0, 0, 10, 10);
        for (x, y) in [(74, 0), (75, 0), (0, 74), (0, 75), (-70, -70), (-74, -74)] {
            let b = Aabb2D::from_xywh(x, y, 5, 5);
            assert_eq!(
                a.inflate(64).overlaps(&b),
                a.within_gap(&b, 64),
                "mismatch at ({x}, {y})"
            );
        }
    }
}
