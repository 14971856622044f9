// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transient region quadtree over a fixed set of rectangles.
//!
//! The tree is built once from a slice of boxes and answers proximity queries
//! ("which boxes lie within `gap` of this one?") by pruning quadrants. It never
//! changes after construction; callers build a fresh one for each batch.
//!
//! Internal nodes hold exactly four children and no rectangles; leaves hold the
//! indices of the rectangles that overlap them. A rectangle that straddles a
//! split line is stored in every quadrant it touches.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::types::{Aabb2D, Scalar};

/// Default number of rectangles a leaf holds before it splits.
pub const DEFAULT_LEAF_CAPACITY: usize = 8;

/// Default depth limit. Beyond it leaves grow past capacity instead of splitting,
/// which bounds recursion on heavily overlapping input. Leaves whose rectangles
/// all cover the leaf's center also stay unsplit.
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Clone, Debug)]
enum QuadContent<T> {
    Leaf(SmallVec<[usize; DEFAULT_LEAF_CAPACITY]>),
    Split(Box<[QuadNode<T>; 4]>),
}

#[derive(Clone, Debug)]
struct QuadNode<T> {
    bounds: Aabb2D<T>,
    content: QuadContent<T>,
}

impl<T: Scalar> QuadNode<T> {
    fn leaf(bounds: Aabb2D<T>) -> Self {
        Self {
            bounds,
            content: QuadContent::Leaf(SmallVec::new()),
        }
    }

    fn insert(
        &mut self,
        idx: usize,
        rects: &[Aabb2D<T>],
        depth: usize,
        capacity: usize,
        max_depth: usize,
    ) {
        match &mut self.content {
            QuadContent::Split(children) => {
                for child in children.iter_mut() {
                    if child.bounds.overlaps(&rects[idx]) {
                        child.insert(idx, rects, depth + 1, capacity, max_depth);
                    }
                }
            }
            QuadContent::Leaf(items) => {
                items.push(idx);
                if items.len() > capacity
                    && depth < max_depth
                    && !all_straddle(items, rects, &self.bounds)
                {
                    let items = core::mem::take(items);
                    self.split();
                    for i in items {
                        self.insert(i, rects, depth, capacity, max_depth);
                    }
                }
            }
        }
    }

    fn split(&mut self) {
        let b = self.bounds;
        let mx = b.center_x();
        let my = b.center_y();
        self.content = QuadContent::Split(Box::new([
            Self::leaf(Aabb2D::new(b.min_x, b.min_y, mx, my)),
            Self::leaf(Aabb2D::new(mx, b.min_y, b.max_x, my)),
            Self::leaf(Aabb2D::new(b.min_x, my, mx, b.max_y)),
            Self::leaf(Aabb2D::new(mx, my, b.max_x, b.max_y)),
        ]));
    }
}

/// Whether every rectangle in `items` covers the center of `bounds`.
///
/// Such rectangles overlap all four quadrants, so splitting would copy each of
/// them into every child without separating anything.
fn all_straddle<T: Scalar>(items: &[usize], rects: &[Aabb2D<T>], bounds: &Aabb2D<T>) -> bool {
    let (mx, my) = (bounds.center_x(), bounds.center_y());
    items.iter().all(|&i| rects[i].contains_point(mx, my))
}

/// Region quadtree over a borrowed-then-copied set of rectangles.
///
/// Results are reported as indices into the slice passed to [`QuadTree::build`].
///
/// ## Example
///
/// ```rust
/// use cyan_index::{Aabb2D, QuadTree};
///
/// let rects = [
///     Aabb2D::new(0.0, 0.0, 10.0, 10.0),
///     Aabb2D::new(12.0, 0.0, 22.0, 10.0),
///     Aabb2D::new(1000.0, 0.0, 1010.0, 10.0),
/// ];
/// let tree = QuadTree::build(&rects, 8, 8);
/// assert_eq!(tree.query_near(rects[0], 64.0), [0, 1]);
/// ```
pub struct QuadTree<T: Scalar> {
    root: Option<QuadNode<T>>,
    rects: Vec<Aabb2D<T>>,
    len: usize,
}

impl<T: Scalar> Debug for QuadTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuadTree")
            .field("bounds", &self.bounds())
            .field("len", &self.len)
            .field("depth", &self.depth())
            .field("leaves", &self.leaf_count())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> QuadTree<T> {
    /// Build a quadtree over `rects` covering their union.
    ///
    /// Leaves split once they hold more than `capacity` rectangles, unless they sit at
    /// `max_depth`. Degenerate rectangles are skipped.
    pub fn build(rects: &[Aabb2D<T>], capacity: usize, max_depth: usize) -> Self {
        let capacity = capacity.max(1);
        let rects = rects.to_vec();
        let live = rects.iter().enumerate().filter(|(_, r)| !r.is_empty());
        let Some((_, first)) = live.clone().next() else {
            return Self {
                root: None,
                rects,
                len: 0,
            };
        };
        let bounds = live.clone().fold(*first, |acc, (_, r)| acc.union(*r));
        let mut root = QuadNode::leaf(bounds);
        let mut len = 0;
        for (i, _) in live {
            root.insert(i, &rects, 0, capacity, max_depth);
            len += 1;
        }
        Self {
            root: Some(root),
            rects,
            len,
        }
    }

    /// Number of (non-degenerate) rectangles in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no rectangles.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Union of all rectangles, or `None` when empty.
    pub fn bounds(&self) -> Option<Aabb2D<T>> {
        self.root.as_ref().map(|r| r.bounds)
    }

    /// Deepest level reached by any leaf (the root is level 0).
    pub fn depth(&self) -> usize {
        let Some(root) = &self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 0_usize)];
        while let Some((node, depth)) = stack.pop() {
            match &node.content {
                QuadContent::Leaf(_) => deepest = deepest.max(depth),
                QuadContent::Split(children) => {
                    stack.extend(children.iter().map(|c| (c, depth + 1)));
                }
            }
        }
        deepest
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        let Some(root) = &self.root else {
            return 0;
        };
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match &node.content {
                QuadContent::Leaf(_) => count += 1,
                QuadContent::Split(children) => stack.extend(children.iter()),
            }
        }
        count
    }

    /// Visit every rectangle whose gap to `rect` is at most `gap` on both axes.
    ///
    /// Order is unspecified, and a rectangle stored in several quadrants is reported
    /// once per quadrant reached; callers that need each index once should track what
    /// they have seen or use [`query_near`](Self::query_near). Passing a zero gap visits
    /// rectangles that overlap or touch `rect`.
    pub fn visit_near<F: FnMut(usize)>(&self, rect: Aabb2D<T>, gap: T, mut f: F) {
        let Some(root) = &self.root else {
            return;
        };
        let reach = rect.inflate(gap);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bounds.overlaps(&reach) {
                continue;
            }
            match &node.content {
                QuadContent::Split(children) => stack.extend(children.iter()),
                QuadContent::Leaf(items) => {
                    for &i in items {
                        if rect.within_gap(&self.rects[i], gap) {
                            f(i);
                        }
                    }
                }
            }
        }
    }

    /// Indices of rectangles within `gap` of `rect`, ascending and without repeats.
    pub fn query_near(&self, rect: Aabb2D<T>, gap: T) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit_near(rect, gap, |i| out.push(i));
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    struct Rng(u64);

    impl Rng {
        fn next_u64(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: u64) -> i64 {
            (self.next_u64() % n) as i64
        }
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        let tree: QuadTree<f64> = QuadTree::build(&[], 8, 8);
        assert!(tree.is_empty());
        assert_eq!(tree.bounds(), None);
        assert!(
            tree.query_near(Aabb2D::new(0.0, 0.0, 1.0, 1.0), 64.0)
                .is_empty()
        );
    }

    #[test]
    fn degenerate_rects_are_skipped() {
        let rects = [
            Aabb2D::new(0, 0, 0, 10),
            Aabb2D::new(0, 0, 10, 10),
            Aabb2D::new(5, 5, 5, 5),
        ];
        let tree = QuadTree::build(&rects, 8, 8);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.query_near(Aabb2D::new(0, 0, 10, 10), 100), [1]);
    }

    #[test]
    fn bounds_cover_all_rects() {
        let rects = [
            Aabb2D::new(-5, 3, 0, 8),
            Aabb2D::new(40, -2, 41, 1),
            Aabb2D::new(10, 10, 20, 90),
        ];
        let tree = QuadTree::build(&rects, 8, 8);
        assert_eq!(tree.bounds(), Some(Aabb2D::new(-5, -2, 41, 90)));
    }

    #[test]
    fn splits_and_reports_straddlers_once() {
        // A large rectangle overlapping every quadrant plus enough small ones to force splits.
        let mut rects = vec![Aabb2D::new(0, 0, 1000, 1000)];
        for i in 0..40 {
            let x = (i % 8) * 120;
            let y = (i / 8) * 180;
            rects.push(Aabb2D::from_xywh(x, y, 10, 10));
        }
        let tree = QuadTree::build(&rects, 4, 8);
        assert!(tree.leaf_count() > 1);
        let hits = tree.query_near(Aabb2D::new(400, 400, 600, 600), 0);
        assert_eq!(hits.iter().filter(|&&i| i == 0).count(), 1);
    }

    #[test]
    fn identical_rects_do_not_split() {
        let rects: Vec<_> = (0..500).map(|_| Aabb2D::new(10, 10, 20, 20)).collect();
        let tree = QuadTree::build(&rects, 8, 8);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.query_near(Aabb2D::new(0, 0, 1, 1), 9).len(), 500);
    }

    #[test]
    fn nested_overlap_stops_at_max_depth() {
        // Nested boxes sharing a corner: every split leaves small ones crowded in one quadrant.
        let rects: Vec<_> = (0..200)
            .map(|i| Aabb2D::new(0, 0, 1 + i * 20, 1 + i * 20))
            .collect();
        let tree = QuadTree::build(&rects, 2, 3);
        assert!(tree.depth() <= 3);
        assert_eq!(tree.query_near(Aabb2D::new(0, 0, 1, 1), 0).len(), 200);
    }

    #[test]
    fn near_queries_match_linear_scan() {
        let mut rng = Rng(0x1234_5678_9ABC_DEF1);
        for n in [1, 7, 64, 300, 1200] {
            let rects: Vec<_> = (0..n)
                .map(|_| {
                    Aabb2D::from_xywh(
                        rng.below(2000),
                        rng.below(2000),
                        1 + rng.below(60),
                        1 + rng.below(60),
                    )
                })
                .collect();
            let tree = QuadTree::build(&rects, DEFAULT_LEAF_CAPACITY, DEFAULT_MAX_DEPTH);
            for _ in 0..100 {
                let q = Aabb2D::from_xywh(
                    rng.below(2200) - 100,
                    rng.below(2200) - 100,
                    1 + rng.below(100),
                    1 + rng.below(100),
                );
                let gap = rng.below(100);
                let expected: Vec<usize> = rects
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| q.within_gap(r, gap))
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(tree.query_near(q, gap), expected);
            }
        }
    }
}
