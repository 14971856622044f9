// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed R-tree built with Sort-Tile-Recursive (STR) bulk loading.
//!
//! The tree is immutable once built. Callers that need to change its contents
//! collect the current [`leaves`](RTree::leaves), edit the list, and build again;
//! STR packing is `O(n log n)` and yields a balanced tree with good locality, so
//! wholesale rebuilds are cheap compared to incremental splits.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::types::{Aabb2D, Scalar, cmp_t};
use crate::util::isqrt_ceil;

/// Default maximum number of children or leaf entries per node.
pub const DEFAULT_FAN_OUT: usize = 16;

/// A leaf entry: a bounding box and the payload it stands for.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Leaf<T, P> {
    /// Bounding box of the payload.
    pub bbox: Aabb2D<T>,
    /// Caller payload (typically a node handle).
    pub payload: P,
}

impl<T, P> Leaf<T, P> {
    /// Create a leaf entry.
    pub const fn new(bbox: Aabb2D<T>, payload: P) -> Self {
        Self { bbox, payload }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct NodeIdx(usize);

#[derive(Clone, Debug)]
enum Content<T, P> {
    /// Internal level: child nodes.
    Children(Vec<NodeIdx>),
    /// Leaf level: payload entries.
    Leaves(Vec<Leaf<T, P>>),
}

#[derive(Clone, Debug)]
struct RNode<T, P> {
    /// Always the union of the node's contents.
    bbox: Aabb2D<T>,
    content: Content<T, P>,
}

/// Packed R-tree over `Aabb2D<T>` boxes carrying payloads of type `P`.
///
/// ## Example
///
/// ```rust
/// use cyan_index::{Aabb2D, Leaf, RTree};
///
/// let tree = RTree::build(
///     16,
///     vec![
///         Leaf::new(Aabb2D::new(0, 0, 10, 10), 'a'),
///         Leaf::new(Aabb2D::new(5, 5, 15, 15), 'b'),
///         Leaf::new(Aabb2D::new(100, 100, 110, 110), 'c'),
///     ],
/// );
/// let mut hits: Vec<char> = tree.query_point(7, 7).map(|l| l.payload).collect();
/// hits.sort();
/// assert_eq!(hits, ['a', 'b']);
/// assert_eq!(tree.query_point(200, 200).count(), 0);
/// ```
pub struct RTree<T: Scalar, P: Copy + Debug> {
    fan_out: usize,
    nodes: Vec<RNode<T, P>>,
    root: Option<NodeIdx>,
    len: usize,
}

impl<T: Scalar, P: Copy + Debug> Default for RTree<T, P> {
    fn default() -> Self {
        Self::new(DEFAULT_FAN_OUT)
    }
}

impl<T: Scalar, P: Copy + Debug> Debug for RTree<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("fan_out", &self.fan_out)
            .field("nodes", &self.nodes.len())
            .field("len", &self.len)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, P: Copy + Debug> RTree<T, P> {
    /// Create an empty tree with the given fan-out (clamped to at least 2).
    pub fn new(fan_out: usize) -> Self {
        Self {
            fan_out: fan_out.max(2),
            nodes: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Bulk-load a tree from `entries` using Sort-Tile-Recursive packing.
    ///
    /// Degenerate boxes are dropped.
    pub fn build(fan_out: usize, entries: Vec<Leaf<T, P>>) -> Self {
        let mut tree = Self::new(fan_out);
        let mut entries = entries;
        entries.retain(|l| !l.bbox.is_empty());
        tree.len = entries.len();
        tree.root = tree.pack(entries);
        tree
    }

    /// Maximum number of children per node.
    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Number of leaf entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Union of all entries, or `None` for an empty tree.
    pub fn bounds(&self) -> Option<Aabb2D<T>> {
        self.root.map(|r| self.nodes[r.0].bbox)
    }

    /// Number of levels from the root to the leaf level (0 for an empty tree).
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(idx) = current {
            height += 1;
            current = match &self.nodes[idx.0].content {
                Content::Children(children) => children.first().copied(),
                Content::Leaves(_) => None,
            };
        }
        height
    }

    /// Iterate every leaf entry in storage order.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf<T, P>> + '_ {
        self.nodes.iter().flat_map(|n| match &n.content {
            Content::Leaves(leaves) => leaves.as_slice(),
            Content::Children(_) => &[][..],
        })
    }

    /// Visit entries whose box contains the point (edges inclusive).
    ///
    /// Only nodes whose bounding box contains the point are descended into.
    pub fn visit_point<'a, F: FnMut(&'a Leaf<T, P>)>(&'a self, x: T, y: T, mut f: F) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx.0];
            if !node.bbox.contains_point(x, y) {
                continue;
            }
            match &node.content {
                Content::Children(children) => stack.extend(children.iter().copied()),
                Content::Leaves(leaves) => {
                    for leaf in leaves {
                        if leaf.bbox.contains_point(x, y) {
                            f(leaf);
                        }
                    }
                }
            }
        }
    }

    /// Visit entries whose box intersects `rect` (shared edges count as intersecting).
    pub fn visit_rect<'a, F: FnMut(&'a Leaf<T, P>)>(&'a self, rect: Aabb2D<T>, mut f: F) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx.0];
            if !node.bbox.overlaps(&rect) {
                continue;
            }
            match &node.content {
                Content::Children(children) => stack.extend(children.iter().copied()),
                Content::Leaves(leaves) => {
                    for leaf in leaves {
                        if leaf.bbox.overlaps(&rect) {
                            f(leaf);
                        }
                    }
                }
            }
        }
    }

    /// Query entries whose box contains the point.
    pub fn query_point(&self, x: T, y: T) -> impl Iterator<Item = &Leaf<T, P>> + '_ {
        let mut out = Vec::new();
        self.visit_point(x, y, |l| out.push(l));
        out.into_iter()
    }

    /// Query entries whose box intersects `rect`.
    pub fn query_rect(&self, rect: Aabb2D<T>) -> impl Iterator<Item = &Leaf<T, P>> + '_ {
        let mut out = Vec::new();
        self.visit_rect(rect, |l| out.push(l));
        out.into_iter()
    }

    // --- internals ---

    /// STR packing: builds the leaf level, then promotes levels until at most
    /// `fan_out` nodes remain, and returns the root.
    fn pack(&mut self, mut entries: Vec<Leaf<T, P>>) -> Option<NodeIdx> {
        if entries.is_empty() {
            return None;
        }
        let m = self.fan_out;

        if entries.len() <= m {
            return Some(self.push_leaf(entries));
        }

        // Leaf level.
        let strip_len = str_sort(&mut entries, m, |l| l.bbox);
        let mut level: Vec<NodeIdx> = Vec::with_capacity(entries.len().div_ceil(m));
        for strip in entries.chunks(strip_len) {
            for group in strip.chunks(m) {
                level.push(self.push_leaf(group.to_vec()));
            }
        }

        // Upper levels: the same slicing applied to child bounding boxes.
        while level.len() > m {
            let nodes = &self.nodes;
            let strip_len = str_sort(&mut level, m, |i| nodes[i.0].bbox);
            let mut next: Vec<NodeIdx> = Vec::with_capacity(level.len().div_ceil(m));
            for strip in level.chunks(strip_len) {
                for group in strip.chunks(m) {
                    next.push(self.push_internal(group.to_vec()));
                }
            }
            level = next;
        }

        if level.len() == 1 {
            Some(level[0])
        } else {
            Some(self.push_internal(level))
        }
    }

    fn push_leaf(&mut self, leaves: Vec<Leaf<T, P>>) -> NodeIdx {
        let bbox = union_all(leaves.iter().map(|l| l.bbox));
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(RNode {
            bbox,
            content: Content::Leaves(leaves),
        });
        idx
    }

    fn push_internal(&mut self, children: Vec<NodeIdx>) -> NodeIdx {
        let bbox = union_all(children.iter().map(|c| self.nodes[c.0].bbox));
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(RNode {
            bbox,
            content: Content::Children(children),
        });
        idx
    }
}

/// Sort `items` for STR packing and return the strip length.
///
/// Items are sorted by x-center, sliced into `⌈√(n / m)⌉` vertical strips, and
/// each strip is sorted by y-center. Consecutive runs of `m` items within a strip
/// then form one node.
fn str_sort<E, T: Scalar>(items: &mut [E], m: usize, bbox_of: impl Fn(&E) -> Aabb2D<T>) -> usize {
    let n = items.len();
    let strips = isqrt_ceil(n.div_ceil(m)).max(1);
    let strip_len = n.div_ceil(strips).max(1);
    items.sort_by(|a, b| cmp_t(&bbox_of(a).center_x(), &bbox_of(b).center_x()));
    for strip in items.chunks_mut(strip_len) {
        strip.sort_by(|a, b| cmp_t(&bbox_of(a).center_y(), &bbox_of(b).center_y()));
    }
    strip_len
}

fn union_all<T: Scalar>(mut boxes: impl Iterator<Item = Aabb2D<T>>) -> Aabb2D<T> {
    let first = boxes
        .next()
        .unwrap_or_else(|| Aabb2D::new(T::zero(), T::zero(), T::zero(), T::zero()));
    boxes.fold(first, |acc, b| acc.union(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[derive(Clone)]
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

    fn random_boxes(rng: &mut Rng, n: usize) -> Vec<Leaf<i64, usize>> {
        (0..n)
            .map(|i| {
                let x = rng.below(1000);
                let y = rng.below(1000);
                let w = 1 + rng.below(80);
                let h = 1 + rng.below(80);
                Leaf::new(Aabb2D::from_xywh(x, y, w, h), i)
            })
            .collect()
    }

    fn sorted<I: Iterator<Item = usize>>(it: I) -> Vec<usize> {
        let mut v: Vec<usize> = it.collect();
        v.sort_unstable();
        v
    }

    /// Checks that every bbox is the union of its contents, no node exceeds the
    /// fan-out, and every leaf node sits at the same depth.
    fn check_structure<P: Copy + Debug>(tree: &RTree<i64, P>) {
        let Some(root) = tree.root else {
            return;
        };
        let mut leaf_depth = None;
        let mut stack = vec![(root, 1_usize)];
        while let Some((idx, depth)) = stack.pop() {
            let node = &tree.nodes[idx.0];
            match &node.content {
                Content::Children(children) => {
                    assert!(!children.is_empty() && children.len() <= tree.fan_out);
                    let u = union_all(children.iter().map(|c| tree.nodes[c.0].bbox));
                    assert_eq!(u, node.bbox, "internal bbox must equal union of children");
                    stack.extend(children.iter().map(|c| (*c, depth + 1)));
                }
                Content::Leaves(leaves) => {
                    assert!(!leaves.is_empty() && leaves.len() <= tree.fan_out);
                    let u = union_all(leaves.iter().map(|l| l.bbox));
                    assert_eq!(u, node.bbox, "leaf bbox must equal union of entries");
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(d) => assert_eq!(d, depth, "tree must be balanced"),
                    }
                }
            }
        }
        assert_eq!(leaf_depth, Some(tree.height()));
    }

    #[test]
    fn three_box_scenario() {
        let tree = RTree::build(
            DEFAULT_FAN_OUT,
            vec![
                Leaf::new(Aabb2D::new(0, 0, 10, 10), 0_usize),
                Leaf::new(Aabb2D::new(5, 5, 15, 15), 1),
                Leaf::new(Aabb2D::new(100, 100, 110, 110), 2),
            ],
        );
        assert_eq!(
            sorted(tree.query_point(7, 7).map(|l| l.payload)),
            vec![0, 1]
        );
        assert_eq!(tree.query_point(200, 200).count(), 0);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn empty_tree_answers_nothing() {
        let tree: RTree<i64, u32> = RTree::build(16, Vec::new());
        assert!(tree.is_empty());
        assert_eq!(tree.bounds(), None);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.query_point(0, 0).count(), 0);
        assert_eq!(tree.query_rect(Aabb2D::new(-10, -10, 10, 10)).count(), 0);
    }

    #[test]
    fn degenerate_boxes_are_dropped() {
        let tree = RTree::build(
            4,
            vec![
                Leaf::new(Aabb2D::new(0, 0, 0, 10), 0_u32),
                Leaf::new(Aabb2D::new(0, 0, 10, -1), 1),
                Leaf::new(Aabb2D::new(0, 0, 10, 10), 2),
            ],
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.leaves().count(), 1);
        let hits: Vec<_> = tree.query_point(0, 5).map(|l| l.payload).collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn packed_tree_is_balanced_and_tight() {
        let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
        for n in [1, 15, 16, 17, 100, 257, 1000, 4097] {
            let tree = RTree::build(DEFAULT_FAN_OUT, random_boxes(&mut rng, n));
            assert_eq!(tree.len(), n);
            assert_eq!(tree.leaves().count(), n);
            check_structure(&tree);
        }
        // Small fan-outs produce deeper trees that must still be balanced.
        let tree = RTree::build(2, random_boxes(&mut rng, 333));
        check_structure(&tree);
        assert!(tree.height() >= 8);
    }

    #[test]
    fn queries_match_linear_scan() {
        let mut rng = Rng(0xDEAD_BEEF_CAFE_F00D);
        for n in [0, 3, 16, 50, 500, 2000] {
            let boxes = random_boxes(&mut rng, n);
            let tree = RTree::build(DEFAULT_FAN_OUT, boxes.clone());
            for _ in 0..200 {
                let x = rng.below(1100) - 50;
                let y = rng.below(1100) - 50;
                let expected = sorted(
                    boxes
                        .iter()
                        .filter(|l| l.bbox.contains_point(x, y))
                        .map(|l| l.payload),
                );
                assert_eq!(sorted(tree.query_point(x, y).map(|l| l.payload)), expected);

                let q = Aabb2D::from_xywh(x, y, rng.below(200), rng.below(200));
                let expected = sorted(
                    boxes
                        .iter()
                        .filter(|l| l.bbox.overlaps(&q))
                        .map(|l| l.payload),
                );
                assert_eq!(sorted(tree.query_rect(q).map(|l| l.payload)), expected);
            }
        }
    }

    #[test]
    fn visit_and_query_agree() {
        let mut rng = Rng(42);
        let tree = RTree::build(8, random_boxes(&mut rng, 300));
        let mut visited = Vec::new();
        tree.visit_point(500, 500, |l| visited.push(l.payload));
        assert_eq!(
            sorted(visited.into_iter()),
            sorted(tree.query_point(500, 500).map(|l| l.payload))
        );

        let r = Aabb2D::new(200, 200, 400, 400);
        let mut visited = Vec::new();
        tree.visit_rect(r, |l| visited.push(l.payload));
        assert_eq!(
            sorted(visited.into_iter()),
            sorted(tree.query_rect(r).map(|l| l.payload))
        );
    }
}
