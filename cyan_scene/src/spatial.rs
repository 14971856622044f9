// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree backed hit testing over the scene's visible nodes.

use alloc::vec::Vec;

use cyan_index::{DEFAULT_FAN_OUT, Leaf, RTree};
use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::tree::Scene;
use crate::types::{NodeFlags, NodeId};
use crate::util::{is_degenerate, rect_to_aabb};

/// Tuning for [`SpatialIndex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum children or entries per R-tree node.
    pub fan_out: usize,
    /// Buffered inserts and removals that trigger an automatic [`SpatialIndex::flush`].
    pub pending_threshold: usize,
    /// Cached hit results kept before the cache is dropped wholesale.
    pub cache_capacity: usize,
}

impl IndexConfig {
    /// Default pending-change threshold.
    pub const DEFAULT_PENDING_THRESHOLD: usize = 50;
    /// Default hit-cache capacity.
    pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fan_out: DEFAULT_FAN_OUT,
            pending_threshold: Self::DEFAULT_PENDING_THRESHOLD,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// What the index stores for each box.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Node the box belongs to.
    pub node: NodeId,
    /// Tree depth of the node; deeper wins hit tests.
    pub depth: u32,
    /// Position in paint order; later wins ties.
    pub order: u32,
    /// Flags at indexing time.
    pub flags: NodeFlags,
}

/// One step of a hit path: a node and the hit point in its local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathEntry {
    /// Node on the path.
    pub node: NodeId,
    /// Hit point relative to the node's top-left corner.
    pub local: Point,
}

/// Result of [`SpatialIndex::hit_test`].
#[derive(Clone, Debug, PartialEq)]
pub struct HitPath {
    /// The deepest pickable node under the point.
    pub target: NodeId,
    /// Dispatch path from the target up to the root, target first.
    pub path: SmallVec<[PathEntry; 8]>,
}

/// Spatial index over the world boxes of visible nodes.
///
/// The index is a snapshot: [`rebuild`](Self::rebuild) replaces it from the scene,
/// and [`bulk_insert`](Self::bulk_insert) / [`bulk_remove`](Self::bulk_remove)
/// buffer edits that are applied in one rebuild once enough accumulate or on
/// [`flush`](Self::flush). Queries see only applied changes.
///
/// Every applied change bumps [`version`](Self::version), which also keys the
/// hit-result cache, so stale hits are never served.
pub struct SpatialIndex {
    config: IndexConfig,
    tree: RTree<f64, IndexEntry>,
    version: u64,
    next_order: u32,
    pending_insert: Vec<Leaf<f64, IndexEntry>>,
    pending_remove: HashSet<NodeId>,
    cache: HashMap<(u64, u64, u64), Option<NodeId>>,
}

impl core::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("config", &self.config)
            .field("entries", &self.tree.len())
            .field("height", &self.tree.height())
            .field("version", &self.version)
            .field("pending_insert", &self.pending_insert.len())
            .field("pending_remove", &self.pending_remove.len())
            .field("cached_hits", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            tree: RTree::new(config.fan_out),
            version: 0,
            next_order: 0,
            pending_insert: Vec::new(),
            pending_remove: HashSet::new(),
            cache: HashMap::new(),
        }
    }

    /// Current tuning.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Bumped on every rebuild or applied batch.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of indexed boxes.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Buffered inserts plus removals not yet applied.
    pub fn pending(&self) -> usize {
        self.pending_insert.len() + self.pending_remove.len()
    }

    /// Replace the contents with the world boxes of every visible attached node.
    ///
    /// Invisible nodes hide their subtrees. Boxes with no area are not indexed.
    /// Buffered changes are discarded.
    pub fn rebuild(&mut self, scene: &Scene) {
        let mut leaves = Vec::new();
        let mut order = 0_u32;
        scene.visit_visible(|id, node, world| {
            if !is_degenerate(world) {
                leaves.push(Leaf::new(
                    rect_to_aabb(world),
                    IndexEntry {
                        node: id,
                        depth: node.depth,
                        order,
                        flags: node.props.flags,
                    },
                ));
            }
            order = order.saturating_add(1);
        });
        self.next_order = order;
        self.pending_insert.clear();
        self.pending_remove.clear();
        self.install(leaves);
    }

    /// Buffer boxes for insertion.
    ///
    /// Entries get paint-order positions after everything already indexed, in the
    /// order given. Boxes with no area are dropped.
    pub fn bulk_insert<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (Rect, NodeId, u32, NodeFlags)>,
    {
        for (rect, node, depth, flags) in items {
            if is_degenerate(rect) {
                continue;
            }
            let order = self.next_order;
            self.next_order = order.saturating_add(1);
            self.pending_insert.push(Leaf::new(
                rect_to_aabb(rect),
                IndexEntry {
                    node,
                    depth,
                    order,
                    flags,
                },
            ));
        }
        self.flush_if_needed();
    }

    /// Buffer removal of every box belonging to the given nodes.
    ///
    /// Removing a node also cancels its buffered inserts.
    pub fn bulk_remove<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        for node in nodes {
            self.pending_insert.retain(|l| l.payload.node != node);
            self.pending_remove.insert(node);
        }
        self.flush_if_needed();
    }

    /// Apply buffered changes with a single rebuild. Does nothing when none are pending.
    pub fn flush(&mut self) {
        if self.pending() == 0 {
            return;
        }
        tracing::trace!(
            inserts = self.pending_insert.len(),
            removals = self.pending_remove.len(),
            "applying buffered index changes"
        );
        let removed = core::mem::take(&mut self.pending_remove);
        let mut leaves: Vec<_> = self
            .tree
            .leaves()
            .filter(|l| !removed.contains(&l.payload.node))
            .copied()
            .collect();
        leaves.append(&mut self.pending_insert);
        self.install(leaves);
    }

    /// Every indexed node whose box contains `point`, topmost first.
    ///
    /// Deeper nodes come first; equal depths are ordered later-painted first.
    /// Pickability is not checked.
    pub fn query_point(&self, point: Point) -> Vec<NodeId> {
        let mut hits: Vec<IndexEntry> = self
            .tree
            .query_point(point.x, point.y)
            .map(|l| l.payload)
            .collect();
        hits.sort_unstable_by(|a, b| (b.depth, b.order).cmp(&(a.depth, a.order)));
        hits.into_iter().map(|e| e.node).collect()
    }

    /// Every indexed node whose box overlaps `rect`, in paint order.
    pub fn query_region(&self, rect: Rect) -> Vec<NodeId> {
        let mut hits: Vec<IndexEntry> = self
            .tree
            .query_rect(rect_to_aabb(rect))
            .map(|l| l.payload)
            .collect();
        hits.sort_unstable_by_key(|e| e.order);
        hits.into_iter().map(|e| e.node).collect()
    }

    /// The deepest pickable node containing `point`, later paint order winning ties.
    ///
    /// Results are cached per index version and point.
    pub fn hit_test_first(&mut self, point: Point) -> Option<NodeId> {
        let key = (self.version, point.x.to_bits(), point.y.to_bits());
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }
        let mut best: Option<IndexEntry> = None;
        self.tree.visit_point(point.x, point.y, |leaf| {
            let e = leaf.payload;
            if e.flags.contains(NodeFlags::PICKABLE)
                && best.is_none_or(|b| (e.depth, e.order) > (b.depth, b.order))
            {
                best = Some(e);
            }
        });
        let hit = best.map(|e| e.node);
        if self.cache.len() >= self.config.cache_capacity {
            tracing::trace!(entries = self.cache.len(), "evicting hit cache");
            self.cache.clear();
        }
        self.cache.insert(key, hit);
        hit
    }

    /// Hit test `point` and build the dispatch path from the target to the root.
    ///
    /// Each entry carries the point in that node's local space. Returns `None` when
    /// nothing pickable is hit or the hit node is no longer in `scene`.
    pub fn hit_test(&mut self, scene: &Scene, point: Point) -> Option<HitPath> {
        let target = self.hit_test_first(point)?;
        let mut path = SmallVec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            let origin = scene.world_origin(node)?;
            path.push(PathEntry {
                node,
                local: (point - origin).to_point(),
            });
            current = scene.parent_of(node);
        }
        Some(HitPath { target, path })
    }

    /// Number of cached hit results.
    pub fn cached_hits(&self) -> usize {
        self.cache.len()
    }

    fn flush_if_needed(&mut self) {
        if self.pending() >= self.config.pending_threshold {
            self.flush();
        }
    }

    fn install(&mut self, leaves: Vec<Leaf<f64, IndexEntry>>) {
        self.tree = RTree::build(self.config.fan_out, leaves);
        self.version += 1;
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraints;
    use crate::kind::Rectangle;
    use crate::paint::Rgba8;
    use crate::types::NodeProps;
    use alloc::vec;
    use kurbo::Size;

    fn rect_node(scene: &mut Scene, x: f64, y: f64, w: f64, h: f64) -> NodeId {
        scene.create_with(
            Rectangle::new(Rgba8::BLACK),
            NodeProps {
                position: Point::new(x, y),
                preferred_width: Some(w),
                preferred_height: Some(h),
                ..NodeProps::default()
            },
        )
    }

    /// root 200×200 ⊃ a (10,10 100×100) ⊃ b (+20,+20 30×30); c (50,50 100×100) after a.
    fn sample() -> (Scene, [NodeId; 4]) {
        let mut scene = Scene::new();
        scene.set_root_constraints(Constraints::tight(Size::new(200.0, 200.0)));
        let root = scene.create(Rectangle::new(Rgba8::WHITE));
        scene.set_root(root).unwrap();
        let a = rect_node(&mut scene, 10.0, 10.0, 100.0, 100.0);
        let b = rect_node(&mut scene, 20.0, 20.0, 30.0, 30.0);
        let c = rect_node(&mut scene, 50.0, 50.0, 100.0, 100.0);
        scene.append_child(root, a).unwrap();
        scene.append_child(a, b).unwrap();
        scene.append_child(root, c).unwrap();
        scene.flush_layout();
        (scene, [root, a, b, c])
    }

    #[test]
    fn rebuild_indexes_visible_nodes() {
        let (mut scene, [root, a, b, c]) = sample();
        let mut index = SpatialIndex::default();
        index.rebuild(&scene);
        assert_eq!(index.len(), 4);
        assert_eq!(index.version(), 1);
        assert_eq!(
            index.query_region(Rect::new(0.0, 0.0, 200.0, 200.0)),
            vec![root, a, b, c]
        );

        scene.set_flags(a, NodeFlags::PICKABLE).unwrap();
        index.rebuild(&scene);
        assert_eq!(index.len(), 2, "hidden subtree is not indexed");
        assert_eq!(index.version(), 2);
        assert_eq!(index.query_point(Point::new(35.0, 35.0)), vec![root]);
    }

    #[test]
    fn query_point_orders_deepest_then_topmost() {
        let (scene, [root, a, b, c]) = sample();
        let mut index = SpatialIndex::default();
        index.rebuild(&scene);
        // (60,60) is inside root, a, c and b (b spans 30..60 in world space).
        assert_eq!(
            index.query_point(Point::new(60.0, 60.0)),
            vec![b, c, a, root]
        );
        assert_eq!(index.query_point(Point::new(120.0, 120.0)), vec![c, root]);
        assert!(index.query_point(Point::new(500.0, 500.0)).is_empty());
    }

    #[test]
    fn hit_test_first_prefers_depth_then_paint_order() {
        let (mut scene, [_root, a, b, c]) = sample();
        let mut index = SpatialIndex::default();
        index.rebuild(&scene);
        assert_eq!(index.hit_test_first(Point::new(40.0, 40.0)), Some(b));
        // a and c share depth 1; c is painted later.
        assert_eq!(index.hit_test_first(Point::new(100.0, 100.0)), Some(c));

        scene.set_flags(c, NodeFlags::VISIBLE).unwrap();
        index.rebuild(&scene);
        assert_eq!(index.hit_test_first(Point::new(100.0, 100.0)), Some(a));
    }

    #[test]
    fn hit_test_builds_local_path() {
        let (scene, [root, a, b, _c]) = sample();
        let mut index = SpatialIndex::default();
        index.rebuild(&scene);
        let hit = index.hit_test(&scene, Point::new(35.0, 40.0)).unwrap();
        assert_eq!(hit.target, b);
        let path: Vec<_> = hit.path.iter().map(|e| (e.node, e.local)).collect();
        assert_eq!(
            path,
            vec![
                (b, Point::new(5.0, 10.0)),
                (a, Point::new(25.0, 30.0)),
                (root, Point::new(35.0, 40.0)),
            ]
        );
        assert!(index.hit_test(&scene, Point::new(-5.0, 0.0)).is_none());
    }

    #[test]
    fn cache_is_keyed_by_version_and_evicted() {
        let (scene, _) = sample();
        let mut index = SpatialIndex::new(IndexConfig {
            cache_capacity: 4,
            ..IndexConfig::default()
        });
        index.rebuild(&scene);
        for i in 0..4 {
            index.hit_test_first(Point::new(f64::from(i), 1.0));
        }
        assert_eq!(index.cached_hits(), 4);
        index.hit_test_first(Point::new(1.0, 1.0));
        assert_eq!(index.cached_hits(), 4, "repeat lookups hit the cache");
        index.hit_test_first(Point::new(9.0, 9.0));
        assert_eq!(index.cached_hits(), 1, "cache is dropped wholesale");
        index.rebuild(&scene);
        assert_eq!(index.cached_hits(), 0);
    }

    #[test]
    fn buffered_changes_apply_on_flush() {
        let (scene, [_root, a, _b, _c]) = sample();
        let mut index = SpatialIndex::default();
        index.rebuild(&scene);
        let extra = NodeId::new(99, 1);
        index.bulk_insert([(
            Rect::new(300.0, 300.0, 310.0, 310.0),
            extra,
            1,
            NodeFlags::default(),
        )]);
        index.bulk_remove([a]);
        assert_eq!(index.pending(), 2);
        assert!(index.query_point(Point::new(305.0, 305.0)).is_empty());

        index.flush();
        assert_eq!(index.pending(), 0);
        assert_eq!(index.version(), 2);
        assert_eq!(index.query_point(Point::new(305.0, 305.0)), vec![extra]);
        assert!(!index.query_point(Point::new(15.0, 15.0)).contains(&a));
        index.flush();
        assert_eq!(index.version(), 2, "empty flush is a no-op");
    }

    #[test]
    fn remove_cancels_pending_insert() {
        let mut index = SpatialIndex::default();
        let n = NodeId::new(3, 1);
        index.bulk_insert([(Rect::new(0.0, 0.0, 5.0, 5.0), n, 0, NodeFlags::default())]);
        index.bulk_remove([n]);
        index.flush();
        assert!(index.is_empty());
    }

    #[test]
    fn threshold_triggers_flush() {
        let mut index = SpatialIndex::new(IndexConfig {
            pending_threshold: 3,
            ..IndexConfig::default()
        });
        let items = |range: core::ops::Range<u32>| {
            range.map(|i| {
                let x = f64::from(i) * 10.0;
                (
                    Rect::new(x, 0.0, x + 5.0, 5.0),
                    NodeId::new(i, 1),
                    0,
                    NodeFlags::default(),
                )
            })
        };
        index.bulk_insert(items(0..2));
        assert_eq!(index.len(), 0);
        assert_eq!(index.pending(), 2);
        index.bulk_insert(items(2..3));
        assert_eq!(index.len(), 3);
        assert_eq!(index.pending(), 0);
        // Degenerate boxes never enter the buffer.
        index.bulk_insert([(
            Rect::new(0.0, 0.0, 0.0, 5.0),
            NodeId::new(9, 1),
            0,
            NodeFlags::default(),
        )]);
        assert_eq!(index.pending(), 0);
    }
}
