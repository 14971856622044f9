// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene arena: structure, dirty tracking, and incremental layout.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use kurbo::{Point, Rect, Size, Vec2};

use crate::constraints::{Constraints, FALLBACK_SIZE};
use crate::damage::{DamageConfig, DirtyRegions};
use crate::error::SceneError;
use crate::kind::{LayoutCx, NodeKind};
use crate::scheduler::Scheduler;
use crate::types::{NodeFlags, NodeId, NodeProps};
use crate::util::is_degenerate;

/// A retained scene of nodes with layout and paint dirty tracking.
///
/// Nodes live in a generational arena: parents own an ordered list of child ids and
/// children keep a non-owning parent id. Only the subtree under [`Scene::root`] is
/// *attached*; detached subtrees keep their structure but never reach the layout
/// queue or the damage list.
///
/// Mutations mark nodes dirty. [`Scene::mark_needs_layout`] climbs to the nearest
/// relayout boundary and queues it; [`Scene::mark_needs_paint`] queues the node once
/// per dirty cycle and records the area it currently covers. [`Scene::flush_layout`]
/// and [`Scene::flush_paint`] drain those queues, normally from
/// [`Engine::frame`](crate::Engine::frame).
///
/// ## Example
///
/// ```rust
/// use cyan_scene::{NodeProps, Rectangle, Rgba8, Scene};
/// use kurbo::{Point, Size};
///
/// let mut scene = Scene::new();
/// let root = scene.create(Rectangle::new(Rgba8::WHITE));
/// scene.set_root(root).unwrap();
/// let child = scene.create_with(
///     Rectangle::new(Rgba8::BLACK),
///     NodeProps {
///         position: Point::new(10.0, 20.0),
///         preferred_width: Some(30.0),
///         preferred_height: Some(40.0),
///         ..NodeProps::default()
///     },
/// );
/// scene.append_child(root, child).unwrap();
///
/// scene.flush_layout();
/// assert_eq!(scene.size(root), Some(Size::new(800.0, 600.0)));
/// assert_eq!(scene.size(child), Some(Size::new(30.0, 40.0)));
/// assert_eq!(scene.world_origin(child), Some(Point::new(10.0, 20.0)));
/// ```
pub struct Scene {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: Option<NodeId>,
    root_constraints: Constraints,
    scheduler: Scheduler,
    damage: DirtyRegions,
    layout_runs: u64,
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Scene")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("root", &self.root)
            .field("root_constraints", &self.root_constraints)
            .field("scheduler", &self.scheduler)
            .field("damage", &self.damage)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) props: NodeProps,
    pub(crate) size: Size,
    needs_layout: bool,
    needs_paint: bool,
    last_constraints: Option<Constraints>,
    pub(crate) depth: u32,
    relayout_boundary: Option<NodeId>,
    attached: bool,
    /// Taken out while the node's own `perform_layout` runs.
    pub(crate) kind: Option<Box<dyn NodeKind>>,
}

impl Node {
    fn new(generation: u32, kind: Box<dyn NodeKind>, props: NodeProps) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            props,
            size: Size::ZERO,
            needs_layout: true,
            needs_paint: false,
            last_constraints: None,
            depth: 0,
            relayout_boundary: None,
            attached: false,
            kind: Some(kind),
        }
    }
}

impl Scene {
    /// Create an empty scene with default damage tuning.
    ///
    /// The root is laid out with tight 800×600 constraints until
    /// [`Scene::set_root_constraints`] says otherwise.
    pub fn new() -> Self {
        Self::with_damage_config(DamageConfig::default())
    }

    /// Create an empty scene with the given damage tuning.
    pub fn with_damage_config(config: DamageConfig) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            root_constraints: Constraints::tight(FALLBACK_SIZE),
            scheduler: Scheduler::default(),
            damage: DirtyRegions::new(config),
            layout_runs: 0,
        }
    }

    // --- structure ---

    /// Create a detached node with default properties.
    pub fn create(&mut self, kind: impl NodeKind) -> NodeId {
        self.create_with(kind, NodeProps::default())
    }

    /// Create a detached node with the given properties.
    ///
    /// The node starts out needing layout. It has no effect on the frame until it
    /// becomes the root or is attached under it.
    pub fn create_with(&mut self, kind: impl NodeKind, props: NodeProps) -> NodeId {
        let kind: Box<dyn NodeKind> = Box::new(kind);
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, kind, props));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, kind, props)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Make `id` the scene root.
    ///
    /// The previous root, if any, is detached (but stays alive). Swapping roots
    /// forces a full repaint.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), SceneError> {
        let node = self.node_checked(id)?;
        if node.parent.is_some() {
            return Err(SceneError::AlreadyParented(id));
        }
        if self.root == Some(id) {
            return Ok(());
        }
        if let Some(old) = self.root.take() {
            self.reattach(old, 0, false);
        }
        self.root = Some(id);
        self.reattach(id, 0, true);
        self.damage.mark_full_repaint();
        self.mark_layout(id);
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.check_attachable(parent, child)?;
        self.node_mut(parent).children.push(child);
        self.link(parent, child);
        Ok(())
    }

    /// Insert `child` into `parent`'s children right before `reference`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), SceneError> {
        self.check_attachable(parent, child)?;
        let pos = self
            .node_checked(parent)?
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(SceneError::NotAChild {
                parent,
                child: reference,
            })?;
        self.node_mut(parent).children.insert(pos, child);
        self.link(parent, child);
        Ok(())
    }

    /// Detach `id` (with its subtree) from its parent, or clear it as root.
    ///
    /// The area the subtree covered is recorded as damage and the former parent is
    /// marked for layout. Detaching the root forces a full repaint. Detaching a node
    /// that is already detached does nothing.
    pub fn detach(&mut self, id: NodeId) -> Result<(), SceneError> {
        let parent = self.node_checked(id)?.parent;
        if self.root == Some(id) {
            self.root = None;
            self.reattach(id, 0, false);
            self.damage.mark_full_repaint();
            self.scheduler.request_visual_update();
            return Ok(());
        }
        let Some(parent) = parent else {
            return Ok(());
        };
        self.mark_paint(id);
        self.node_mut(parent).children.retain(|&c| c != id);
        let node = self.node_mut(id);
        node.parent = None;
        node.relayout_boundary = None;
        self.reattach(id, 0, false);
        self.mark_layout(parent);
        Ok(())
    }

    /// Detach `id` and free it together with its whole subtree.
    ///
    /// Every freed id becomes stale; its slot is reused with a new generation.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes[current.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(current.idx());
            }
        }
        Ok(())
    }

    // --- mutation ---

    /// Move a node within its parent's space. Records the vacated area.
    pub fn set_position(&mut self, id: NodeId, position: Point) -> Result<(), SceneError> {
        self.node_checked(id)?;
        self.move_node(id, position);
        Ok(())
    }

    /// Change a node's preferred size and mark it for layout.
    pub fn set_preferred_size(
        &mut self,
        id: NodeId,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<(), SceneError> {
        let props = &mut self.node_checked_mut(id)?.props;
        if props.preferred_width == width && props.preferred_height == height {
            return Ok(());
        }
        props.preferred_width = width;
        props.preferred_height = height;
        self.mark_layout(id);
        Ok(())
    }

    /// Change a node's flags. Visibility changes repaint both old and new areas.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<(), SceneError> {
        if self.node_checked(id)?.props.flags == flags {
            return Ok(());
        }
        self.mark_paint(id);
        self.node_mut(id).props.flags = flags;
        Ok(())
    }

    /// Replace a node's kind and mark it for layout.
    pub fn set_kind(&mut self, id: NodeId, kind: impl NodeKind) -> Result<(), SceneError> {
        self.node_checked_mut(id)?.kind = Some(Box::new(kind));
        self.mark_layout(id);
        Ok(())
    }

    /// Edit a node's kind in place when it is a `K`, then mark the node for layout.
    ///
    /// Returns `Ok(false)` without calling `f` when the kind is of another type.
    pub fn update_kind<K: NodeKind>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut K),
    ) -> Result<bool, SceneError> {
        let node = self.node_checked_mut(id)?;
        let Some(kind) = node.kind.as_mut() else {
            return Ok(false);
        };
        let any: &mut dyn Any = &mut **kind;
        let Some(kind) = any.downcast_mut::<K>() else {
            return Ok(false);
        };
        f(kind);
        self.mark_layout(id);
        Ok(true)
    }

    /// Set the constraints the root is laid out with and mark the root for layout.
    pub fn set_root_constraints(&mut self, constraints: Constraints) {
        if self.root_constraints == constraints {
            return;
        }
        self.root_constraints = constraints;
        if let Some(root) = self.root {
            self.mark_layout(root);
        }
    }

    // --- dirty tracking ---

    /// Mark a node as needing layout.
    ///
    /// The flag is set on every node from `id` up to its relayout boundary (each
    /// also marked for paint); the boundary is queued if it is attached.
    pub fn mark_needs_layout(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.node_checked(id)?;
        self.mark_layout(id);
        Ok(())
    }

    /// Mark a node as needing paint.
    ///
    /// Idempotent until the next [`Scene::flush_paint`]. The first mark of a cycle
    /// records the area the node's visible subtree covers right now.
    pub fn mark_needs_paint(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.node_checked(id)?;
        self.mark_paint(id);
        Ok(())
    }

    /// Record the area a node's visible subtree currently covers as damage.
    pub fn add_node_bounds(&mut self, id: NodeId) {
        if let Some(bounds) = self.paint_bounds(id) {
            self.damage.add_region(bounds);
        }
    }

    fn mark_layout(&mut self, id: NodeId) {
        let mut current = id;
        loop {
            self.mark_paint(current);
            let Some(node) = self.get_mut(current) else {
                return;
            };
            node.needs_layout = true;
            let is_boundary = node.relayout_boundary == Some(current);
            match node.parent {
                Some(parent) if !is_boundary => current = parent,
                _ => {
                    if node.attached {
                        self.scheduler.schedule_layout(current);
                    }
                    return;
                }
            }
        }
    }

    fn mark_paint(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if node.needs_paint {
            return;
        }
        node.needs_paint = true;
        let attached = node.attached;
        self.scheduler.schedule_paint(id);
        if attached && !self.damage.full_repaint_pending() {
            self.add_node_bounds(id);
        }
    }

    pub(crate) fn move_node(&mut self, id: NodeId, position: Point) {
        if self.get(id).is_none_or(|n| n.props.position == position) {
            return;
        }
        self.mark_paint(id);
        self.node_mut(id).props.position = position;
    }

    // --- layout ---

    /// Lay out `id` under `constraints` and return its committed size.
    ///
    /// Invalid constraints are replaced by [`Constraints::fallback`] and logged. The
    /// node becomes its own relayout boundary when it has no parent or the
    /// constraints are tight; otherwise it inherits its parent's. A clean node whose
    /// boundary and constraints match its last layout is skipped.
    pub fn layout(&mut self, id: NodeId, constraints: Constraints) -> Result<Size, SceneError> {
        self.node_checked(id)?;
        Ok(self.layout_unchecked(id, constraints))
    }

    pub(crate) fn layout_unchecked(&mut self, id: NodeId, constraints: Constraints) -> Size {
        let constraints = if constraints.is_valid() {
            constraints
        } else {
            let fallback = constraints.fallback();
            tracing::warn!(
                ?id,
                ?constraints,
                ?fallback,
                "invalid constraints, laying out with loose fallback"
            );
            fallback
        };
        let Some(node) = self.get(id) else {
            return Size::ZERO;
        };
        let boundary = match node.parent {
            Some(parent) if !constraints.is_tight() => self
                .get(parent)
                .and_then(|p| p.relayout_boundary)
                .unwrap_or(id),
            _ => id,
        };
        if !node.needs_layout
            && node.relayout_boundary == Some(boundary)
            && node.last_constraints == Some(constraints)
        {
            tracing::trace!(?id, "layout skipped, constraints unchanged");
            return node.size;
        }

        // Records the pre-layout area and leaves `needs_paint` set.
        self.mark_paint(id);
        let node = self.node_mut(id);
        node.relayout_boundary = Some(boundary);
        node.last_constraints = Some(constraints);
        let natural = match node.kind.take() {
            Some(mut kind) => {
                let natural = kind.perform_layout(&mut LayoutCx::new(self, id), constraints);
                self.node_mut(id).kind = Some(kind);
                natural
            }
            None => Size::ZERO,
        };
        self.layout_runs += 1;

        let size = constraints.constrain(natural);
        let node = self.node_mut(id);
        node.size = size;
        node.needs_layout = false;
        size
    }

    /// Lay out every queued relayout boundary, parents before children.
    ///
    /// Entries that went stale, were detached, or were already laid out by an
    /// ancestor are skipped. The root uses the scene's root constraints; other
    /// boundaries reuse the constraints of their last layout. Returns how many
    /// `perform_layout` calls ran.
    pub fn flush_layout(&mut self) -> usize {
        let before = self.layout_runs;
        for id in self.take_layout_queue() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !node.needs_layout || !node.attached {
                continue;
            }
            let constraints = if self.root == Some(id) {
                self.root_constraints
            } else if let Some(c) = node.last_constraints {
                c
            } else {
                continue;
            };
            self.layout_unchecked(id, constraints);
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "A single flush cannot run more layouts than there are nodes."
        )]
        let ran = (self.layout_runs - before) as usize;
        ran
    }

    /// Drain the layout queue ordered by each node's depth at drain time, without
    /// duplicates. Nodes reparented since they were queued sort by where they are now.
    fn take_layout_queue(&mut self) -> Vec<NodeId> {
        let mut queue = self.scheduler.take_layout_queue();
        queue.sort_unstable_by_key(|&id| (self.get(id).map_or(u32::MAX, |n| n.depth), id));
        queue.dedup();
        queue
    }

    /// Record the post-layout area of every node queued for paint and clear the queue.
    ///
    /// Returns how many attached nodes were recorded.
    pub fn flush_paint(&mut self) -> usize {
        let mut recorded = 0;
        for id in self.scheduler.take_paint_queue() {
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            node.needs_paint = false;
            if node.attached {
                recorded += 1;
                if !self.damage.full_repaint_pending() {
                    self.add_node_bounds(id);
                }
            }
        }
        recorded
    }

    // --- queries ---

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is live if its slot exists and its generation matches the
    /// generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// The current root, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Constraints the root is laid out with.
    pub fn root_constraints(&self) -> Constraints {
        self.root_constraints
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Total `perform_layout` calls since the scene was created.
    pub fn layout_runs(&self) -> u64 {
        self.layout_runs
    }

    /// Returns the parent of a node if live, or `None` for roots or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get the children of a node, or empty slice if node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| &n.children)
    }

    /// Properties of a live node.
    pub fn props(&self, id: NodeId) -> Option<&NodeProps> {
        self.get(id).map(|n| &n.props)
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<&dyn NodeKind> {
        self.get(id).and_then(|n| n.kind.as_deref())
    }

    /// Size committed by the node's last layout.
    pub fn size(&self, id: NodeId) -> Option<Size> {
        self.get(id).map(|n| n.size)
    }

    /// Distance from the root of the node's tree (attached or not).
    pub fn depth(&self, id: NodeId) -> Option<u32> {
        self.get(id).map(|n| n.depth)
    }

    /// Relayout boundary chosen by the node's last layout.
    pub fn relayout_boundary(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.relayout_boundary)
    }

    /// Constraints of the node's last layout.
    pub fn last_constraints(&self, id: NodeId) -> Option<Constraints> {
        self.get(id).and_then(|n| n.last_constraints)
    }

    /// Whether the node needs layout (`false` for stale ids).
    pub fn needs_layout(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.needs_layout)
    }

    /// Whether the node is queued for paint (`false` for stale ids).
    pub fn needs_paint(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.needs_paint)
    }

    /// Whether the node is the root or one of its descendants.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.attached)
    }

    /// The node's top-left corner in the space of its tree's root.
    pub fn world_origin(&self, id: NodeId) -> Option<Point> {
        let mut node = self.get(id)?;
        let mut origin = node.props.position.to_vec2();
        while let Some(parent) = node.parent.and_then(|p| self.get(p)) {
            origin += parent.props.position.to_vec2();
            node = parent;
        }
        Some(origin.to_point())
    }

    /// The node's own box in the space of its tree's root.
    pub fn world_bounds(&self, id: NodeId) -> Option<Rect> {
        let size = self.get(id)?.size;
        Some(Rect::from_origin_size(self.world_origin(id)?, size))
    }

    /// Union of the world boxes of the node's visible subtree.
    ///
    /// Children that overflow their parent are included. Returns `None` for stale or
    /// invisible nodes and for subtrees with no area.
    pub fn paint_bounds(&self, id: NodeId) -> Option<Rect> {
        let start = self.world_origin(id)? - self.get(id)?.props.position;
        let mut bounds: Option<Rect> = None;
        let mut stack = vec![(id, start)];
        while let Some((current, parent_origin)) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            if !node.props.flags.contains(NodeFlags::VISIBLE) {
                continue;
            }
            let origin = parent_origin + node.props.position.to_vec2();
            let rect = Rect::from_origin_size(origin.to_point(), node.size);
            if !is_degenerate(rect) {
                bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
            }
            stack.extend(node.children.iter().map(|&c| (c, origin)));
        }
        bounds
    }

    /// Pending layout and paint work.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn take_visual_update_request(&mut self) -> bool {
        self.scheduler.take_visual_update_request()
    }

    /// Raw damage collected since the last flush.
    pub fn damage(&self) -> &DirtyRegions {
        &self.damage
    }

    /// Mutable access to the damage list, for recording extra regions or forcing a
    /// full repaint.
    pub fn damage_mut(&mut self) -> &mut DirtyRegions {
        &mut self.damage
    }

    /// Visit every visible attached node in paint order (pre-order, children in
    /// order), with its world box. Invisible nodes hide their subtrees.
    pub(crate) fn visit_visible<F: FnMut(NodeId, &Node, Rect)>(&self, mut f: F) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![(root, Vec2::ZERO)];
        while let Some((id, parent_origin)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !node.props.flags.contains(NodeFlags::VISIBLE) {
                continue;
            }
            let origin = parent_origin + node.props.position.to_vec2();
            f(
                id,
                node,
                Rect::from_origin_size(origin.to_point(), node.size),
            );
            stack.extend(node.children.iter().rev().map(|&c| (c, origin)));
        }
    }

    // --- internals ---

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())
            .and_then(|slot| slot.as_ref())
            .filter(|n| n.generation == id.1)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|slot| slot.as_mut())
            .filter(|n| n.generation == id.1)
    }

    fn node_checked(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.get(id).ok_or(SceneError::StaleNode(id))
    }

    fn node_checked_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.get_mut(id).ok_or(SceneError::StaleNode(id))
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.get_mut(id).expect("dangling NodeId")
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node_checked(parent)?;
        let node = self.node_checked(child)?;
        if self.root == Some(child) {
            return Err(SceneError::NotAttachable(child));
        }
        if node.parent.is_some() {
            return Err(SceneError::AlreadyParented(child));
        }
        let mut current = Some(parent);
        while let Some(ancestor) = current {
            if ancestor == child {
                return Err(SceneError::WouldCycle { parent, child });
            }
            current = self.parent_of(ancestor);
        }
        Ok(())
    }

    /// Finish attaching `child` (already listed in `parent`'s children).
    fn link(&mut self, parent: NodeId, child: NodeId) {
        let (depth, attached) = {
            let p = self.node_mut(parent);
            (p.depth + 1, p.attached)
        };
        let node = self.node_mut(child);
        node.parent = Some(parent);
        node.needs_layout = true;
        self.reattach(child, depth, attached);
        self.mark_layout(parent);
    }

    /// Recompute depth and attachment for the subtree at `id`.
    fn reattach(&mut self, id: NodeId, depth: u32, attached: bool) {
        let mut stack = vec![(id, depth)];
        while let Some((current, depth)) = stack.pop() {
            let Some(node) = self.get_mut(current) else {
                continue;
            };
            node.depth = depth;
            node.attached = attached;
            stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
        }
    }
}
