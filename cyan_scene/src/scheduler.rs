// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout and paint queues drained once per frame.

use alloc::vec::Vec;

use crate::types::NodeId;

/// Nodes waiting for layout or paint, plus the visual-update request flag.
///
/// The queues only hold ids; the [`Scene`](crate::Scene) decides what each entry means
/// when it drains them, skipping entries that went stale or clean in the meantime.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    layout_queue: Vec<NodeId>,
    paint_queue: Vec<NodeId>,
    visual_update_requested: bool,
}

impl Scheduler {
    /// Queue a relayout boundary.
    pub(crate) fn schedule_layout(&mut self, id: NodeId) {
        self.layout_queue.push(id);
        self.visual_update_requested = true;
    }

    /// Queue a node for paint-bounds recording.
    ///
    /// Callers guard with the node's `needs_paint` flag so each node lands here once
    /// per dirty cycle.
    pub(crate) fn schedule_paint(&mut self, id: NodeId) {
        self.paint_queue.push(id);
        self.visual_update_requested = true;
    }

    pub(crate) fn request_visual_update(&mut self) {
        self.visual_update_requested = true;
    }

    /// Take the layout queue in scheduling order, duplicates included.
    ///
    /// Depth ordering is left to the scene, which knows where each node sits when
    /// the queue is drained.
    pub(crate) fn take_layout_queue(&mut self) -> Vec<NodeId> {
        core::mem::take(&mut self.layout_queue)
    }

    pub(crate) fn take_paint_queue(&mut self) -> Vec<NodeId> {
        core::mem::take(&mut self.paint_queue)
    }

    /// Clear the visual-update request, returning whether one was pending.
    pub(crate) fn take_visual_update_request(&mut self) -> bool {
        core::mem::take(&mut self.visual_update_requested)
    }

    /// Number of queued layout entries (duplicates included).
    pub fn pending_layout(&self) -> usize {
        self.layout_queue.len()
    }

    /// Number of queued paint entries.
    pub fn pending_paint(&self) -> usize {
        self.paint_queue.len()
    }

    /// Whether a mutation asked for another frame since the last one ran.
    pub fn visual_update_requested(&self) -> bool {
        self.visual_update_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn layout_queue_drains_in_scheduling_order() {
        let mut s = Scheduler::default();
        let a = NodeId::new(0, 1);
        let c = NodeId::new(2, 1);
        s.schedule_layout(c);
        s.schedule_layout(a);
        s.schedule_layout(c);
        assert!(s.visual_update_requested());
        assert_eq!(s.pending_layout(), 3);
        assert_eq!(s.take_layout_queue(), vec![c, a, c]);
        assert_eq!(s.pending_layout(), 0);
    }

    #[test]
    fn visual_update_request_is_consumed() {
        let mut s = Scheduler::default();
        assert!(!s.take_visual_update_request());
        s.schedule_paint(NodeId::new(0, 1));
        assert!(s.take_visual_update_request());
        assert!(!s.visual_update_requested());
        assert_eq!(s.take_paint_queue().len(), 1);
    }
}
