// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: node identifiers, flags, and per-node properties.

use kurbo::Point;

/// Identifier for a node in the scene (generational).
///
/// Freed slots are reused with a bumped generation, so an id held past
/// [`Scene::remove`](crate::Scene::remove) never aliases a newer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (painted, recorded as damage, and present in the spatial index).
        ///
        /// Clearing it hides the whole subtree.
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in hit testing).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Properties a node carries independently of its kind.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeProps {
    /// Position of the node's top-left corner in its parent's space.
    pub position: Point,
    /// Width the node asks for; kinds fall back to their natural width when `None`.
    pub preferred_width: Option<f64>,
    /// Height the node asks for; kinds fall back to their natural height when `None`.
    pub preferred_height: Option<f64>,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
}

impl Default for NodeProps {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            preferred_width: None,
            preferred_height: None,
            flags: NodeFlags::default(),
        }
    }
}
