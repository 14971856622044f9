// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by structural scene operations.

use crate::types::NodeId;

/// A structural misuse of the scene API.
///
/// Data faults (invalid constraints, degenerate boxes) never surface here; they are
/// repaired in place and logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The id was freed (or never issued by this scene).
    #[error("node {0:?} is stale")]
    StaleNode(NodeId),
    /// The reference node passed to an insertion is not a child of the parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Parent that was searched.
        parent: NodeId,
        /// Node that was expected among its children.
        child: NodeId,
    },
    /// The node must be detached before it can be attached elsewhere.
    #[error("node {0:?} already has a parent")]
    AlreadyParented(NodeId),
    /// The node is the parent itself or one of its ancestors.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCycle {
        /// Requested parent.
        parent: NodeId,
        /// Node that would become its own ancestor.
        child: NodeId,
    },
    /// The scene root cannot become somebody's child.
    #[error("node {0:?} is the scene root")]
    NotAttachable(NodeId),
}
