// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cyan Scene: an incremental rendering core.
//!
//! Cyan Scene keeps a retained tree of nodes and, frame by frame, does only the work
//! that changed: it lays out the smallest subtrees that can absorb a change, merges the
//! areas that need repainting into a few rectangles, and keeps a spatial index for hit
//! testing.
//!
//! ## Pipeline
//!
//! Mutations on the [`Scene`] mark nodes dirty. Nothing is computed eagerly; an
//! [`Engine::frame`] then runs:
//!
//! 1. **Layout.** Queued relayout boundaries are laid out shallowest first. A node is its
//!    own boundary when it has no parent or its constraints are tight, so a change inside
//!    it never needs its ancestors to relayout. Clean nodes whose constraints did not change
//!    are skipped.
//! 2. **Indexing.** The [`SpatialIndex`] is rebuilt from the world boxes of visible nodes
//!    (STR bulk load, see [`cyan_index::RTree`]).
//! 3. **Paint recording.** Every node marked for paint contributes the area it covered
//!    before the change (recorded when it was marked) and the area it covers after layout.
//! 4. **Damage merging.** [`DirtyRegions::flush`] merges nearby rectangles with a quadtree
//!    (see [`cyan_index::QuadTree`]), clips them to the viewport and decides between a
//!    full, partial or no repaint.
//!
//! [`Engine::render`] then calls [`paint`], which drives any [`DrawingContext`]
//! implementation. [`DisplayList`] records those calls and is what the tests use.
//!
//! ## Node kinds
//!
//! Behavior lives in [`NodeKind`] trait objects. `perform_layout` gets a [`LayoutCx`]
//! that can lay out and position the node's own children and nothing else, so layout
//! cannot restructure the tree or dirty unrelated nodes mid-frame. Built-in kinds:
//! [`Rectangle`], [`Circle`], [`Text`], [`Stack`] and [`Overlay`].
//!
//! ## Errors and degradation
//!
//! Structural misuse (stale ids, cycles, reparenting an attached node) returns
//! [`SceneError`]. Bad data never does: invalid constraints fall back to loose ones,
//! degenerate rectangles are dropped, and overlapping damage is bounded by the quadtree's
//! depth limit. Fallbacks are logged with `tracing`; no subscriber is installed here.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod constraints;
mod damage;
mod engine;
mod error;
mod kind;
mod paint;
mod scheduler;
mod spatial;
mod tree;
mod types;
mod util;

pub use constraints::{Constraints, FALLBACK_SIZE};
pub use damage::{DamageConfig, DirtyRegions, Repaint, merge_regions};
pub use engine::{Engine, EngineConfig, Frame, FrameStats};
pub use error::SceneError;
pub use kind::{Axis, Circle, LayoutCx, NodeKind, Overlay, Rectangle, Stack, Text};
pub use paint::{DisplayList, DrawCommand, DrawingContext, ImageId, Rgba8, paint};
pub use scheduler::Scheduler;
pub use spatial::{HitPath, IndexConfig, IndexEntry, PathEntry, SpatialIndex};
pub use tree::Scene;
pub use types::{NodeFlags, NodeId, NodeProps};
