// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cyan Index: generic 2D AABB structures for a rendering core.
//!
//! Two structures live here, both generic over the scalar type `T` and free of any
//! geometry-crate dependency:
//!
//! - [`RTree`]: a packed R-tree built by Sort-Tile-Recursive (STR) bulk loading. It answers
//!   point and rectangle queries by descending only into matching nodes, and is rebuilt
//!   wholesale rather than edited in place.
//! - [`QuadTree`]: a transient region quadtree over a fixed batch of rectangles, used to find
//!   neighbours within a gap threshold when merging dirty regions.
//!
//! Higher layers (the scene crate) compute world-space boxes and feed them here.
//!
//! # Example
//!
//! ```rust
//! use cyan_index::{Aabb2D, Leaf, RTree};
//!
//! let tree = RTree::build(
//!     16,
//!     vec![
//!         Leaf::new(Aabb2D::new(0.0, 0.0, 10.0, 10.0), 1_u32),
//!         Leaf::new(Aabb2D::new(5.0, 5.0, 15.0, 15.0), 2),
//!         Leaf::new(Aabb2D::new(100.0, 100.0, 110.0, 110.0), 3),
//!     ],
//! );
//!
//! let mut hits: Vec<_> = tree.query_point(7.0, 7.0).map(|l| l.payload).collect();
//! hits.sort();
//! assert_eq!(hits, [1, 2]);
//! assert_eq!(tree.query_point(200.0, 200.0).count(), 0);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Sorting treats incomparable
//! values as equal rather than panicking.

#![no_std]

extern crate alloc;

mod quadtree;
mod rtree;
mod types;
pub(crate) mod util;

pub use quadtree::{DEFAULT_LEAF_CAPACITY, DEFAULT_MAX_DEPTH, QuadTree};
pub use rtree::{DEFAULT_FAN_OUT, Leaf, RTree};
pub use types::{Aabb2D, Scalar, ScalarAcc};
