// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-region accumulation and per-frame merging.

use alloc::vec;
use alloc::vec::Vec;

use cyan_index::{Aabb2D, DEFAULT_LEAF_CAPACITY, DEFAULT_MAX_DEPTH, QuadTree};
use kurbo::{Rect, Size};

use crate::util::{aabb_to_rect, is_degenerate, rect_to_aabb};

/// Tuning for [`DirtyRegions::flush`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DamageConfig {
    /// Rectangles whose gap is at most this on both axes are merged.
    pub merge_gap: f64,
    /// Rectangles per quadtree leaf before it splits.
    pub leaf_capacity: usize,
    /// Quadtree depth limit.
    pub max_depth: usize,
    /// Fraction of the viewport area above which a partial repaint becomes full.
    pub full_repaint_coverage: f64,
    /// Whether the coverage fallback applies at all.
    ///
    /// Turning it off is a debugging aid for visualizing merged regions.
    pub coverage_fallback: bool,
}

impl DamageConfig {
    /// Default merge gap, in scene units.
    pub const DEFAULT_MERGE_GAP: f64 = 64.0;
    /// Default coverage fraction for the full-repaint fallback.
    pub const DEFAULT_COVERAGE: f64 = 0.95;
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            merge_gap: Self::DEFAULT_MERGE_GAP,
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            full_repaint_coverage: Self::DEFAULT_COVERAGE,
            coverage_fallback: true,
        }
    }
}

/// What the painter has to do this frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Repaint {
    /// Repaint the whole viewport.
    Full,
    /// Repaint only these viewport-space rectangles (never empty, pairwise
    /// further apart than the merge gap).
    Partial(Vec<Rect>),
    /// Nothing changed.
    Clean,
}

impl Repaint {
    /// Whether this is [`Repaint::Full`].
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether this is [`Repaint::Clean`].
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// The partial regions, or an empty slice for the other variants.
    pub fn regions(&self) -> &[Rect] {
        match self {
            Self::Partial(regions) => regions,
            _ => &[],
        }
    }
}

/// Raw dirty rectangles collected over a frame, plus the full-repaint flag.
///
/// The flag starts set, so the first flush always repaints everything.
#[derive(Clone, Debug)]
pub struct DirtyRegions {
    config: DamageConfig,
    regions: Vec<Rect>,
    full_repaint: bool,
}

impl Default for DirtyRegions {
    fn default() -> Self {
        Self::new(DamageConfig::default())
    }
}

impl DirtyRegions {
    /// Create a manager with the given tuning.
    pub fn new(config: DamageConfig) -> Self {
        Self {
            config,
            regions: Vec::new(),
            full_repaint: true,
        }
    }

    /// Current tuning.
    pub fn config(&self) -> &DamageConfig {
        &self.config
    }

    /// Replace the tuning; takes effect on the next flush.
    pub fn set_config(&mut self, config: DamageConfig) {
        self.config = config;
    }

    /// Record a dirty rectangle. Degenerate rectangles are dropped.
    pub fn add_region(&mut self, rect: Rect) {
        if is_degenerate(rect) {
            return;
        }
        self.regions.push(rect);
    }

    /// Force the next flush to report [`Repaint::Full`].
    pub fn mark_full_repaint(&mut self) {
        self.full_repaint = true;
    }

    /// Whether the next flush will report [`Repaint::Full`] regardless of coverage.
    pub fn full_repaint_pending(&self) -> bool {
        self.full_repaint
    }

    /// Raw rectangles recorded since the last flush.
    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// Number of raw rectangles recorded since the last flush.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no raw rectangles are pending.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Turn the frame's raw rectangles into a repaint decision and reset.
    ///
    /// Pending full repaints win. Otherwise nearby rectangles are merged until no
    /// two results lie within the merge gap, clipped to the viewport with outward
    /// rounding, and replaced by a full repaint when they cover more than the
    /// configured fraction of the viewport.
    pub fn flush(&mut self, viewport: Size) -> Repaint {
        let raw = core::mem::take(&mut self.regions);
        if core::mem::take(&mut self.full_repaint) {
            return Repaint::Full;
        }
        if raw.is_empty() {
            return Repaint::Clean;
        }

        let merged = merge_regions(&raw, &self.config);
        let bounds = viewport.to_rect();
        let clipped: Vec<Rect> = merged
            .into_iter()
            .map(|r| aabb_to_rect(r).expand().intersect(bounds))
            .filter(|r| !is_degenerate(*r))
            .collect();
        if clipped.is_empty() {
            return Repaint::Clean;
        }

        if self.config.coverage_fallback {
            let covered: f64 = clipped.iter().map(Rect::area).sum();
            if covered > self.config.full_repaint_coverage * viewport.area() {
                tracing::debug!(
                    covered,
                    viewport = viewport.area(),
                    regions = clipped.len(),
                    "dirty coverage over threshold, repainting everything"
                );
                return Repaint::Full;
            }
        }
        Repaint::Partial(clipped)
    }
}

/// Greedy proximity merge of `rects`, repeated until a pass merges nothing.
///
/// Each pass builds a quadtree over the current set and grows every unvisited
/// rectangle by absorbing unvisited neighbours within the merge gap, requerying
/// with the grown box until it stops growing. A later pass catches neighbours an
/// earlier component had already consumed by the time a box grew toward them.
pub fn merge_regions(rects: &[Rect], config: &DamageConfig) -> Vec<Aabb2D<f64>> {
    let mut current: Vec<Aabb2D<f64>> = rects
        .iter()
        .copied()
        .filter(|r| !is_degenerate(*r))
        .map(rect_to_aabb)
        .collect();
    loop {
        let before = current.len();
        current = merge_pass(&current, config);
        if current.len() == before {
            return current;
        }
    }
}

fn merge_pass(rects: &[Aabb2D<f64>], config: &DamageConfig) -> Vec<Aabb2D<f64>> {
    let gap = config.merge_gap.max(0.0);
    let tree = QuadTree::build(rects, config.leaf_capacity, config.max_depth);
    let mut done = vec![false; rects.len()];
    let mut out = Vec::new();
    for i in 0..rects.len() {
        if done[i] {
            continue;
        }
        done[i] = true;
        let mut acc = rects[i];
        loop {
            let mut grown = acc;
            tree.visit_near(acc, gap, |j| {
                if !done[j] {
                    done[j] = true;
                    grown = grown.union(rects[j]);
                }
            });
            if grown == acc {
                break;
            }
            acc = grown;
        }
        out.push(acc);
    }
    out
}
