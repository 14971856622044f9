// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame orchestration: layout, indexing, paint recording, and damage merging.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};

use crate::constraints::Constraints;
use crate::damage::{DamageConfig, Repaint};
use crate::error::SceneError;
use crate::paint::{DrawingContext, paint};
use crate::spatial::{HitPath, IndexConfig, SpatialIndex};
use crate::tree::Scene;
use crate::types::NodeId;

/// Tuning for an [`Engine`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    /// Dirty-region merging.
    pub damage: DamageConfig,
    /// Hit-test index.
    pub index: IndexConfig,
}

/// Counters describing one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// `perform_layout` calls.
    pub laid_out: usize,
    /// Attached nodes whose paint bounds were recorded.
    pub painted: usize,
    /// Raw dirty rectangles before merging.
    pub raw_regions: usize,
    /// Rectangles handed to the painter (0 unless partial).
    pub regions: usize,
    /// Whether the frame repaints the whole viewport.
    pub full: bool,
    /// Whether the spatial index was rebuilt.
    pub index_rebuilt: bool,
}

/// Output of [`Engine::frame`].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// What the painter has to redraw.
    pub repaint: Repaint,
    /// Frame counters.
    pub stats: FrameStats,
}

/// Owns a [`Scene`] and its [`SpatialIndex`] and runs the per-frame pipeline.
///
/// A frame runs these steps in order:
/// 1. [`Scene::flush_layout`] lays out dirty relayout boundaries, shallowest first.
/// 2. The spatial index is rebuilt when layout ran, paint work is pending or a full
///    repaint is due.
/// 3. [`Scene::flush_paint`] records where repainted nodes landed.
/// 4. The dirty regions are merged into a [`Repaint`].
///
/// [`Engine::render`] additionally hands the result to a [`DrawingContext`].
///
/// ## Example
///
/// ```rust
/// use cyan_scene::{DisplayList, Engine, NodeProps, Rectangle, Rgba8};
/// use kurbo::{Point, Size};
///
/// let mut engine = Engine::new(Size::new(400.0, 300.0));
/// let root = engine.scene_mut().create(Rectangle::new(Rgba8::WHITE));
/// engine.set_root(root).unwrap();
/// let dot = engine.scene_mut().create_with(
///     Rectangle::new(Rgba8::BLACK),
///     NodeProps {
///         position: Point::new(10.0, 10.0),
///         preferred_width: Some(20.0),
///         preferred_height: Some(20.0),
///         ..NodeProps::default()
///     },
/// );
/// engine.scene_mut().append_child(root, dot).unwrap();
///
/// let mut list = DisplayList::new();
/// let stats = engine.render(&mut list);
/// assert!(stats.full);
/// assert_eq!(engine.hit_test_first(Point::new(15.0, 15.0)), Some(dot));
///
/// engine.scene_mut().set_position(dot, Point::new(200.0, 100.0)).unwrap();
/// let frame = engine.frame();
/// assert_eq!(frame.repaint.regions().len(), 2);
/// assert!(!engine.needs_frame());
/// ```
#[derive(Debug)]
pub struct Engine {
    scene: Scene,
    index: SpatialIndex,
    viewport: Size,
    frame_count: u64,
}

impl Engine {
    /// Create an engine with default tuning for a viewport of the given size.
    pub fn new(viewport: Size) -> Self {
        Self::with_config(viewport, EngineConfig::default())
    }

    /// Create an engine with explicit tuning.
    ///
    /// The root is laid out with tight constraints equal to the viewport.
    pub fn with_config(viewport: Size, config: EngineConfig) -> Self {
        let mut scene = Scene::with_damage_config(config.damage);
        scene.set_root_constraints(Constraints::tight(viewport));
        Self {
            scene,
            index: SpatialIndex::new(config.index),
            viewport,
            frame_count: 0,
        }
    }

    /// The scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene, for mutation between frames.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The hit-test index as of the last frame.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The hit-test index, for buffered edits.
    pub fn index_mut(&mut self) -> &mut SpatialIndex {
        &mut self.index
    }

    /// Current viewport size.
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Resize the viewport: the root is relaid out and the next frame repaints fully.
    pub fn resize(&mut self, viewport: Size) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.scene
            .set_root_constraints(Constraints::tight(viewport));
        self.scene.damage_mut().mark_full_repaint();
    }

    /// Swap the scene root. The next frame repaints fully.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.scene.set_root(id)
    }

    /// Whether a mutation since the last frame asked for another one.
    pub fn needs_frame(&self) -> bool {
        let scheduler = self.scene.scheduler();
        scheduler.visual_update_requested()
            || scheduler.pending_layout() > 0
            || scheduler.pending_paint() > 0
            || self.scene.damage().full_repaint_pending()
            || !self.scene.damage().is_empty()
    }

    /// Run one frame and return what needs repainting.
    pub fn frame(&mut self) -> Frame {
        self.frame_count += 1;
        let laid_out = self.scene.flush_layout();

        // Attached nodes that change geometry or flags queue paint; root swaps and
        // root detaches force a full repaint instead.
        let index_rebuilt = laid_out > 0
            || self.scene.scheduler().pending_paint() > 0
            || self.scene.damage().full_repaint_pending()
            || self.index.version() == 0;
        if index_rebuilt {
            self.index.rebuild(&self.scene);
        }

        let painted = self.scene.flush_paint();
        let raw_regions = self.scene.damage().len();
        let repaint = self.scene.damage_mut().flush(self.viewport);
        self.scene.take_visual_update_request();

        let stats = FrameStats {
            frame: self.frame_count,
            laid_out,
            painted,
            raw_regions,
            regions: repaint.regions().len(),
            full: repaint.is_full(),
            index_rebuilt,
        };
        tracing::debug!(
            frame = stats.frame,
            laid_out,
            painted,
            raw_regions,
            regions = stats.regions,
            full = stats.full,
            "frame"
        );
        Frame { repaint, stats }
    }

    /// Run one frame and paint its result into `ctx`.
    pub fn render(&mut self, ctx: &mut dyn DrawingContext) -> FrameStats {
        let frame = self.frame();
        paint(&self.scene, ctx, &frame.repaint, self.viewport);
        frame.stats
    }

    /// The deepest pickable node under `point`, as of the last frame.
    pub fn hit_test_first(&mut self, point: Point) -> Option<NodeId> {
        self.index.hit_test_first(point)
    }

    /// Hit test `point` and build the dispatch path to the root.
    pub fn hit_test(&mut self, point: Point) -> Option<HitPath> {
        self.index.hit_test(&self.scene, point)
    }

    /// Indexed nodes containing `point`, topmost first.
    pub fn query_point(&self, point: Point) -> Vec<NodeId> {
        self.index.query_point(point)
    }

    /// Indexed nodes overlapping `rect`, in paint order.
    pub fn query_region(&self, rect: Rect) -> Vec<NodeId> {
        self.index.query_region(rect)
    }
}
