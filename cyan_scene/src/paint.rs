// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing-context contract, a recording implementation of it, and the scene painter.
//!
//! The core never inspects a backend. It calls [`DrawingContext`] methods in node
//! order and leaves rasterization to whoever implements the trait.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

use crate::damage::Repaint;
use crate::tree::Scene;
use crate::types::{NodeFlags, NodeId};

/// An 8-bit-per-channel RGBA color (straight alpha).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a color from all four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Opaque handle to an image owned by the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

/// The operations the core needs from a 2D backend.
///
/// Transforms and clips are cumulative and scoped by [`save`](Self::save) /
/// [`restore`](Self::restore) pairs.
pub trait DrawingContext {
    /// Push the current transform and clip.
    fn save(&mut self);
    /// Pop back to the last saved transform and clip.
    fn restore(&mut self);
    /// Pre-multiply the current transform.
    fn transform(&mut self, affine: Affine);
    /// Intersect the current clip with a rectangle in current coordinates.
    fn clip_rect(&mut self, rect: Rect);
    /// Reset a rectangle to transparent.
    fn clear_rect(&mut self, rect: Rect);
    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath, color: Rgba8);
    /// Stroke a path with the given line width.
    fn stroke_path(&mut self, path: &BezPath, color: Rgba8, width: f64);
    /// Draw a run of text with its baseline starting at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point, font_size: f64, color: Rgba8);
    /// Draw an image scaled into `rect`.
    fn draw_image(&mut self, image: ImageId, rect: Rect);
}

/// One recorded [`DrawingContext`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// [`DrawingContext::save`].
    Save,
    /// [`DrawingContext::restore`].
    Restore,
    /// [`DrawingContext::transform`].
    Transform(Affine),
    /// [`DrawingContext::clip_rect`].
    ClipRect(Rect),
    /// [`DrawingContext::clear_rect`].
    ClearRect(Rect),
    /// [`DrawingContext::fill_path`].
    FillPath {
        /// Path in the coordinates current at the time of the call.
        path: BezPath,
        /// Fill color.
        color: Rgba8,
    },
    /// [`DrawingContext::stroke_path`].
    StrokePath {
        /// Path in the coordinates current at the time of the call.
        path: BezPath,
        /// Stroke color.
        color: Rgba8,
        /// Line width.
        width: f64,
    },
    /// [`DrawingContext::fill_text`].
    FillText {
        /// Text run.
        text: String,
        /// Baseline origin.
        origin: Point,
        /// Font size.
        font_size: f64,
        /// Text color.
        color: Rgba8,
    },
    /// [`DrawingContext::draw_image`].
    DrawImage {
        /// Backend image handle.
        image: ImageId,
        /// Destination rectangle.
        rect: Rect,
    },
}

/// A [`DrawingContext`] that records calls instead of rasterizing them.
///
/// Besides the raw command list it tracks the current transform, so callers can
/// ask where a draw landed in device space.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    transform: Affine,
    stack: Vec<Affine>,
    /// Device-space bounding boxes of fills and strokes, in call order.
    painted: Vec<Rect>,
}

impl DisplayList {
    /// Create an empty display list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in call order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Device-space bounds of every recorded fill and stroke.
    pub fn painted_bounds(&self) -> &[Rect] {
        &self.painted
    }

    /// The transform that the next draw call would use.
    pub fn current_transform(&self) -> Affine {
        self.transform
    }

    /// Number of fill and stroke calls.
    pub fn draw_count(&self) -> usize {
        self.painted.len()
    }

    /// Drop all recorded state.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.stack.clear();
        self.painted.clear();
        self.transform = Affine::IDENTITY;
    }

    fn record_painted(&mut self, local: Rect) {
        self.painted.push(self.transform.transform_rect_bbox(local));
    }
}

impl DrawingContext for DisplayList {
    fn save(&mut self) {
        self.stack.push(self.transform);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.transform = t;
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.transform = self.transform * affine;
        self.commands.push(DrawCommand::Transform(affine));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::ClipRect(rect));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::ClearRect(rect));
    }

    fn fill_path(&mut self, path: &BezPath, color: Rgba8) {
        self.record_painted(path.control_box());
        self.commands.push(DrawCommand::FillPath {
            path: path.clone(),
            color,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, color: Rgba8, width: f64) {
        self.record_painted(path.control_box().inflate(width * 0.5, width * 0.5));
        self.commands.push(DrawCommand::StrokePath {
            path: path.clone(),
            color,
            width,
        });
    }

    fn fill_text(&mut self, text: &str, origin: Point, font_size: f64, color: Rgba8) {
        self.commands.push(DrawCommand::FillText {
            text: String::from(text),
            origin,
            font_size,
            color,
        });
    }

    fn draw_image(&mut self, image: ImageId, rect: Rect) {
        self.commands.push(DrawCommand::DrawImage { image, rect });
    }
}

/// Paint `scene` into `ctx` according to a frame's [`Repaint`] decision.
///
/// - [`Repaint::Clean`] draws nothing.
/// - [`Repaint::Full`] clips to the viewport, clears it and paints every visible node.
/// - [`Repaint::Partial`] handles each region in turn: clip, clear, then paint the
///   visible nodes whose world bounds intersect the region. Ancestors are still
///   traversed so transforms stay balanced.
///
/// Nodes are painted depth-first in child order, so later siblings and descendants
/// draw over earlier ones. Each node is translated by its position before its kind's
/// `paint_self` runs.
pub fn paint(scene: &Scene, ctx: &mut dyn DrawingContext, repaint: &Repaint, viewport: Size) {
    let Some(root) = scene.root() else {
        return;
    };
    let full = viewport.to_rect();
    match repaint {
        Repaint::Clean => {}
        Repaint::Full => {
            ctx.save();
            ctx.clip_rect(full);
            ctx.clear_rect(full);
            paint_node(scene, ctx, root, Vec2::ZERO, None);
            ctx.restore();
        }
        Repaint::Partial(regions) => {
            for &region in regions {
                ctx.save();
                ctx.clip_rect(region);
                ctx.clear_rect(region);
                paint_node(scene, ctx, root, Vec2::ZERO, Some(region));
                ctx.restore();
            }
        }
    }
}

fn paint_node(
    scene: &Scene,
    ctx: &mut dyn DrawingContext,
    id: NodeId,
    parent_origin: Vec2,
    region: Option<Rect>,
) {
    let Some(node) = scene.get(id) else {
        return;
    };
    if !node.props.flags.contains(NodeFlags::VISIBLE) {
        return;
    }
    let offset = node.props.position.to_vec2();
    let origin = parent_origin + offset;
    ctx.save();
    ctx.transform(Affine::translate(offset));
    let world = Rect::from_origin_size(origin.to_point(), node.size);
    if region.is_none_or(|r| intersects(world, r))
        && let Some(kind) = node.kind.as_deref()
    {
        kind.paint_self(ctx, node.size);
    }
    for &child in &node.children {
        paint_node(scene, ctx, child, origin, region);
    }
    ctx.restore();
}

/// Interior intersection: shared edges do not count.
fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}
