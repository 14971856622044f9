// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node behavior: the [`NodeKind`] trait, the [`LayoutCx`] it lays out through, and
//! the built-in kinds.

use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

use kurbo::{Circle as KurboCircle, Point, Shape, Size};

use crate::constraints::Constraints;
use crate::paint::{DrawingContext, Rgba8};
use crate::tree::Scene;
use crate::types::NodeId;

/// Tolerance used when flattening shapes into paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Per-kind layout and paint behavior attached to a scene node.
pub trait NodeKind: Any + Debug {
    /// Compute the node's natural size under `constraints`, laying out and
    /// positioning children through `cx` as needed.
    ///
    /// The scene clamps the returned size into `constraints` afterwards.
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size;

    /// Draw the node in its local space, where `(0, 0)` is its top-left corner.
    fn paint_self(&self, ctx: &mut dyn DrawingContext, size: Size);
}

/// The view of the scene a node kind gets during [`NodeKind::perform_layout`].
///
/// It can read the node's properties and lay out or move the node's own children,
/// but it cannot change tree structure or mark other nodes dirty.
#[derive(Debug)]
pub struct LayoutCx<'a> {
    scene: &'a mut Scene,
    node: NodeId,
}

impl<'a> LayoutCx<'a> {
    pub(crate) fn new(scene: &'a mut Scene, node: NodeId) -> Self {
        Self { scene, node }
    }

    /// The node being laid out.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Children of the node, in paint order.
    pub fn children(&self) -> Vec<NodeId> {
        self.scene.children_of(self.node).to_vec()
    }

    /// The node's preferred width, if any.
    pub fn preferred_width(&self) -> Option<f64> {
        self.scene
            .get(self.node)
            .and_then(|n| n.props.preferred_width)
    }

    /// The node's preferred height, if any.
    pub fn preferred_height(&self) -> Option<f64> {
        self.scene
            .get(self.node)
            .and_then(|n| n.props.preferred_height)
    }

    /// Lay out a child and return its committed size.
    ///
    /// Ids that are not children of this node are ignored and report [`Size::ZERO`].
    pub fn layout_child(&mut self, child: NodeId, constraints: Constraints) -> Size {
        if self.scene.parent_of(child) != Some(self.node) {
            return Size::ZERO;
        }
        self.scene.layout_unchecked(child, constraints)
    }

    /// Move a child to `position` in this node's space.
    ///
    /// The child's current area is recorded as damage before it moves.
    pub fn position_child(&mut self, child: NodeId, position: Point) {
        if self.scene.parent_of(child) != Some(self.node) {
            return;
        }
        self.scene.move_node(child, position);
    }

    /// Size of a child as of its last layout.
    pub fn child_size(&self, child: NodeId) -> Size {
        self.scene.size(child).unwrap_or(Size::ZERO)
    }
}

/// Lay every child out loosely inside `size`, leaving positions alone.
fn layout_children_loose(cx: &mut LayoutCx<'_>, size: Size) {
    for child in cx.children() {
        cx.layout_child(child, Constraints::loose(size));
    }
}

/// Preferred size per axis, otherwise the constraint minimum.
fn preferred_or_min(cx: &LayoutCx<'_>, constraints: Constraints) -> Size {
    Size::new(
        cx.preferred_width().unwrap_or(constraints.min_width),
        cx.preferred_height().unwrap_or(constraints.min_height),
    )
}

/// A filled, optionally stroked, rectangle.
///
/// Its size is the preferred size, or the constraint minimum. Children are laid
/// out loosely inside it and keep their own positions. The stroke is drawn inside
/// the box, never wider than its shorter side.
#[derive(Clone, Debug, PartialEq)]
pub struct Rectangle {
    /// Fill color.
    pub fill: Rgba8,
    /// Optional stroke color and width.
    pub stroke: Option<(Rgba8, f64)>,
}

impl Rectangle {
    /// A rectangle with the given fill and no stroke.
    pub fn new(fill: Rgba8) -> Self {
        Self { fill, stroke: None }
    }

    /// Add a stroke.
    pub fn with_stroke(mut self, color: Rgba8, width: f64) -> Self {
        self.stroke = Some((color, width));
        self
    }
}

impl NodeKind for Rectangle {
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size {
        let size = constraints.constrain(preferred_or_min(cx, constraints));
        layout_children_loose(cx, size);
        size
    }

    fn paint_self(&self, ctx: &mut dyn DrawingContext, size: Size) {
        let rect = size.to_rect();
        ctx.fill_path(&rect.to_path(PATH_TOLERANCE), self.fill);
        if let Some((color, width)) = self.stroke {
            // Inset so the stroke stays inside the node box, which is all damage covers.
            let width = width.min(size.min_side());
            if width > 0.0 {
                let inner = rect.inflate(-width * 0.5, -width * 0.5);
                ctx.stroke_path(&inner.to_path(PATH_TOLERANCE), color, width);
            }
        }
    }
}

/// A filled circle inscribed in the node's box.
///
/// Its natural size is the diameter on both axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Circle {
    /// Radius used for the natural size.
    pub radius: f64,
    /// Fill color.
    pub fill: Rgba8,
}

impl Circle {
    /// A circle of the given radius and fill.
    pub fn new(radius: f64, fill: Rgba8) -> Self {
        Self { radius, fill }
    }
}

impl NodeKind for Circle {
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size {
        let diameter = self.radius.max(0.0) * 2.0;
        let natural = Size::new(
            cx.preferred_width().unwrap_or(diameter),
            cx.preferred_height().unwrap_or(diameter),
        );
        let size = constraints.constrain(natural);
        layout_children_loose(cx, size);
        size
    }

    fn paint_self(&self, ctx: &mut dyn DrawingContext, size: Size) {
        let r = size.min_side() * 0.5;
        if r <= 0.0 {
            return;
        }
        let circle = KurboCircle::new((size.width * 0.5, size.height * 0.5), r);
        ctx.fill_path(&circle.to_path(PATH_TOLERANCE), self.fill);
    }
}

/// A block of text measured with a fixed advance per character.
///
/// Each char advances `0.6 × font_size` and each line takes `1.2 × font_size`;
/// real shaping belongs to the backend. Text does not wrap.
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    /// Content; `\n` separates lines.
    pub text: String,
    /// Font size in scene units.
    pub font_size: f64,
    /// Text color.
    pub color: Rgba8,
}

impl Text {
    /// Horizontal advance per character, as a fraction of the font size.
    pub const ADVANCE: f64 = 0.6;
    /// Line height, as a fraction of the font size.
    pub const LINE_HEIGHT: f64 = 1.2;

    /// Text with the given content, size and color.
    pub fn new(text: impl Into<String>, font_size: f64, color: Rgba8) -> Self {
        Self {
            text: text.into(),
            font_size,
            color,
        }
    }

    /// Measured size of the text block.
    pub fn measure(&self) -> Size {
        let mut lines = 0_usize;
        let mut widest = 0_usize;
        for line in self.text.split('\n') {
            lines += 1;
            widest = widest.max(line.chars().count());
        }
        Size::new(
            widest as f64 * Self::ADVANCE * self.font_size,
            lines as f64 * Self::LINE_HEIGHT * self.font_size,
        )
    }
}

impl NodeKind for Text {
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size {
        let natural = self.measure();
        constraints.constrain(Size::new(
            cx.preferred_width().unwrap_or(natural.width),
            cx.preferred_height().unwrap_or(natural.height),
        ))
    }

    fn paint_self(&self, ctx: &mut dyn DrawingContext, _size: Size) {
        let line_height = Self::LINE_HEIGHT * self.font_size;
        let mut baseline = self.font_size;
        for line in self.text.split('\n') {
            if !line.is_empty() {
                ctx.fill_text(line, Point::new(0.0, baseline), self.font_size, self.color);
            }
            baseline += line_height;
        }
    }
}

/// Main axis of a [`Stack`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Axis {
    /// Children flow left to right.
    Horizontal,
    /// Children flow top to bottom.
    #[default]
    Vertical,
}

/// A container that places children one after another along an axis.
///
/// Children get loose constraints: unbounded on the main axis and bounded by the
/// inner cross extent. The stack's natural size hugs its children plus padding.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Stack {
    /// Direction children flow in.
    pub axis: Axis,
    /// Space between consecutive children.
    pub gap: f64,
    /// Space between the stack's edge and its children, on all sides.
    pub padding: f64,
    /// Optional background fill.
    pub background: Option<Rgba8>,
}

impl Stack {
    /// A stack along `axis` with the given gap and no padding.
    pub fn new(axis: Axis, gap: f64) -> Self {
        Self {
            axis,
            gap,
            ..Self::default()
        }
    }

    /// Set the padding.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Set a background fill.
    pub fn with_background(mut self, color: Rgba8) -> Self {
        self.background = Some(color);
        self
    }
}

impl NodeKind for Stack {
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size {
        let pad = self.padding.max(0.0);
        let inner = constraints.deflate(pad * 2.0, pad * 2.0);
        let child_constraints = match self.axis {
            Axis::Horizontal => Constraints::new(0.0, f64::INFINITY, 0.0, inner.max_height),
            Axis::Vertical => Constraints::new(0.0, inner.max_width, 0.0, f64::INFINITY),
        };

        let mut main = 0.0_f64;
        let mut cross = 0.0_f64;
        for (i, child) in cx.children().into_iter().enumerate() {
            if i > 0 {
                main += self.gap;
            }
            let size = cx.layout_child(child, child_constraints);
            let position = match self.axis {
                Axis::Horizontal => Point::new(pad + main, pad),
                Axis::Vertical => Point::new(pad, pad + main),
            };
            cx.position_child(child, position);
            let (m, c) = match self.axis {
                Axis::Horizontal => (size.width, size.height),
                Axis::Vertical => (size.height, size.width),
            };
            main += m;
            cross = cross.max(c);
        }

        let content = match self.axis {
            Axis::Horizontal => Size::new(main, cross),
            Axis::Vertical => Size::new(cross, main),
        };
        Size::new(
            cx.preferred_width().unwrap_or(content.width + pad * 2.0),
            cx.preferred_height().unwrap_or(content.height + pad * 2.0),
        )
    }

    fn paint_self(&self, ctx: &mut dyn DrawingContext, size: Size) {
        if let Some(color) = self.background {
            ctx.fill_path(&size.to_rect().to_path(PATH_TOLERANCE), color);
        }
    }
}

/// A container that stacks every child on top of each other, filling its box.
///
/// The overlay takes its preferred size, else the largest size its constraints
/// allow (falling back to the minimum on unbounded axes). Each child receives
/// tight constraints equal to that size at the origin, which makes every child a
/// relayout boundary.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Overlay {
    /// Optional background fill.
    pub background: Option<Rgba8>,
}

impl NodeKind for Overlay {
    fn perform_layout(&mut self, cx: &mut LayoutCx<'_>, constraints: Constraints) -> Size {
        let biggest = |max: f64, min: f64| if max.is_finite() { max } else { min };
        let size = constraints.constrain(Size::new(
            cx.preferred_width()
                .unwrap_or_else(|| biggest(constraints.max_width, constraints.min_width)),
            cx.preferred_height()
                .unwrap_or_else(|| biggest(constraints.max_height, constraints.min_height)),
        ));
        for child in cx.children() {
            cx.layout_child(child, Constraints::tight(size));
            cx.position_child(child, Point::ZERO);
        }
        size
    }

    fn paint_self(&self, ctx: &mut dyn DrawingContext, size: Size) {
        if let Some(color) = self.background {
            ctx.fill_path(&size.to_rect().to_path(PATH_TOLERANCE), color);
        }
    }
}
