// Copyright 2025 the Cyan Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use cyan_index::Aabb2D;
use kurbo::Rect;

pub(crate) fn rect_to_aabb(r: Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn aabb_to_rect(a: Aabb2D<f64>) -> Rect {
    Rect::new(a.min_x, a.min_y, a.max_x, a.max_y)
}

/// No area, inverted, or NaN.
pub(crate) fn is_degenerate(r: Rect) -> bool {
    !(r.x1 > r.x0 && r.y1 > r.y0)
}
