//! Coordinate transforms between native document space and display space.
//!
//! Every rectangle in the crate lives in the **native coordinate space** of
//! its source document: pixels for raster images, points for PDF pages, with
//! the origin at the top-left. Two conversions leave that space, both done
//! here and nowhere else:
//!
//! * scaling into a display space of a different size (per-axis
//!   `display / native` factors — never draw native units onto a scaled
//!   canvas), and
//! * flipping into PDF page space, whose origin is bottom-left
//!   (`pdfY = pageHeight − (y + height)`).
//!
//! Extraction services report regions as corner pairs in no guaranteed
//! order, so construction normalises with min/abs rather than trusting
//! which corner comes first.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in a document's native coordinate space.
///
/// `x`/`y` is the top-left corner; width and height are non-negative by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Build a rectangle from two corner points, in either order.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the rectangle covers no area.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Scale each axis independently.
    pub fn scale(&self, sx: f32, sy: f32) -> Rect {
        Rect {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Map a native-space rectangle into a display space of a different
    /// size. Each axis is scaled by `display / native` on its own.
    pub fn to_display(&self, native: (f32, f32), display: (f32, f32)) -> Rect {
        let sx = if native.0 > 0.0 { display.0 / native.0 } else { 0.0 };
        let sy = if native.1 > 0.0 { display.1 / native.1 } else { 0.0 };
        self.scale(sx, sy)
    }

    /// Clamp the rectangle into `[0, width] × [0, height]`.
    ///
    /// Out-of-bounds and degenerate inputs come back clipped, never
    /// rejected; a rectangle entirely outside the bounds collapses to a
    /// zero-area rectangle on the nearest edge.
    pub fn clip(&self, width: f32, height: f32) -> Rect {
        let x0 = self.x.clamp(0.0, width);
        let y0 = self.y.clamp(0.0, height);
        let x1 = self.right().clamp(0.0, width);
        let y1 = self.bottom().clamp(0.0, height);
        Rect::from_corners(x0, y0, x1, y1)
    }

    /// Flip into PDF page space (origin bottom-left): the returned `y` is
    /// the *bottom* edge of the box measured from the page bottom.
    pub fn pdf_flip_y(&self, page_height: f32) -> Rect {
        Rect {
            x: self.x,
            y: page_height - (self.y + self.height),
            width: self.width,
            height: self.height,
        }
    }
}
