use crate::foundation::core::{Affine, Point, Rect};

/// Mutable axis-aligned bounds accumulated in a shared coordinate space.
///
/// `matrix` is applied to everything added through [`Bounds::add_frame`], [`Bounds::add_rect`]
/// and [`Bounds::add_bounds`]. An empty accumulator has `min = +inf` and `max = -inf`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub matrix: Affine,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            matrix: Affine::IDENTITY,
        }
    }
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            matrix: Affine::IDENTITY,
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }

    /// Reset to the empty state. The attached matrix is reset to identity as well.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn is_valid(&self) -> bool {
        self.min_x + self.min_y != f64::INFINITY
    }

    /// True when both extents are strictly positive.
    pub fn is_positive(&self) -> bool {
        self.max_x - self.min_x > 0.0 && self.max_y - self.min_y > 0.0
    }

    pub fn min(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn rect(&self) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Add the four corners of `(x0, y0, x1, y1)` transformed by the attached matrix.
    pub fn add_frame(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> &mut Self {
        let m = self.matrix;
        self.add_frame_with(x0, y0, x1, y1, m)
    }

    pub fn add_frame_with(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, m: Affine) -> &mut Self {
        for corner in [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ] {
            let p = m * corner;
            self.min_x = self.min_x.min(p.x);
            self.min_y = self.min_y.min(p.y);
            self.max_x = self.max_x.max(p.x);
            self.max_y = self.max_y.max(p.y);
        }
        self
    }

    pub fn add_rect(&mut self, rect: Rect) -> &mut Self {
        self.add_frame(rect.x0, rect.y0, rect.x1, rect.y1)
    }

    /// Add another bounds' rectangle, transformed by this accumulator's matrix.
    pub fn add_bounds(&mut self, other: &Bounds) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        self.add_frame(other.min_x, other.min_y, other.max_x, other.max_y)
    }

    /// Re-express the current rectangle through `m` (axis-aligned hull of the transformed corners).
    pub fn apply_matrix(&mut self, m: Affine) -> &mut Self {
        if self.is_empty() {
            return self;
        }
        let (x0, y0, x1, y1) = (self.min_x, self.min_y, self.max_x, self.max_y);
        let matrix = self.matrix;
        *self = Self {
            matrix,
            ..Self::default()
        };
        self.add_frame_with(x0, y0, x1, y1, m)
    }

    /// Clamp to `left..right` horizontally and `top..bottom` vertically.
    pub fn fit(&mut self, left: f64, right: f64, top: f64, bottom: f64) -> &mut Self {
        if self.min_x < left {
            self.min_x = left;
        }
        if self.max_x > right {
            self.max_x = right;
        }
        if self.min_y < top {
            self.min_y = top;
        }
        if self.max_y > bottom {
            self.max_y = bottom;
        }
        self
    }

    pub fn pad(&mut self, padding: f64) -> &mut Self {
        self.min_x -= padding;
        self.max_x += padding;
        self.min_y -= padding;
        self.max_y += padding;
        self
    }

    pub fn scale(&mut self, s: f64) -> &mut Self {
        self.min_x *= s;
        self.min_y *= s;
        self.max_x *= s;
        self.max_y *= s;
        self
    }

    /// Snap outward to integer coordinates.
    pub fn ceil(&mut self) -> &mut Self {
        if !self.is_valid() {
            return self;
        }
        self.min_x = self.min_x.floor();
        self.min_y = self.min_y.floor();
        self.max_x = self.max_x.ceil();
        self.max_y = self.max_y.ceil();
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/bounds.rs"]
mod tests;
