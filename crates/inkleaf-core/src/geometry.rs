//! Normalized-space geometry.
//!
//! Page content is stored in `[0,1]` coordinates and only converted to pixels
//! at the edges (pointer input, hit radii, rasterization).

use kurbo::Point;

/// Reference page width in dp. Density is pixels per dp at this width.
pub const REFERENCE_WIDTH_DP: f64 = 360.0;

/// Pixel size of the surface a page is shown on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMetrics {
    pub width: f64,
    pub height: f64,
    /// Pixels per dp.
    pub density: f64,
}

impl CanvasMetrics {
    /// Metrics with an explicit density.
    pub fn new(width: f64, height: f64, density: f64) -> Self {
        Self { width, height, density }
    }

    /// Metrics whose density scales with the page width, as used for
    /// thumbnails and exports.
    pub fn for_page_width(width: f64, height: f64) -> Self {
        Self { width, height, density: width / REFERENCE_WIDTH_DP }
    }

    /// Whether either side is zero (canvas not laid out yet).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert dp to pixels.
    pub fn dp(&self, value: f64) -> f64 {
        value * self.density
    }
}

/// Convert a pixel position to normalized page space.
///
/// A zero-sized canvas maps everything to the origin.
pub fn normalize(pixel: Point, canvas: &CanvasMetrics) -> Point {
    if canvas.is_empty() {
        return Point::ZERO;
    }
    Point::new(pixel.x / canvas.width, pixel.y / canvas.height)
}

/// Convert a normalized position to pixels.
pub fn denormalize(point: Point, canvas: &CanvasMetrics) -> Point {
    Point::new(point.x * canvas.width, point.y * canvas.height)
}

/// Clamp both coordinates of a point into `[0,1]`.
pub fn clamp_unit(point: Point) -> Point {
    Point::new(point.x.clamp(0.0, 1.0), point.y.clamp(0.0, 1.0))
}

/// Even-odd point-in-polygon test.
///
/// A small epsilon in the edge denominator keeps horizontal edges finite.
/// Polygons with fewer than 3 vertices contain nothing.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        let crosses = (pi.y > point.y) != (pj.y > point.y);
        if crosses && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y + 0.0001) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from a point to the segment `a`-`b`.
pub fn distance_point_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Axis-aligned rectangle in normalized space, given by its edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl NormalizedRect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle of an item given by origin and size.
    pub fn from_item(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { left: x, top: y, right: x + width, bottom: y + height }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Grow to include a point.
    pub fn include_point(&mut self, point: Point) {
        self.left = self.left.min(point.x);
        self.top = self.top.min(point.y);
        self.right = self.right.max(point.x);
        self.bottom = self.bottom.max(point.y);
    }

    /// Grow to include another rectangle.
    pub fn include_rect(&mut self, other: &NormalizedRect) {
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
    }

    /// Clamp every edge into `[0,1]`.
    pub fn clamped(&self) -> Self {
        Self {
            left: self.left.clamp(0.0, 1.0),
            top: self.top.clamp(0.0, 1.0),
            right: self.right.clamp(0.0, 1.0),
            bottom: self.bottom.clamp(0.0, 1.0),
        }
    }

    /// The sample points used by lasso selection: the four corners then
    /// the center.
    pub fn sample_points(&self) -> [Point; 5] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.left, self.bottom),
            Point::new(self.right, self.bottom),
            self.center(),
        ]
    }

    /// Pixel-space rectangle for this normalized one.
    pub fn to_pixels(&self, canvas: &CanvasMetrics) -> kurbo::Rect {
        kurbo::Rect::new(
            self.left * canvas.width,
            self.top * canvas.height,
            self.right * canvas.width,
            self.bottom * canvas.height,
        )
    }
}
