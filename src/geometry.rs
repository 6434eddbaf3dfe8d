//! # Geometry Utilities
//!
//! Axis-aligned rectangles, traced contours and the minimum-area rectangle used
//! by skew estimation, auto-cropping and region detection.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` image.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Smallest rectangle enclosing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Grows the rectangle by `padding` on every side, then clamps it to a
    /// `image_width` x `image_height` frame.
    ///
    /// The origin is clamped first and the size is then limited to what is left
    /// of the frame, so the result never leaves the image and never has a
    /// negative origin.
    pub fn pad_and_clamp(&self, padding: u32, image_width: u32, image_height: u32) -> Rect {
        let x = self.x.saturating_sub(padding).min(image_width);
        let y = self.y.saturating_sub(padding).min(image_height);
        let width = (image_width - x).min(self.width.saturating_add(2 * padding));
        let height = (image_height - y).min(self.height.saturating_add(2 * padding));
        Rect::new(x, y, width, height)
    }

    /// Whether the rectangle lies entirely within a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Converts to an `imageproc` rectangle for drawing; `None` for empty rectangles.
    pub fn to_imageproc(&self) -> Option<imageproc::rect::Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(imageproc::rect::Rect::at(self.x as i32, self.y as i32).of_size(self.width, self.height))
    }
}

impl From<Rect> for (u32, u32, u32, u32) {
    fn from(rect: Rect) -> Self {
        (rect.x, rect.y, rect.width, rect.height)
    }
}

/// Traced outer boundary of a connected foreground region.
///
/// Points are ordered along the boundary; the last point connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area enclosed by the boundary polygon (shoelace formula over pixel centers).
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Axis-aligned bounding rectangle; spans are inclusive of both end pixels.
    pub fn bounding_rect(&self) -> Rect {
        bounding_rect(&self.points)
    }
}

/// Traces the outermost borders of a binary image.
///
/// Non-zero pixels are foreground. Only outer borders without a parent are
/// kept, so holes and shapes nested inside other shapes are skipped. Order is
/// the raster order in which borders are first met.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Absolute area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }

    twice_area.abs() as f64 / 2.0
}

/// Bounding rectangle of a point set, with inclusive pixel spans.
///
/// Negative coordinates are clamped to zero. An empty set yields an empty rectangle.
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::new(0, 0, 0, 0);
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let min_x = min_x.max(0);
    let min_y = min_y.max(0);
    let max_x = max_x.max(min_x);
    let max_y = max_y.max(min_y);

    Rect::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}

/// Rotated rectangle of minimum area enclosing a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinAreaRect {
    pub center: (f64, f64),
    /// Extent along the direction given by `angle`
    pub width: f64,
    /// Extent perpendicular to `angle`
    pub height: f64,
    /// Orientation in degrees, in `[-90, 0)`
    pub angle: f64,
}

/// Convex hull by Andrew's monotone chain. Collinear points are dropped.
pub fn convex_hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut sorted: Vec<Point<i32>> = points.to_vec();
    sorted.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    fn cross(o: &Point<i32>, a: &Point<i32>, b: &Point<i32>) -> i64 {
        (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
    }

    let mut hull: Vec<Point<i32>> = Vec::with_capacity(sorted.len() * 2);

    for p in &sorted {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(*p);
    }

    let lower_len = hull.len() + 1;
    for p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(*p);
    }

    hull.pop();
    hull
}

/// Computes the minimum-area enclosing rectangle with rotating calipers over
/// the convex hull.
///
/// The angle follows the `[-90, 0)` convention: the rectangle is invariant
/// under quarter turns, so the edge direction is shifted by multiples of 90°
/// (swapping width and height) until it lands in that range.
///
/// # Errors
///
/// Returns `PipelineError::Geometry` for an empty point set.
pub fn min_area_rect(points: &[Point<i32>]) -> Result<MinAreaRect, PipelineError> {
    if points.is_empty() {
        return Err(PipelineError::Geometry(
            "minimum-area rectangle of an empty point set".to_string(),
        ));
    }

    let hull = convex_hull(points);

    if hull.len() == 1 {
        let p = hull[0];
        return Ok(MinAreaRect {
            center: (p.x as f64, p.y as f64),
            width: 0.0,
            height: 0.0,
            angle: -90.0,
        });
    }

    let n = hull.len();
    let mut best: Option<(f64, MinAreaRect)> = None;

    for i in 0..n {
        let origin = hull[i];
        let next = hull[(i + 1) % n];
        let edge_x = (next.x - origin.x) as f64;
        let edge_y = (next.y - origin.y) as f64;
        let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

        if edge_length < f64::EPSILON {
            continue;
        }

        let (nx, ny) = (edge_x / edge_length, edge_y / edge_length);
        let (px, py) = (-ny, nx);

        let mut min_n = f64::MAX;
        let mut max_n = f64::MIN;
        let mut min_p = f64::MAX;
        let mut max_p = f64::MIN;

        for point in &hull {
            let dx = (point.x - origin.x) as f64;
            let dy = (point.y - origin.y) as f64;
            let proj_n = nx * dx + ny * dy;
            let proj_p = px * dx + py * dy;
            min_n = min_n.min(proj_n);
            max_n = max_n.max(proj_n);
            min_p = min_p.min(proj_p);
            max_p = max_p.max(proj_p);
        }

        let width = max_n - min_n;
        let height = max_p - min_p;
        let area = width * height;

        if best.as_ref().is_some_and(|(best_area, _)| area >= *best_area) {
            continue;
        }

        let center_n = (min_n + max_n) / 2.0;
        let center_p = (min_p + max_p) / 2.0;
        let center = (
            origin.x as f64 + center_n * nx + center_p * px,
            origin.y as f64 + center_n * ny + center_p * py,
        );

        let (angle, width, height) = normalize_rect_angle(ny.atan2(nx).to_degrees(), width, height);

        best = Some((
            area,
            MinAreaRect {
                center,
                width,
                height,
                angle,
            },
        ));
    }

    best.map(|(_, rect)| rect).ok_or_else(|| {
        PipelineError::Geometry("minimum-area rectangle has no non-degenerate hull edge".to_string())
    })
}

/// Shifts an edge direction by quarter turns into `[-90, 0)`, swapping the
/// extents on every odd shift.
fn normalize_rect_angle(mut angle: f64, mut width: f64, mut height: f64) -> (f64, f64, f64) {
    while angle >= 0.0 {
        angle -= 90.0;
        std::mem::swap(&mut width, &mut height);
    }
    while angle < -90.0 {
        angle += 90.0;
        std::mem::swap(&mut width, &mut height);
    }
    (angle, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i32, y0: i32, side: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + side - 1, y0),
            Point::new(x0 + side - 1, y0 + side - 1),
            Point::new(x0, y0 + side - 1),
        ]
    }

    fn rotated_rect_points(cx: f64, cy: f64, w: f64, h: f64, degrees: f64) -> Vec<Point<i32>> {
        let theta = degrees.to_radians();
        let (s, c) = theta.sin_cos();
        let mut points = Vec::new();
        let steps = 60;
        for i in 0..=steps {
            for j in 0..=steps {
                let u = -w / 2.0 + w * i as f64 / steps as f64;
                let v = -h / 2.0 + h * j as f64 / steps as f64;
                let x = cx + u * c - v * s;
                let y = cy + u * s + v * c;
                points.push(Point::new(x.round() as i32, y.round() as i32));
            }
        }
        points
    }

    #[test]
    fn test_rect_union_and_edges() {
        let a = Rect::new(10, 10, 5, 5);
        let b = Rect::new(30, 2, 10, 4);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(10, 2, 30, 13));
        assert_eq!(u.right(), 40);
        assert_eq!(u.bottom(), 15);
    }

    #[test]
    fn test_pad_and_clamp_interior() {
        let rect = Rect::new(100, 100, 50, 40);
        assert_eq!(rect.pad_and_clamp(10, 500, 300), Rect::new(90, 90, 70, 60));
    }

    #[test]
    fn test_pad_and_clamp_at_edges() {
        let rect = Rect::new(3, 0, 495, 300);
        let padded = rect.pad_and_clamp(10, 500, 300);
        assert_eq!(padded.x, 0);
        assert_eq!(padded.y, 0);
        assert!(padded.fits_within(500, 300));
        assert_eq!(padded.width, 500);
        assert_eq!(padded.height, 300);
    }

    #[test]
    fn test_bounding_rect_is_inclusive() {
        let rect = bounding_rect(&square(100, 100, 100));
        assert_eq!(rect, Rect::new(100, 100, 100, 100));
    }

    #[test]
    fn test_polygon_area_square() {
        let contour = Contour::new(square(0, 0, 11));
        assert_eq!(contour.area(), 100.0);
    }

    #[test]
    fn test_polygon_area_degenerate() {
        assert_eq!(polygon_area(&[Point::new(1, 1), Point::new(5, 5)]), 0.0);
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let mut points = square(0, 0, 10);
        points.push(Point::new(4, 4));
        points.push(Point::new(5, 0));
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(4, 4)));
    }

    #[test]
    fn test_external_contours_skip_nested_shapes() {
        let mut img = GrayImage::new(60, 60);
        for y in 10..50 {
            for x in 10..50 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        // Hole with an island inside it
        for y in 20..40 {
            for x in 20..40 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        for y in 27..33 {
            for x in 27..33 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }

        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bounding_rect(), Rect::new(10, 10, 40, 40));
    }

    #[test]
    fn test_external_contours_empty_image() {
        assert!(external_contours(&GrayImage::new(20, 20)).is_empty());
    }

    #[test]
    fn test_min_area_rect_empty_is_geometry_error() {
        let result = min_area_rect(&[]);
        assert!(matches!(result, Err(PipelineError::Geometry(_))));
    }

    #[test]
    fn test_min_area_rect_single_point() {
        let rect = min_area_rect(&[Point::new(3, 4)]).unwrap();
        assert_eq!(rect.center, (3.0, 4.0));
        assert_eq!(rect.angle, -90.0);
    }

    #[test]
    fn test_min_area_rect_axis_aligned_angle_in_range() {
        let rect = min_area_rect(&square(10, 10, 50)).unwrap();
        assert!(rect.angle >= -90.0 && rect.angle < 0.0);
        assert!(rect.angle == -90.0 || rect.angle.abs() < 1e-9);
        assert!((rect.width * rect.height - 49.0 * 49.0).abs() < 1e-6);
    }

    #[test]
    fn test_min_area_rect_recovers_rotation() {
        for degrees in [-40.0, -15.0, 10.0, 25.0] {
            let points = rotated_rect_points(200.0, 150.0, 160.0, 60.0, degrees);
            let rect = min_area_rect(&points).unwrap();
            assert!(rect.angle >= -90.0 && rect.angle < 0.0);

            // Same orientation modulo quarter turns
            let diff = (rect.angle - degrees).rem_euclid(90.0);
            let diff = diff.min(90.0 - diff);
            assert!(diff < 2.0, "expected {degrees}, got {}", rect.angle);
        }
    }
}
