//! Geometric primitives for detection postprocessing.
//!
//! Axis-aligned rectangles, intersection-over-union, and non-maximum
//! suppression used by every region-producing detector.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundRect {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl BoundRect {
    /// Creates a rectangle from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the rectangle width (zero if degenerate).
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Returns the rectangle height (zero if degenerate).
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Returns the rectangle area.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns the shorter of width and height.
    pub fn min_side(&self) -> f32 {
        self.width().min(self.height())
    }

    /// Returns the intersection area with another rectangle.
    pub fn intersection(&self, other: &BoundRect) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }

    /// Returns the intersection-over-union with another rectangle.
    pub fn iou(&self, other: &BoundRect) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Clamps the rectangle to `[0, width] x [0, height]`.
    pub fn clamp(&self, width: f32, height: f32) -> BoundRect {
        BoundRect {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    /// Expands the rectangle by `margin` pixels on every side.
    pub fn expand(&self, margin: f32) -> BoundRect {
        BoundRect {
            x1: self.x1 - margin,
            y1: self.y1 - margin,
            x2: self.x2 + margin,
            y2: self.y2 + margin,
        }
    }
}

/// Greedy IoU-based non-maximum suppression.
///
/// Returns the indices of kept boxes, highest score first. Boxes overlapping
/// a kept box above `iou_threshold` are suppressed.
pub fn non_max_suppression(
    boxes: &[BoundRect],
    scores: &[f32],
    iou_threshold: f32,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());
    let order: Vec<usize> = (0..boxes.len().min(scores.len()))
        .sorted_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect();

    let mut kept: Vec<usize> = Vec::new();
    for &idx in &order {
        let suppressed = kept
            .iter()
            .any(|&k| boxes[k].iou(&boxes[idx]) > iou_threshold);
        if !suppressed {
            kept.push(idx);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = BoundRect::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundRect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_identical_is_one() {
        let a = BoundRect::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BoundRect::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundRect::new(5.0, 0.0, 15.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_score() {
        let boxes = vec![
            BoundRect::new(0.0, 0.0, 10.0, 10.0),
            BoundRect::new(1.0, 1.0, 11.0, 11.0),
            BoundRect::new(50.0, 50.0, 60.0, 60.0),
        ];
        let scores = vec![0.9, 0.8, 0.7];
        let kept = non_max_suppression(&boxes, &scores, 0.5);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_nms_keeps_all_when_disjoint() {
        let boxes = vec![
            BoundRect::new(0.0, 0.0, 10.0, 10.0),
            BoundRect::new(20.0, 0.0, 30.0, 10.0),
        ];
        let scores = vec![0.5, 0.9];
        let kept = non_max_suppression(&boxes, &scores, 0.4);
        assert_eq!(kept, vec![1, 0]);
    }

    #[test]
    fn test_clamp_limits_to_bounds() {
        let r = BoundRect::new(-5.0, -5.0, 700.0, 700.0).clamp(640.0, 480.0);
        assert_eq!(r, BoundRect::new(0.0, 0.0, 640.0, 480.0));
    }
}
