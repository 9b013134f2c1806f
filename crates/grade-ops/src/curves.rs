//! Piecewise-linear tone curves.

use crate::CurvePoint;

/// A sorted piecewise-linear curve over `[0, 1]`.
///
/// Inputs left of the first point take its `y`, inputs right of the last
/// point take the last `y`. An empty curve is the identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Builds a curve, sorting points by `x`.
    pub fn new(points: &[CurvePoint]) -> Self {
        let mut points: Vec<CurvePoint> = points
            .iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .copied()
            .collect();
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { points }
    }

    /// Whether the curve leaves every input in `[0, 1]` unchanged.
    pub fn is_identity(&self) -> bool {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return true;
        };
        first.x <= 0.0 && last.x >= 1.0 && self.points.iter().all(|p| (p.x - p.y).abs() < 1e-6)
    }

    /// Evaluates the curve at `x`.
    pub fn eval(&self, x: f32) -> f32 {
        let pts = &self.points;
        let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
            return x;
        };
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }

        // first index with p.x > x; 1..len because of the bounds above
        let hi = pts.partition_point(|p| p.x <= x);
        let (a, b) = (pts[hi - 1], pts[hi]);
        let span = b.x - a.x;
        if span <= f32::EPSILON {
            return b.y;
        }
        a.y + (x - a.x) / span * (b.y - a.y)
    }
}
