use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::domain::Shape;

/// Largest number of decimals that still survives an f64 round trip
const MAX_DIGITS: u32 = 15;

/// Snaps coordinates to a fixed number of decimals before boolean operations.
///
/// Nearly-coincident vertices and edges produced by floating-point noise are
/// what make subtraction leave slivers; rounding them onto the same grid
/// lets the kernel see the overlap exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionOptimizer {
    digits: u32,
    tolerance: f64,
}

impl Default for PrecisionOptimizer {
    fn default() -> Self {
        Self {
            digits: 12,
            tolerance: 1e-12,
        }
    }
}

impl PrecisionOptimizer {
    pub fn new(digits: u32, tolerance: f64) -> Self {
        Self {
            digits: digits.min(MAX_DIGITS),
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.digits as i32);
        let rounded = (value * factor).round() / factor;
        if rounded.is_finite() { rounded } else { value }
    }

    /// Round, drop points within tolerance of their predecessor, re-close.
    ///
    /// Rings left with fewer than 4 coordinates are returned unchanged.
    pub fn optimize_ring(&self, ring: &LineString<f64>) -> LineString<f64> {
        let mut kept: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
        for c in &ring.0 {
            let rounded = Coord {
                x: self.round(c.x),
                y: self.round(c.y),
            };
            let keep = match kept.last() {
                Some(prev) => (rounded.x - prev.x).hypot(rounded.y - prev.y) > self.tolerance,
                None => true,
            };
            if keep {
                kept.push(rounded);
            }
        }

        if kept.len() >= 3 && kept.first() != kept.last() {
            let first = kept[0];
            kept.push(first);
        }
        if kept.len() < 4 {
            return ring.clone();
        }
        LineString::new(kept)
    }

    pub fn optimize_polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.optimize_ring(polygon.exterior()),
            polygon
                .interiors()
                .iter()
                .map(|hole| self.optimize_ring(hole))
                .collect(),
        )
    }

    /// Degenerate shapes pass through untouched
    pub fn optimize(&self, shape: &Shape) -> Shape {
        match shape {
            Shape::Polygon(p) => Shape::Polygon(self.optimize_polygon(p)),
            Shape::MultiPolygon(mp) => Shape::MultiPolygon(MultiPolygon::new(
                mp.0.iter().map(|p| self.optimize_polygon(p)).collect(),
            )),
            Shape::Degenerate(_) => shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_digits() {
        let opt = PrecisionOptimizer::new(3, 1e-12);
        let ring = LineString::from(vec![
            (0.12345, 0.0),
            (1.0, 0.00049),
            (1.0, 1.0),
            (0.12345, 0.0),
        ]);
        let out = opt.optimize_ring(&ring);
        assert_eq!(out.0[0], Coord { x: 0.123, y: 0.0 });
        assert_eq!(out.0[1], Coord { x: 1.0, y: 0.0 });
    }

    #[test]
    fn test_drops_near_duplicates_and_recloses() {
        let opt = PrecisionOptimizer::new(12, 1e-6);
        let ring = LineString::from(vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 0.0000001),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]);
        let out = opt.optimize_ring(&ring);
        assert_eq!(out.0.len(), 5);
        assert_eq!(out.0.first(), out.0.last());
    }

    #[test]
    fn test_collapsed_ring_kept_as_is() {
        let opt = PrecisionOptimizer::new(0, 1e-12);
        let ring = LineString::from(vec![(0.1, 0.1), (0.2, 0.1), (0.2, 0.2), (0.1, 0.1)]);
        assert_eq!(opt.optimize_ring(&ring), ring);
    }

    #[test]
    fn test_digits_are_capped() {
        assert_eq!(PrecisionOptimizer::new(40, 0.0).digits(), MAX_DIGITS);
    }

    #[test]
    fn test_default_keeps_ordinary_coordinates() {
        let opt = PrecisionOptimizer::default();
        let shape = crate::wkt::read_wkt(
            "POLYGON ((111.91148257205967 21.81428867475205, 111.9062586542288 21.814253848633175, 111.90636313258541 21.809413018109908, 111.91148257205967 21.81428867475205))",
        )
        .unwrap();
        let out = opt.optimize(&shape);
        let c = out.polygons()[0].exterior().0[0];
        assert!((c.x - 111.91148257205967).abs() < 1e-11);
        assert!((c.y - 21.81428867475205).abs() < 1e-11);
    }
}
