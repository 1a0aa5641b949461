use geo::{Area, Polygon};
use tracing::debug;

use crate::domain::Shape;
use crate::kernel::GeometryKernel;

/// Reduce any shape to exactly one polygon.
///
/// - Polygon: repaired when invalid; a multi-part repair keeps its
///   largest member (first one wins ties)
/// - MultiPolygon with one member: that member, repaired; still multi-part
///   after repair collapses to the convex hull
/// - MultiPolygon with several (or zero) members: convex hull of the set
/// - Degenerate: convex hull
///
/// Applying it twice gives the same result as applying it once.
pub fn to_single_part<K: GeometryKernel>(kernel: &K, shape: &Shape) -> Polygon<f64> {
    match shape {
        Shape::Polygon(p) => reduce_polygon(kernel, p),
        Shape::MultiPolygon(mp) if mp.0.len() == 1 => {
            let member = Shape::Polygon(mp.0[0].clone());
            if kernel.is_valid(&member) {
                return mp.0[0].clone();
            }
            match kernel.make_valid(&member) {
                Shape::Polygon(p) => p,
                other => {
                    debug!(kind = other.kind(), "single-member repair stayed multi-part, using hull");
                    kernel.convex_hull(&other)
                }
            }
        }
        Shape::MultiPolygon(_) => {
            debug!(members = shape.member_count(), "collapsing multipolygon to convex hull");
            kernel.convex_hull(shape)
        }
        Shape::Degenerate(_) => kernel.convex_hull(shape),
    }
}

fn reduce_polygon<K: GeometryKernel>(kernel: &K, polygon: &Polygon<f64>) -> Polygon<f64> {
    let shape = Shape::Polygon(polygon.clone());
    if kernel.is_valid(&shape) {
        return polygon.clone();
    }
    match kernel.make_valid(&shape) {
        Shape::Polygon(p) => p,
        Shape::MultiPolygon(mp) => match largest_member(&mp.0) {
            Some(p) => p.clone(),
            None => kernel.convex_hull(&shape),
        },
        Shape::Degenerate(_) => kernel.convex_hull(&shape),
    }
}

/// Largest-area member; the earliest wins on equal areas
pub(crate) fn largest_member(members: &[Polygon<f64>]) -> Option<&Polygon<f64>> {
    members.iter().fold(None, |best: Option<&Polygon<f64>>, p| match best {
        Some(b) if b.unsigned_area() >= p.unsigned_area() => Some(b),
        _ => Some(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GeoKernel;
    use crate::wkt::read_wkt;
    use geo::{Coord, Geometry, LineString, Point};

    fn shape(text: &str) -> Shape {
        read_wkt(text).unwrap()
    }

    #[test]
    fn test_valid_polygon_passes_through() {
        let s = shape("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
        assert_eq!(Shape::Polygon(to_single_part(&GeoKernel, &s)), s);
    }

    #[test]
    fn test_single_member_multipolygon_is_extracted() {
        let s = shape("MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)))");
        let p = to_single_part(&GeoKernel, &s);
        assert_eq!(p, shape("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").polygons()[0]);
    }

    #[test]
    fn test_multi_member_collapses_to_hull() {
        let s = shape("MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((5 5, 6 5, 6 6, 5 6, 5 5)))");
        let p = to_single_part(&GeoKernel, &s);
        // Hull spans both squares: 2 unit squares plus the band between them
        assert!((p.unsigned_area() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_polygon_keeps_largest_part() {
        // Figure-eight with a 2x2 lobe and a 1x1 lobe
        let s = shape("POLYGON ((0 0, 2 0, 2 2, 3 2, 3 3, 2 3, 2 2, 0 2, 0 0))");
        let p = to_single_part(&GeoKernel, &s);
        assert!((p.unsigned_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_bowtie_tie_takes_first_part() {
        let s = shape("POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))");
        let p = to_single_part(&GeoKernel, &s);
        assert!((p.unsigned_area() - 1.0).abs() < 1e-9);
        assert!(GeoKernel.is_valid(&Shape::Polygon(p)));
    }

    #[test]
    fn test_degenerate_becomes_hull() {
        let s = shape("POLYGON ((0 0, 1 1, 2 2, 0 0))");
        let p = to_single_part(&GeoKernel, &s);
        assert!(p.unsigned_area().abs() < 1e-12);
        assert_eq!(
            p.exterior().0,
            vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 }, Coord { x: 0.0, y: 0.0 }]
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))",
            "POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))",
            "POLYGON ((0 0, 2 0, 2 2, 3 2, 3 3, 2 3, 2 2, 0 2, 0 0))",
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((5 5, 6 5, 6 6, 5 6, 5 5)))",
            "MULTIPOLYGON (((0 0, 2 2, 2 0, 0 2, 0 0)))",
        ];
        for text in inputs {
            let once = to_single_part(&GeoKernel, &shape(text));
            let twice = to_single_part(&GeoKernel, &Shape::Polygon(once.clone()));
            assert_eq!(once, twice, "not idempotent for {}", text);
        }
    }

    #[test]
    fn test_idempotent_on_degenerate_input() {
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let inputs = [
            shape("POLYGON ((0 0, 1 1, 2 2, 0 0))"),
            shape("POLYGON ((0 0, 3 1, 0 0, 0 0))"),
            Shape::Degenerate(Geometry::LineString(line)),
            Shape::Degenerate(Geometry::Point(Point::new(4.0, 5.0))),
            Shape::empty(),
        ];
        for input in inputs {
            let once = to_single_part(&GeoKernel, &input);
            let twice = to_single_part(&GeoKernel, &Shape::Polygon(once.clone()));
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }
}
