use std::cmp::Ordering;

use geo::{
    Area, BooleanOps, ConvexHull, Coord, CoordsIter, Intersects, LineString, MultiPoint, Point,
    Polygon,
};

use super::repair::{repair, union_polygons};
use super::validity::{ValidityIssue, shape_issues};
use super::GeometryKernel;
use crate::domain::Shape;

/// Kernel backed by the `geo` crate's boolean operations and hull
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoKernel;

impl GeoKernel {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for GeoKernel {
    fn validity_issues(&self, shape: &Shape) -> Vec<ValidityIssue> {
        shape_issues(shape)
    }

    fn make_valid(&self, shape: &Shape) -> Shape {
        repair(shape)
    }

    fn intersects(&self, a: &Shape, b: &Shape) -> bool {
        if self.is_empty(a) || self.is_empty(b) {
            return false;
        }
        a.to_geometry().intersects(&b.to_geometry())
    }

    fn intersection_area(&self, a: &Shape, b: &Shape) -> f64 {
        let (a, b) = (a.to_multi_polygon(), b.to_multi_polygon());
        if a.0.is_empty() || b.0.is_empty() {
            return 0.0;
        }
        a.intersection(&b).unsigned_area()
    }

    fn union(&self, shapes: &[Shape]) -> Shape {
        let polygons = shapes.iter().flat_map(Shape::polygons).collect();
        Shape::from_multi(union_polygons(polygons))
    }

    fn difference(&self, a: &Shape, b: &Shape) -> Shape {
        match a {
            // A line has no area to subtract from
            Shape::Degenerate(_) => a.clone(),
            Shape::Polygon(_) | Shape::MultiPolygon(_) => {
                let subtrahend = b.to_multi_polygon();
                if subtrahend.0.is_empty() {
                    return a.clone();
                }
                Shape::from_multi(a.to_multi_polygon().difference(&subtrahend))
            }
        }
    }

    fn convex_hull(&self, shape: &Shape) -> Polygon<f64> {
        let points: MultiPoint<f64> = shape
            .to_geometry()
            .coords_iter()
            .map(Point::from)
            .collect();
        if points.0.is_empty() {
            return Polygon::new(LineString::new(Vec::new()), Vec::new());
        }
        canonical_hull(points.convex_hull())
    }

    fn is_empty(&self, shape: &Shape) -> bool {
        match shape {
            Shape::Polygon(p) => p.exterior().0.is_empty(),
            Shape::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
            Shape::Degenerate(g) => g.coords_count() == 0,
        }
    }

    fn area(&self, shape: &Shape) -> f64 {
        shape.to_multi_polygon().unsigned_area()
    }
}

fn lowest(a: &Coord<f64>, b: &Coord<f64>) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

/// Start the hull ring at its lowest vertex (by x, then y).
///
/// A zero-area hull becomes the segment `lowest, highest, lowest`, so taking
/// the hull of a hull gives back the same ring.
fn canonical_hull(hull: Polygon<f64>) -> Polygon<f64> {
    let (exterior, _) = hull.into_inner();
    let mut coords = exterior.0;
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    let Some(start) = coords
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| lowest(a, b))
        .map(|(i, _)| i)
    else {
        return Polygon::new(LineString::new(coords), Vec::new());
    };

    let ring = if Polygon::new(LineString::new(coords.clone()), Vec::new()).unsigned_area() > 0.0 {
        coords.rotate_left(start);
        coords.push(coords[0]);
        coords
    } else {
        let low = coords[start];
        let high = coords
            .iter()
            .copied()
            .max_by(lowest)
            .unwrap_or(low);
        vec![low, high, low]
    };
    Polygon::new(LineString::new(ring), Vec::new())
}
