//! Make-valid for polygonal shapes
//!
//! # Algorithm
//! 1. Clean each ring: drop NaN/Inf points and consecutive duplicates
//! 2. Node the ring at every self-intersection (crossings and collinear overlaps)
//! 3. Split the noded ring into simple loops wherever a vertex repeats
//! 4. Union the shell loops, union the hole loops, subtract holes from shell
//!
//! A ring whose loops all enclose zero area collapses to a line.

use geo::line_intersection::{LineIntersection, line_intersection};
use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Coord, Geometry, Line, LineString, MultiPolygon, Point, Polygon};

use super::validity::ring_vertices;
use crate::domain::Shape;

pub fn repair(shape: &Shape) -> Shape {
    match shape {
        Shape::Polygon(p) => repair_polygon(p),
        Shape::MultiPolygon(mp) => {
            let repaired: Vec<Polygon<f64>> = mp
                .0
                .iter()
                .flat_map(|p| repair_polygon(p).polygons())
                .collect();
            if repaired.is_empty() && !mp.0.is_empty() {
                return collapse(&mp.0[0]);
            }
            // Union also resolves members that overlapped each other
            Shape::from_multi(union_polygons(repaired))
        }
        Shape::Degenerate(_) => shape.clone(),
    }
}

fn repair_polygon(polygon: &Polygon<f64>) -> Shape {
    if polygon.exterior().0.is_empty() {
        return Shape::empty();
    }

    let shell_loops = ring_loops(polygon.exterior());
    if shell_loops.is_empty() {
        return collapse(polygon);
    }
    let shell = merge_loops(shell_loops);

    let hole_loops: Vec<Polygon<f64>> = polygon.interiors().iter().flat_map(ring_loops).collect();
    let result = if hole_loops.is_empty() {
        shell
    } else {
        shell.difference(&merge_loops(hole_loops))
    };

    if result.0.is_empty() {
        return collapse(polygon);
    }
    Shape::from_multi(result)
}

/// Zero-area leftovers of a polygon, kept as a line or point
fn collapse(polygon: &Polygon<f64>) -> Shape {
    let vertices: Vec<Coord<f64>> = ring_vertices(polygon.exterior())
        .into_iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect();
    match vertices.len() {
        0 => Shape::empty(),
        1 => Shape::Degenerate(Geometry::Point(Point::from(vertices[0]))),
        _ => Shape::Degenerate(Geometry::LineString(LineString::new(vertices))),
    }
}

/// Loops that only touch stay separate members; overlapping ones are unioned
fn merge_loops(loops: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let overlapping = loops.iter().enumerate().any(|(i, a)| {
        loops.iter().skip(i + 1).any(|b| {
            let a = MultiPolygon::new(vec![a.clone()]);
            let b = MultiPolygon::new(vec![b.clone()]);
            a.intersection(&b).unsigned_area() > 0.0
        })
    });
    if overlapping {
        union_polygons(loops)
    } else {
        MultiPolygon::new(loops)
    }
}

pub(crate) fn union_polygons(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut iter = polygons.into_iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(Vec::new());
    };
    iter.fold(MultiPolygon::new(vec![first]), |acc, p| {
        acc.union(&MultiPolygon::new(vec![p]))
    })
}

/// Simple, counter-clockwise loops with non-zero area traced out of one ring
fn ring_loops(ring: &LineString<f64>) -> Vec<Polygon<f64>> {
    let vertices: Vec<Coord<f64>> = ring_vertices(ring)
        .into_iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect();
    if vertices.len() < 3 {
        return Vec::new();
    }

    split_loops(&node_ring(&vertices))
        .into_iter()
        .filter(|lp| lp.len() >= 4)
        .map(|lp| Polygon::new(LineString::new(lp), vec![]))
        .filter(|p| p.unsigned_area() > 0.0)
        .map(|p| p.orient(Direction::Default))
        .collect()
}

fn param_along(segment: &Line<f64>, c: Coord<f64>) -> f64 {
    let d = segment.delta();
    let len_sq = d.x * d.x + d.y * d.y;
    if len_sq == 0.0 {
        return 0.0;
    }
    ((c.x - segment.start.x) * d.x + (c.y - segment.start.y) * d.y) / len_sq
}

/// Insert every intersection point into the segments it lies on.
///
/// The same computed coordinate goes into both segments so later vertex
/// matching can use exact equality.
fn node_ring(vertices: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let segments: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect();
    let mut splits: Vec<Vec<Coord<f64>>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            let points = match line_intersection(segments[i], segments[j]) {
                None => continue,
                Some(LineIntersection::SinglePoint { intersection, .. }) => vec![intersection],
                Some(LineIntersection::Collinear { intersection }) => {
                    vec![intersection.start, intersection.end]
                }
            };
            for p in points {
                for k in [i, j] {
                    let seg = segments[k];
                    if p != seg.start && p != seg.end {
                        splits[k].push(p);
                    }
                }
            }
        }
    }

    let mut noded = Vec::with_capacity(n * 2);
    for (i, seg) in segments.iter().enumerate() {
        noded.push(seg.start);
        let mut extra = std::mem::take(&mut splits[i]);
        extra.sort_by(|a, b| param_along(seg, *a).total_cmp(&param_along(seg, *b)));
        for p in extra {
            if noded.last() != Some(&p) {
                noded.push(p);
            }
        }
    }
    noded
}

/// Cut a noded vertex walk into closed loops at every revisited vertex
fn split_loops(noded: &[Coord<f64>]) -> Vec<Vec<Coord<f64>>> {
    let mut stack: Vec<Coord<f64>> = Vec::with_capacity(noded.len());
    let mut loops = Vec::new();

    for &c in noded {
        match stack.iter().position(|s| *s == c) {
            Some(k) => {
                let mut lp: Vec<Coord<f64>> = stack.drain(k..).collect();
                lp.push(c);
                loops.push(lp);
                stack.push(c);
            }
            None => stack.push(c),
        }
    }

    if stack.len() >= 3 {
        let first = stack[0];
        stack.push(first);
        loops.push(stack);
    }
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::validity::shape_issues;
    use crate::wkt::read_wkt;

    fn repaired(text: &str) -> Shape {
        repair(&read_wkt(text).unwrap())
    }

    #[test]
    fn test_bowtie_splits_into_two_triangles() {
        let shape = repaired("POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))");
        assert_eq!(shape.member_count(), 2);
        let area = shape.to_multi_polygon().unsigned_area();
        assert!((area - 2.0).abs() < 1e-9, "area was {}", area);
        assert!(shape_issues(&shape).is_empty());
    }

    #[test]
    fn test_valid_polygon_keeps_area() {
        let shape = repaired("POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 2, 1 1))");
        assert!(matches!(shape, Shape::Polygon(_)));
        let area = shape.to_multi_polygon().unsigned_area();
        assert!((area - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_ring_collapses_to_line() {
        let shape = repaired("POLYGON ((0 0, 1 1, 2 2, 0 0))");
        assert!(matches!(shape, Shape::Degenerate(Geometry::LineString(_))));
    }

    #[test]
    fn test_overlapping_members_are_unioned() {
        let shape =
            repaired("MULTIPOLYGON (((0 0, 2 0, 2 2, 0 2, 0 0)), ((1 1, 3 1, 3 3, 1 3, 1 1)))");
        assert!(matches!(shape, Shape::Polygon(_)));
        let area = shape.to_multi_polygon().unsigned_area();
        assert!((area - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_loops_figure_eight() {
        let a = Coord { x: 0.0, y: 0.0 };
        let x = Coord { x: 1.0, y: 1.0 };
        let b = Coord { x: 2.0, y: 2.0 };
        let c = Coord { x: 2.0, y: 0.0 };
        let d = Coord { x: 0.0, y: 2.0 };
        let loops = split_loops(&[a, x, b, c, x, d]);
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0], vec![x, b, c, x]);
        assert_eq!(loops[1], vec![a, x, d, a]);
    }

    #[test]
    fn test_node_ring_inserts_crossing() {
        let ring = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 2.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 0.0, y: 2.0 },
        ];
        let noded = node_ring(&ring);
        assert_eq!(noded.len(), 6);
        assert_eq!(noded[1], Coord { x: 1.0, y: 1.0 });
        assert_eq!(noded[4], Coord { x: 1.0, y: 1.0 });
    }
}
