use geo::Polygon;
use serde::Serialize;
use tracing::debug;

use super::intersect::{OverlapAnalysis, analyze_overlap};
use super::normalize::normalize;
use super::single_part::to_single_part;
use crate::domain::Shape;
use crate::geometry::PrecisionOptimizer;
use crate::kernel::GeometryKernel;
use crate::wkt::serialize_polygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    /// Boundary and target do not touch; the target came back unchanged
    Disjoint,
    Clipped,
    /// The boundary covers the whole target; the target came back unchanged
    FullyCovered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipOutcome {
    #[serde(serialize_with = "serialize_polygon")]
    pub polygon: Polygon<f64>,
    pub status: ClipStatus,
    pub intersection_area: f64,
    pub target_area: f64,
    pub result_area: f64,
    /// Contact between the unified boundary and target before subtraction
    pub overlap: OverlapAnalysis,
}

/// Collapse a shape to one polygonal operand: multi-member sets become their
/// exact union, degenerate shapes their hull.
pub(crate) fn unify<K: GeometryKernel>(kernel: &K, shape: &Shape) -> Shape {
    match shape {
        Shape::MultiPolygon(mp) if mp.0.len() > 1 => kernel.union(std::slice::from_ref(shape)),
        Shape::Polygon(_) | Shape::MultiPolygon(_) => shape.clone(),
        Shape::Degenerate(_) => Shape::Polygon(kernel.convex_hull(shape)),
    }
}

/// `target` minus `boundary`, reduced to one polygon.
///
/// When the subtraction leaves nothing, the reduced target is returned and
/// the outcome is marked [`ClipStatus::FullyCovered`].
pub fn clip<K: GeometryKernel>(
    kernel: &K,
    boundary: &Shape,
    target: &Shape,
    optimizer: Option<&PrecisionOptimizer>,
) -> ClipOutcome {
    let mut boundary = unify(kernel, boundary);
    let mut target = unify(kernel, target);
    if let Some(opt) = optimizer {
        boundary = normalize(kernel, &opt.optimize(&boundary));
        target = normalize(kernel, &opt.optimize(&target));
    }
    let target_area = kernel.area(&target);
    let tolerance = optimizer
        .map(PrecisionOptimizer::tolerance)
        .unwrap_or_else(|| PrecisionOptimizer::default().tolerance());
    let overlap = analyze_overlap(kernel, &boundary, &target, tolerance);

    if !overlap.intersects {
        let polygon = to_single_part(kernel, &target);
        return ClipOutcome {
            result_area: kernel.area(&Shape::Polygon(polygon.clone())),
            polygon,
            status: ClipStatus::Disjoint,
            intersection_area: 0.0,
            target_area,
            overlap,
        };
    }

    let difference = normalize(kernel, &kernel.difference(&target, &boundary));
    let (polygon, status) = if kernel.is_empty(&difference) {
        (to_single_part(kernel, &target), ClipStatus::FullyCovered)
    } else {
        (to_single_part(kernel, &difference), ClipStatus::Clipped)
    };
    debug!(
        ?status,
        intersection_area = overlap.intersection_area,
        target_area,
        shared_edges = overlap.shared_edges,
        "clipped target"
    );

    ClipOutcome {
        result_area: kernel.area(&Shape::Polygon(polygon.clone())),
        polygon,
        status,
        intersection_area: overlap.intersection_area,
        target_area,
        overlap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GeoKernel;
    use crate::wkt::read_wkt;

    fn shape(text: &str) -> Shape {
        read_wkt(text).unwrap()
    }

    #[test]
    fn test_difference_area_three() {
        let boundary = shape("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))");
        let target = shape("POLYGON ((1 1, 3 1, 3 3, 1 3, 1 1))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert_eq!(outcome.status, ClipStatus::Clipped);
        assert!((outcome.result_area - 3.0).abs() < 1e-9);
        assert!((outcome.intersection_area - 1.0).abs() < 1e-9);
        assert!((outcome.target_area - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_target_passes_through() {
        let boundary = shape("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
        let target = shape("POLYGON ((5 5, 6 5, 6 6, 5 6, 5 5))");
        let outcome = clip(&GeoKernel, &boundary, &target, Some(&PrecisionOptimizer::default()));
        assert_eq!(outcome.status, ClipStatus::Disjoint);
        assert_eq!(Shape::Polygon(outcome.polygon), target);
    }

    #[test]
    fn test_fully_covered_returns_target() {
        let boundary = shape("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");
        let target = shape("POLYGON ((1 1, 2 1, 2 2, 1 2, 1 1))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert_eq!(outcome.status, ClipStatus::FullyCovered);
        assert!((outcome.result_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_target_reduces_to_hull() {
        // vertical strip cuts the target into a 1-wide and a 2-wide piece
        let boundary = shape("POLYGON ((1 -1, 2 -1, 2 5, 1 5, 1 -1))");
        let target = shape("POLYGON ((0 0, 4 0, 4 1, 0 1, 0 0))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert_eq!(outcome.status, ClipStatus::Clipped);
        assert!((outcome.result_area - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_boundary_is_unified() {
        let boundary = shape(
            "MULTIPOLYGON (((0 0, 2 0, 2 2, 0 2, 0 0)), ((1 0, 3 0, 3 2, 1 2, 1 0)))",
        );
        let target = shape("POLYGON ((0 1, 3 1, 3 3, 0 3, 0 1))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert!((outcome.result_area - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_outcome_reports_overlap() {
        let boundary = shape("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))");
        let target = shape("POLYGON ((1 1, 3 1, 3 3, 1 3, 1 1))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert!(outcome.overlap.intersects);
        assert_eq!(outcome.overlap.intersection_area, outcome.intersection_area);
        assert_eq!(outcome.overlap.shared_edges, 0);
        assert!(!outcome.overlap.has_boundary_contact());
    }

    #[test]
    fn test_shared_edge_is_reported_as_contact() {
        // target sits on the boundary's right edge without covering area
        let boundary = shape("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
        let target = shape("POLYGON ((1 0, 2 0, 2 1, 1 1, 1 0))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert!(outcome.overlap.intersects);
        assert_eq!(outcome.overlap.shared_edges, 1);
        assert_eq!(outcome.overlap.shared_vertices, 2);
        assert!(outcome.overlap.has_boundary_contact());
        assert_eq!(outcome.status, ClipStatus::Clipped);
        assert!((outcome.result_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_overlap_is_empty() {
        let boundary = shape("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
        let target = shape("POLYGON ((5 5, 6 5, 6 6, 5 6, 5 5))");
        let outcome = clip(&GeoKernel, &boundary, &target, None);
        assert!(!outcome.overlap.intersects);
        assert!(!outcome.overlap.has_boundary_contact());
    }
}
