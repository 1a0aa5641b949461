use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, Polygon};
use serde::Serialize;

use crate::domain::Shape;
use crate::kernel::GeometryKernel;

/// Two 1-based input positions whose shapes intersect
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntersectingPair {
    pub first: usize,
    pub second: usize,
    pub area: f64,
}

/// Result of an all-pairs intersection scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionReport {
    pub has_intersection: bool,
    /// `None` when fewer than two shapes were supplied
    pub pairs: Option<Vec<IntersectingPair>>,
    /// One line per intersecting pair, or a single explanatory line
    pub details: Vec<String>,
}

impl IntersectionReport {
    pub fn is_checked(&self) -> bool {
        self.pairs.is_some()
    }
}

/// Check every pair of shapes for intersection.
///
/// All-pairs O(n²): the pipeline works on batches of tens of polygons.
pub fn detect_intersections<K: GeometryKernel>(kernel: &K, shapes: &[Shape]) -> IntersectionReport {
    if shapes.len() < 2 {
        return IntersectionReport {
            has_intersection: false,
            pairs: None,
            details: vec![format!(
                "at least 2 polygons are required to detect intersections, got {}",
                shapes.len()
            )],
        };
    }

    let mut pairs = Vec::new();
    let mut details = Vec::new();
    for i in 0..shapes.len() {
        for j in (i + 1)..shapes.len() {
            if !kernel.intersects(&shapes[i], &shapes[j]) {
                continue;
            }
            let area = kernel.intersection_area(&shapes[i], &shapes[j]).max(0.0);
            details.push(format!(
                "POLYGON {} intersects POLYGON {} (intersection area: {:.6})",
                i + 1,
                j + 1,
                area
            ));
            pairs.push(IntersectingPair {
                first: i + 1,
                second: j + 1,
                area,
            });
        }
    }

    if pairs.is_empty() {
        details.push(format!(
            "checked {} polygons, none of them intersect",
            shapes.len()
        ));
    }

    IntersectionReport {
        has_intersection: !pairs.is_empty(),
        pairs: Some(pairs),
        details,
    }
}

/// Coincident vertices and shared edges between two shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapAnalysis {
    pub intersects: bool,
    pub intersection_area: f64,
    /// Vertices of `a` within tolerance of a vertex of `b`
    pub shared_vertices: usize,
    /// Edges of `a` overlapping an edge of `b` along a stretch longer than tolerance
    pub shared_edges: usize,
}

impl OverlapAnalysis {
    /// Touching boundaries are what leave zero-area slivers after subtraction
    pub fn has_boundary_contact(&self) -> bool {
        self.shared_vertices > 0 || self.shared_edges > 0
    }
}

fn edges(polygon: &Polygon<f64>) -> impl Iterator<Item = Line<f64>> + '_ {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.lines())
}

fn vertices(polygon: &Polygon<f64>) -> impl Iterator<Item = Coord<f64>> + '_ {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| {
            // closing point repeats the first
            let n = ring.0.len().saturating_sub(1);
            ring.0.iter().take(n).copied()
        })
}

pub fn analyze_overlap<K: GeometryKernel>(
    kernel: &K,
    a: &Shape,
    b: &Shape,
    tolerance: f64,
) -> OverlapAnalysis {
    let intersects = kernel.intersects(a, b);
    let mut analysis = OverlapAnalysis {
        intersects,
        intersection_area: 0.0,
        shared_vertices: 0,
        shared_edges: 0,
    };
    if !intersects {
        return analysis;
    }
    analysis.intersection_area = kernel.intersection_area(a, b);

    let (polys_a, polys_b) = (a.polygons(), b.polygons());
    let verts_b: Vec<Coord<f64>> = polys_b.iter().flat_map(vertices).collect();
    let edges_b: Vec<Line<f64>> = polys_b.iter().flat_map(edges).collect();

    for pa in &polys_a {
        analysis.shared_vertices += vertices(pa)
            .filter(|va| {
                verts_b
                    .iter()
                    .any(|vb| (va.x - vb.x).abs() <= tolerance && (va.y - vb.y).abs() <= tolerance)
            })
            .count();

        analysis.shared_edges += edges(pa)
            .filter(|ea| {
                edges_b.iter().any(|eb| match line_intersection(*ea, *eb) {
                    Some(LineIntersection::Collinear { intersection }) => {
                        let d = intersection.delta();
                        d.x.hypot(d.y) > tolerance
                    }
                    _ => false,
                })
            })
            .count();
    }

    analysis
}
