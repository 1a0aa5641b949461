//! Validity checks for polygons and multipolygons
//!
//! Mirrors the usual simple-features rules:
//! - rings have at least three distinct vertices and finite coordinates
//! - rings do not self-intersect and enclose non-zero area
//! - holes lie inside the shell and neither cross it nor each other
//! - multipolygon members do not overlap

use std::fmt;

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, BooleanOps, Coord, Intersects, Line, LineString, MultiPolygon, Polygon};
use serde::Serialize;

use crate::domain::Shape;

/// Ring index 0 is the exterior, holes follow from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValidityIssue {
    NonFiniteCoordinate { ring: usize },
    TooFewPoints { ring: usize },
    SelfIntersection { ring: usize },
    ZeroArea { ring: usize },
    HoleOutsideShell { ring: usize },
    HoleCrossesShell { ring: usize },
    HolesOverlap { first: usize, second: usize },
    MembersOverlap { first: usize, second: usize },
}

impl fmt::Display for ValidityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityIssue::NonFiniteCoordinate { ring } => {
                write!(f, "ring {} has NaN/Inf coordinates", ring)
            }
            ValidityIssue::TooFewPoints { ring } => {
                write!(f, "ring {} has fewer than 3 distinct points", ring)
            }
            ValidityIssue::SelfIntersection { ring } => write!(f, "ring {} self-intersects", ring),
            ValidityIssue::ZeroArea { ring } => write!(f, "ring {} encloses no area", ring),
            ValidityIssue::HoleOutsideShell { ring } => {
                write!(f, "hole {} lies outside the shell", ring)
            }
            ValidityIssue::HoleCrossesShell { ring } => {
                write!(f, "hole {} crosses the shell", ring)
            }
            ValidityIssue::HolesOverlap { first, second } => {
                write!(f, "holes {} and {} overlap", first, second)
            }
            ValidityIssue::MembersOverlap { first, second } => {
                write!(f, "members {} and {} overlap", first, second)
            }
        }
    }
}

/// Relative overlap area tolerated between multipolygon members
const MEMBER_OVERLAP_RATIO: f64 = 1e-9;

/// Distinct ring vertices: consecutive duplicates and the closing point removed
pub fn ring_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in &ring.0 {
        if vertices.last() != Some(c) {
            vertices.push(*c);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

fn ring_segments(vertices: &[Coord<f64>]) -> Vec<Line<f64>> {
    let n = vertices.len();
    (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect()
}

fn is_simple(vertices: &[Coord<f64>]) -> bool {
    let segments = ring_segments(vertices);
    let n = segments.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return false,
            }
        }
    }
    true
}

/// True when any pair of segments from the two rings crosses properly or
/// shares a collinear stretch. Single-point touches are allowed.
fn rings_cross(a: &[Coord<f64>], b: &[Coord<f64>]) -> bool {
    let segs_a = ring_segments(a);
    let segs_b = ring_segments(b);
    segs_a.iter().any(|sa| {
        segs_b.iter().any(|sb| match line_intersection(*sa, *sb) {
            Some(LineIntersection::SinglePoint { is_proper, .. }) => is_proper,
            Some(LineIntersection::Collinear { .. }) => true,
            None => false,
        })
    })
}

/// Position of the first vertex of `ring` that is not on the boundary of
/// `container`; `None` when every vertex touches the boundary.
fn interior_position(ring: &[Coord<f64>], container: &Polygon<f64>) -> Option<CoordPos> {
    ring.iter()
        .map(|c| container.coordinate_position(c))
        .find(|pos| *pos != CoordPos::OnBoundary)
}

fn ring_issue(ring: &LineString<f64>, index: usize) -> Option<ValidityIssue> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Some(ValidityIssue::NonFiniteCoordinate { ring: index });
    }
    let vertices = ring_vertices(ring);
    if vertices.len() < 3 {
        return Some(ValidityIssue::TooFewPoints { ring: index });
    }
    if !is_simple(&vertices) {
        return Some(ValidityIssue::SelfIntersection { ring: index });
    }
    if Polygon::new(ring.clone(), vec![]).unsigned_area() <= 0.0 {
        return Some(ValidityIssue::ZeroArea { ring: index });
    }
    None
}

/// Check a single polygon. An empty polygon is valid.
pub fn polygon_issues(polygon: &Polygon<f64>) -> Vec<ValidityIssue> {
    let mut issues = Vec::new();
    if polygon.exterior().0.is_empty() {
        return issues;
    }

    if let Some(issue) = ring_issue(polygon.exterior(), 0) {
        // Hole checks need a sound shell
        issues.push(issue);
        return issues;
    }
    let shell_vertices = ring_vertices(polygon.exterior());
    let shell = Polygon::new(polygon.exterior().clone(), vec![]);

    let mut holes: Vec<(usize, Vec<Coord<f64>>, Polygon<f64>)> = Vec::new();
    for (i, hole) in polygon.interiors().iter().enumerate() {
        let ring = i + 1;
        if let Some(issue) = ring_issue(hole, ring) {
            issues.push(issue);
            continue;
        }
        let vertices = ring_vertices(hole);
        if rings_cross(&shell_vertices, &vertices) {
            issues.push(ValidityIssue::HoleCrossesShell { ring });
            continue;
        }
        if interior_position(&vertices, &shell) == Some(CoordPos::Outside) {
            issues.push(ValidityIssue::HoleOutsideShell { ring });
            continue;
        }
        holes.push((ring, vertices, Polygon::new(hole.clone(), vec![])));
    }

    for (a, (ring_a, verts_a, poly_a)) in holes.iter().enumerate() {
        for (ring_b, verts_b, poly_b) in holes.iter().skip(a + 1) {
            let nested = interior_position(verts_a, poly_b) == Some(CoordPos::Inside)
                || interior_position(verts_b, poly_a) == Some(CoordPos::Inside);
            if nested || rings_cross(verts_a, verts_b) {
                issues.push(ValidityIssue::HolesOverlap {
                    first: *ring_a,
                    second: *ring_b,
                });
            }
        }
    }

    issues
}

fn member_overlaps(members: &[Polygon<f64>]) -> Vec<ValidityIssue> {
    let mut issues = Vec::new();
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if !members[i].intersects(&members[j]) {
                continue;
            }
            let a = MultiPolygon::new(vec![members[i].clone()]);
            let b = MultiPolygon::new(vec![members[j].clone()]);
            let overlap = a.intersection(&b).unsigned_area();
            let smaller = members[i]
                .unsigned_area()
                .min(members[j].unsigned_area());
            if overlap > smaller * MEMBER_OVERLAP_RATIO {
                issues.push(ValidityIssue::MembersOverlap {
                    first: i + 1,
                    second: j + 1,
                });
            }
        }
    }
    issues
}

pub fn shape_issues(shape: &Shape) -> Vec<ValidityIssue> {
    match shape {
        Shape::Polygon(p) => polygon_issues(p),
        Shape::MultiPolygon(mp) => {
            let mut issues: Vec<ValidityIssue> = mp.0.iter().flat_map(polygon_issues).collect();
            if issues.is_empty() {
                issues = member_overlaps(&mp.0);
            }
            issues
        }
        // Collapsed output has no area to be invalid about
        Shape::Degenerate(_) => Vec::new(),
    }
}
