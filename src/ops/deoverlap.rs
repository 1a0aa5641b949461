use geo::{Area, Polygon};
use serde::Serialize;
use tracing::{debug, warn};

use super::normalize::normalize;
use super::single_part::{largest_member, to_single_part};
use crate::domain::Shape;
use crate::geometry::PrecisionOptimizer;
use crate::kernel::GeometryKernel;
use crate::wkt::serialize_polygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeoverlapStatus {
    /// Overlapped nothing before it
    Unchanged,
    Trimmed,
    /// Earlier outputs cover it completely; emitted as given
    Covered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeoverlapStep {
    pub index: usize,
    #[serde(serialize_with = "serialize_polygon")]
    pub polygon: Polygon<f64>,
    pub overlaps_removed: usize,
    pub status: DeoverlapStatus,
}

/// Subtract every earlier output from each polygon so no two outputs overlap.
///
/// Chain clipping only subtracts the immediate predecessor; this pass looks
/// at all of them. Cardinality is preserved.
pub fn remove_overlaps<K: GeometryKernel>(
    kernel: &K,
    polygons: &[Polygon<f64>],
    optimizer: Option<&PrecisionOptimizer>,
) -> Vec<DeoverlapStep> {
    let mut steps: Vec<DeoverlapStep> = Vec::with_capacity(polygons.len());

    for (i, polygon) in polygons.iter().enumerate() {
        let mut current = polygon.clone();
        let mut overlaps_removed = 0;
        let mut covered = false;

        for earlier in &steps {
            let prev = Shape::Polygon(earlier.polygon.clone());
            let cur = Shape::Polygon(current.clone());
            if !kernel.intersects(&cur, &prev) {
                continue;
            }
            let (minuend, subtrahend) = match optimizer {
                Some(opt) => (
                    normalize(kernel, &opt.optimize(&cur)),
                    normalize(kernel, &opt.optimize(&prev)),
                ),
                None => (cur, prev),
            };
            let difference = normalize(kernel, &kernel.difference(&minuend, &subtrahend));
            let next = match &difference {
                Shape::Polygon(p) => Some(p.clone()),
                Shape::MultiPolygon(mp) => largest_member(&mp.0).cloned(),
                Shape::Degenerate(_) => None,
            };
            match next {
                Some(p) if p.unsigned_area() > 0.0 => {
                    current = p;
                    overlaps_removed += 1;
                }
                _ => {
                    covered = true;
                    break;
                }
            }
        }

        let status = if covered {
            warn!(index = i + 1, "polygon fully covered by earlier outputs, keeping it as is");
            current = polygon.clone();
            DeoverlapStatus::Covered
        } else if overlaps_removed > 0 {
            DeoverlapStatus::Trimmed
        } else {
            DeoverlapStatus::Unchanged
        };
        debug!(index = i + 1, overlaps_removed, ?status, "overlap pass");

        steps.push(DeoverlapStep {
            index: i + 1,
            polygon: to_single_part(kernel, &Shape::Polygon(current)),
            overlaps_removed,
            status,
        });
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GeoKernel;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    #[test]
    fn test_empty_and_single() {
        assert!(remove_overlaps(&GeoKernel, &[], None).is_empty());
        let steps = remove_overlaps(&GeoKernel, &[square(0.0, 0.0, 1.0)], None);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, DeoverlapStatus::Unchanged);
    }

    #[test]
    fn test_removes_overlap_with_non_adjacent_earlier() {
        // the third square overlaps the first but not the second
        let polygons = [square(0.0, 0.0, 2.0), square(5.0, 5.0, 1.0), square(1.0, 0.0, 2.0)];
        let steps = remove_overlaps(&GeoKernel, &polygons, Some(&PrecisionOptimizer::default()));
        assert_eq!(steps[1].status, DeoverlapStatus::Unchanged);
        assert_eq!(steps[2].status, DeoverlapStatus::Trimmed);
        assert_eq!(steps[2].overlaps_removed, 1);
        assert!((steps[2].polygon.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_covered_polygon_is_kept() {
        let polygons = [square(0.0, 0.0, 4.0), square(1.0, 1.0, 1.0)];
        let steps = remove_overlaps(&GeoKernel, &polygons, None);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].status, DeoverlapStatus::Covered);
        assert_eq!(steps[1].polygon, polygons[1]);
    }

    #[test]
    fn test_outputs_do_not_overlap() {
        let polygons = [square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0), square(0.5, 0.5, 2.0)];
        let steps = remove_overlaps(&GeoKernel, &polygons, None);
        for i in 0..steps.len() {
            for j in (i + 1)..steps.len() {
                let a = Shape::Polygon(steps[i].polygon.clone());
                let b = Shape::Polygon(steps[j].polygon.clone());
                assert!(GeoKernel.intersection_area(&a, &b) < 1e-9);
            }
        }
    }
}
