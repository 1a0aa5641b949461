use geo::{Geometry, GeometryCollection, Polygon};
use serde::Serialize;
use tracing::{debug, warn};

use super::single_part::to_single_part;
use crate::domain::Shape;
use crate::kernel::GeometryKernel;
use crate::wkt::serialize_polygon;

/// How a merged polygon was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Only one input; it was reduced on its own
    SinglePart,
    /// The union formed one connected region
    Union,
    /// The union was disconnected or empty, so its convex hull was used
    ConvexHull,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    #[serde(serialize_with = "serialize_polygon")]
    pub polygon: Polygon<f64>,
    pub method: MergeMethod,
}

/// Union every shape into one polygon.
///
/// Intersection between the inputs is not required: a disconnected union
/// falls back to its convex hull. Returns `None` for empty input.
pub fn merge<K: GeometryKernel>(kernel: &K, shapes: &[Shape]) -> Option<MergeOutcome> {
    match shapes {
        [] => None,
        [only] => Some(MergeOutcome {
            polygon: to_single_part(kernel, only),
            method: MergeMethod::SinglePart,
        }),
        _ => Some(merge_many(kernel, shapes)),
    }
}

fn merge_many<K: GeometryKernel>(kernel: &K, shapes: &[Shape]) -> MergeOutcome {
    let union = kernel.union(shapes);
    debug!(inputs = shapes.len(), result = union.kind(), members = union.member_count(), "union computed");

    if kernel.is_empty(&union) {
        warn!("union of {} shapes is empty, using hull of all inputs", shapes.len());
        return MergeOutcome {
            polygon: kernel.convex_hull(&collect(shapes)),
            method: MergeMethod::ConvexHull,
        };
    }

    match union {
        Shape::Polygon(_) => MergeOutcome {
            polygon: to_single_part(kernel, &union),
            method: MergeMethod::Union,
        },
        Shape::MultiPolygon(_) | Shape::Degenerate(_) => {
            warn!(
                members = union.member_count(),
                "merged result is not a single region, using convex hull"
            );
            MergeOutcome {
                polygon: kernel.convex_hull(&union),
                method: MergeMethod::ConvexHull,
            }
        }
    }
}

/// Every input as one collection, so the hull covers all of their points
fn collect(shapes: &[Shape]) -> Shape {
    let members: Vec<Geometry<f64>> = shapes.iter().map(Shape::to_geometry).collect();
    Shape::Degenerate(Geometry::GeometryCollection(GeometryCollection(members)))
}
