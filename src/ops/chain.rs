use geo::{Area, Polygon};
use serde::Serialize;
use tracing::debug;

use super::normalize::normalize;
use super::single_part::to_single_part;
use crate::domain::Shape;
use crate::geometry::PrecisionOptimizer;
use crate::kernel::GeometryKernel;
use crate::wkt::serialize_polygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// First element, only reduced
    First,
    /// Did not touch the previous output
    Disjoint,
    Clipped,
    /// Entirely inside the previous output; emitted unclipped
    FullyCovered,
}

/// One output of a chain clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStep {
    /// 1-based position in the input
    pub index: usize,
    #[serde(serialize_with = "serialize_polygon")]
    pub polygon: Polygon<f64>,
    pub status: StepStatus,
    pub area: f64,
}

/// Subtract each shape's predecessor *output* from it, in order.
///
/// Produces exactly one step per input. Every output is a single polygon, and
/// the reference for step `i` is step `i - 1`'s output, never the original
/// input `i - 1`.
pub fn chain_clip<K: GeometryKernel>(
    kernel: &K,
    shapes: &[Shape],
    optimizer: Option<&PrecisionOptimizer>,
) -> Vec<ChainStep> {
    let Some((first, rest)) = shapes.split_first() else {
        return Vec::new();
    };

    let mut steps = Vec::with_capacity(shapes.len());
    let mut previous = to_single_part(kernel, first);
    steps.push(step(1, previous.clone(), StepStatus::First));

    for (offset, current) in rest.iter().enumerate() {
        let index = offset + 2;
        let prev_shape = Shape::Polygon(previous.clone());

        let (polygon, status) = if !kernel.intersects(&prev_shape, current) {
            (to_single_part(kernel, current), StepStatus::Disjoint)
        } else {
            let (minuend, subtrahend) = match optimizer {
                Some(opt) => (
                    normalize(kernel, &opt.optimize(current)),
                    normalize(kernel, &opt.optimize(&prev_shape)),
                ),
                None => (current.clone(), prev_shape),
            };
            let difference = normalize(kernel, &kernel.difference(&minuend, &subtrahend));
            if kernel.is_empty(&difference) {
                (to_single_part(kernel, current), StepStatus::FullyCovered)
            } else {
                (to_single_part(kernel, &difference), StepStatus::Clipped)
            }
        };
        debug!(index, ?status, "chain step");

        previous = polygon.clone();
        steps.push(step(index, polygon, status));
    }

    steps
}

fn step(index: usize, polygon: Polygon<f64>, status: StepStatus) -> ChainStep {
    ChainStep {
        index,
        area: polygon.unsigned_area(),
        polygon,
        status,
    }
}
