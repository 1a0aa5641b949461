//! Polygon operations, each generic over a [`GeometryKernel`].
//!
//! [`Pipeline`] bundles a kernel with [`PipelineConfig`] for callers that do
//! not want to thread both through every call.

pub mod chain;
pub mod clip;
pub mod deoverlap;
pub mod intersect;
pub mod merge;
pub mod normalize;
pub mod single_part;

use geo::Polygon;

use crate::domain::Shape;
use crate::geometry::PrecisionOptimizer;
use crate::kernel::{GeoKernel, GeometryKernel};

pub use chain::{ChainStep, StepStatus, chain_clip};
pub use clip::{ClipOutcome, ClipStatus, clip};
pub use deoverlap::{DeoverlapStatus, DeoverlapStep, remove_overlaps};
pub use intersect::{
    IntersectingPair, IntersectionReport, OverlapAnalysis, analyze_overlap, detect_intersections,
};
pub use merge::{MergeMethod, MergeOutcome, merge};
pub use normalize::normalize;
pub use single_part::to_single_part;

/// Settings that change operation results
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Snap coordinates before clipping; `None` disables it
    pub precision: Option<PrecisionOptimizer>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            precision: Some(PrecisionOptimizer::default()),
        }
    }
}

impl PipelineConfig {
    pub fn without_precision() -> Self {
        Self { precision: None }
    }

    /// Round to `digits` instead, keeping the tolerance. No-op when
    /// precision is disabled.
    pub fn with_digits(self, digits: u32) -> Self {
        Self {
            precision: self
                .precision
                .map(|p| PrecisionOptimizer::new(digits, p.tolerance())),
        }
    }

    /// Tolerance used when comparing vertices
    pub fn tolerance(&self) -> f64 {
        self.precision
            .map(|p| p.tolerance())
            .unwrap_or_else(|| PrecisionOptimizer::default().tolerance())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline<K = GeoKernel> {
    kernel: K,
    config: PipelineConfig,
}

impl Pipeline<GeoKernel> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_kernel(GeoKernel, config)
    }
}

impl<K: GeometryKernel> Pipeline<K> {
    pub fn with_kernel(kernel: K, config: PipelineConfig) -> Self {
        Self { kernel, config }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalize(&self, shape: &Shape) -> Shape {
        normalize(&self.kernel, shape)
    }

    pub fn to_single_part(&self, shape: &Shape) -> Polygon<f64> {
        to_single_part(&self.kernel, shape)
    }

    pub fn detect_intersections(&self, shapes: &[Shape]) -> IntersectionReport {
        detect_intersections(&self.kernel, shapes)
    }

    pub fn analyze_overlap(&self, a: &Shape, b: &Shape) -> OverlapAnalysis {
        analyze_overlap(&self.kernel, a, b, self.config.tolerance())
    }

    pub fn merge(&self, shapes: &[Shape]) -> Option<MergeOutcome> {
        merge(&self.kernel, shapes)
    }

    pub fn clip(&self, boundary: &Shape, target: &Shape) -> ClipOutcome {
        clip(&self.kernel, boundary, target, self.config.precision.as_ref())
    }

    pub fn chain_clip(&self, shapes: &[Shape]) -> Vec<ChainStep> {
        chain_clip(&self.kernel, shapes, self.config.precision.as_ref())
    }

    pub fn remove_overlaps(&self, polygons: &[Polygon<f64>]) -> Vec<DeoverlapStep> {
        remove_overlaps(&self.kernel, polygons, self.config.precision.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wkt::read_wkt;

    #[test]
    fn test_pipeline_defaults_to_precision() {
        let pipeline: Pipeline = Pipeline::default();
        assert!(pipeline.config().precision.is_some());
        assert_eq!(pipeline.config().tolerance(), 1e-12);
    }

    #[test]
    fn test_with_digits_keeps_tolerance() {
        let config = PipelineConfig {
            precision: Some(PrecisionOptimizer::new(12, 1e-6)),
        }
        .with_digits(4);
        let precision = config.precision.unwrap();
        assert_eq!(precision.digits(), 4);
        assert_eq!(precision.tolerance(), 1e-6);
        assert!(PipelineConfig::without_precision().with_digits(4).precision.is_none());
    }

    #[test]
    fn test_pipeline_chain_then_deoverlap() {
        let pipeline = Pipeline::new(PipelineConfig::without_precision());
        let shapes: Vec<Shape> = [
            "POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))",
            "POLYGON ((5 0, 6 0, 6 1, 5 1, 5 0))",
            "POLYGON ((1 0, 3 0, 3 2, 1 2, 1 0))",
        ]
        .iter()
        .map(|t| read_wkt(t).unwrap())
        .collect();

        let steps = pipeline.chain_clip(&shapes);
        // third only sees the second, so it still overlaps the first
        assert_eq!(steps[2].status, StepStatus::Disjoint);

        let polygons: Vec<Polygon<f64>> = steps.into_iter().map(|s| s.polygon).collect();
        let cleaned = pipeline.remove_overlaps(&polygons);
        assert_eq!(cleaned[2].status, DeoverlapStatus::Trimmed);
    }
}
