//! Geometry capabilities the pipeline depends on.
//!
//! Operations in [`crate::ops`] are generic over [`GeometryKernel`] so the
//! engine doing the actual boolean work can be swapped out.

pub mod geo_kernel;
pub mod repair;
pub mod validity;

use geo::Polygon;

use crate::domain::Shape;

pub use geo_kernel::GeoKernel;
pub use validity::ValidityIssue;

pub trait GeometryKernel {
    /// Everything that makes `shape` invalid; empty when valid
    fn validity_issues(&self, shape: &Shape) -> Vec<ValidityIssue>;

    fn is_valid(&self, shape: &Shape) -> bool {
        self.validity_issues(shape).is_empty()
    }

    /// Repair an invalid shape. May change arity or collapse to
    /// [`Shape::Degenerate`].
    fn make_valid(&self, shape: &Shape) -> Shape;

    fn intersects(&self, a: &Shape, b: &Shape) -> bool;

    fn intersection_area(&self, a: &Shape, b: &Shape) -> f64;

    /// N-ary union of every polygonal member of `shapes`
    fn union(&self, shapes: &[Shape]) -> Shape;

    /// `a` minus `b`
    fn difference(&self, a: &Shape, b: &Shape) -> Shape;

    fn convex_hull(&self, shape: &Shape) -> Polygon<f64>;

    fn is_empty(&self, shape: &Shape) -> bool;

    fn area(&self, shape: &Shape) -> f64;
}
