use tracing::debug;

use crate::domain::Shape;
use crate::kernel::GeometryKernel;

/// Return `shape` unchanged when valid, otherwise the kernel's repair.
///
/// Repair can turn a polygon into a multipolygon or collapse it entirely;
/// callers handle every [`Shape`] arm.
pub fn normalize<K: GeometryKernel>(kernel: &K, shape: &Shape) -> Shape {
    let issues = kernel.validity_issues(shape);
    if issues.is_empty() {
        return shape.clone();
    }
    let repaired = kernel.make_valid(shape);
    debug!(
        issue = %issues[0],
        issues = issues.len(),
        from = shape.kind(),
        to = repaired.kind(),
        "repaired invalid geometry"
    );
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GeoKernel;
    use crate::wkt::read_wkt;

    #[test]
    fn test_valid_shape_is_unchanged() {
        let shape = read_wkt("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert_eq!(normalize(&GeoKernel, &shape), shape);
    }

    #[test]
    fn test_bowtie_changes_arity() {
        let shape = read_wkt("POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))").unwrap();
        let normalized = normalize(&GeoKernel, &shape);
        assert!(matches!(normalized, Shape::MultiPolygon(_)));
        assert!(GeoKernel.is_valid(&normalized));
    }
}
