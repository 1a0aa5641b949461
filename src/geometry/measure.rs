use geo::{EuclideanLength, Polygon};

/// Total length of every ring of the polygon, holes included
pub fn perimeter(polygon: &Polygon<f64>) -> f64 {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.euclidean_length())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_perimeter_square() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        assert!((perimeter(&square) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_perimeter_counts_holes() {
        let with_hole = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0)]]
        );
        assert!((perimeter(&with_hole) - 20.0).abs() < 1e-12);
    }
}
