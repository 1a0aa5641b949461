use geo::{Geometry, MultiPolygon, Polygon};

/// A geometry flowing between pipeline stages.
///
/// Parsers and kernel operations produce one of these; every stage matches
/// on all three arms.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Exactly one connected region, possibly with holes
    Polygon(Polygon<f64>),
    /// Zero or more disjoint regions; zero members means empty
    MultiPolygon(MultiPolygon<f64>),
    /// Collapsed kernel output (a ring repaired into a line, a point, ...)
    Degenerate(Geometry<f64>),
}

impl Shape {
    /// Wrap a kernel result, unwrapping single-member collections the way a
    /// boolean-op engine reports them.
    pub fn from_multi(mut multi: MultiPolygon<f64>) -> Self {
        if multi.0.len() == 1 {
            Shape::Polygon(multi.0.remove(0))
        } else {
            Shape::MultiPolygon(multi)
        }
    }

    pub fn empty() -> Self {
        Shape::MultiPolygon(MultiPolygon::new(Vec::new()))
    }

    /// Constituent polygons in encounter order
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        match self {
            Shape::Polygon(p) => vec![p.clone()],
            Shape::MultiPolygon(mp) => mp.0.clone(),
            Shape::Degenerate(_) => Vec::new(),
        }
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons())
    }

    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            Shape::Polygon(p) => Geometry::Polygon(p.clone()),
            Shape::MultiPolygon(mp) => Geometry::MultiPolygon(mp.clone()),
            Shape::Degenerate(g) => g.clone(),
        }
    }

    pub fn member_count(&self) -> usize {
        match self {
            Shape::Polygon(_) => 1,
            Shape::MultiPolygon(mp) => mp.0.len(),
            Shape::Degenerate(_) => 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Polygon(_) => "POLYGON",
            Shape::MultiPolygon(_) => "MULTIPOLYGON",
            Shape::Degenerate(_) => "DEGENERATE",
        }
    }
}

impl From<Polygon<f64>> for Shape {
    fn from(polygon: Polygon<f64>) -> Self {
        Shape::Polygon(polygon)
    }
}

impl From<MultiPolygon<f64>> for Shape {
    fn from(multi: MultiPolygon<f64>) -> Self {
        Shape::MultiPolygon(multi)
    }
}
