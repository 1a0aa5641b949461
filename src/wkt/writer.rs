use geo::{Geometry, LineString, Polygon};
use serde::Serializer;

use crate::domain::Shape;

fn write_ring(ring: &LineString<f64>, out: &mut String) {
    out.push('(');
    for (i, c) in ring.0.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{} {}", c.x, c.y));
    }
    out.push(')');
}

fn write_polygon_text(polygon: &Polygon<f64>, out: &mut String) {
    out.push('(');
    write_ring(polygon.exterior(), out);
    for hole in polygon.interiors() {
        out.push_str(", ");
        write_ring(hole, out);
    }
    out.push(')');
}

/// Format a polygon as `POLYGON ((x y, ...), (...))`
pub fn write_polygon(polygon: &Polygon<f64>) -> String {
    if polygon.exterior().0.is_empty() {
        return "POLYGON EMPTY".to_string();
    }
    let mut out = String::from("POLYGON ");
    write_polygon_text(polygon, &mut out);
    out
}

pub fn write_shape(shape: &Shape) -> String {
    match shape {
        Shape::Polygon(p) => write_polygon(p),
        Shape::MultiPolygon(mp) if mp.0.is_empty() => "MULTIPOLYGON EMPTY".to_string(),
        Shape::MultiPolygon(mp) => {
            let mut out = String::from("MULTIPOLYGON (");
            for (i, p) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon_text(p, &mut out);
            }
            out.push(')');
            out
        }
        Shape::Degenerate(Geometry::LineString(ls)) => {
            let mut out = String::from("LINESTRING ");
            write_ring(ls, &mut out);
            out
        }
        Shape::Degenerate(_) => "GEOMETRYCOLLECTION EMPTY".to_string(),
    }
}

/// `serialize_with` helper so reports carry polygons as WKT strings
pub fn serialize_polygon<S: Serializer>(polygon: &Polygon<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&write_polygon(polygon))
}
