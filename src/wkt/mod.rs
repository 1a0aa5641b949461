//! Well-known-text codec for the two geometry types the pipeline accepts.

pub mod reader;
pub mod writer;

pub use reader::read_wkt;
pub use writer::{serialize_polygon, write_polygon, write_shape};
