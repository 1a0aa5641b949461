//! polymerge - Merge, clip and chain-clip WKT polygons into single-part results

pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod ops;
pub mod parser;
pub mod wkt;

pub use domain::Shape;
pub use error::{ConfigError, ParseError};
pub use kernel::{GeoKernel, GeometryKernel};
pub use ops::{Pipeline, PipelineConfig};
pub use parser::{ParseReport, parse_polygons, parse_records};
