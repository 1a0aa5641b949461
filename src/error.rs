use std::path::PathBuf;

use thiserror::Error;

/// Reasons a WKT record could not be read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unsupported geometry type '{0}'")]
    UnsupportedType(String),

    #[error("ring is not closed")]
    UnclosedRing,

    #[error("ring has {actual} coordinates, at least 4 are required")]
    TooFewPoints { actual: usize },

    #[error("trailing input after geometry at offset {offset}")]
    TrailingInput { offset: usize },

    #[error("no POLYGON or MULTIPOLYGON keyword found")]
    NoGeometry,

    #[error("polygon collapsed to a degenerate geometry during repair")]
    Collapsed,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to load an explicitly requested config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
