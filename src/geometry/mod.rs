pub mod measure;
pub mod precision;

pub use measure::perimeter;
pub use precision::PrecisionOptimizer;
