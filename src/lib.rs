pub mod cli;
pub mod commands;
pub mod error;
pub mod fits;
pub mod metadata;
pub mod pixel_metrics;
pub mod utils;

// Re-export commonly used items
pub use error::{PixelMetricError, Result};
pub use metadata::MetadataSource;
pub use pixel_metrics::{
    compute, CalibrationConfig, CalibrationSample, PixelMetrics, RadiusSource,
    DEFAULT_SOLAR_RADIUS_M,
};
