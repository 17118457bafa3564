pub mod compute;
pub mod pixel_size;
pub mod read_headers;

pub use compute::compute_metrics;
pub use pixel_size::{build_report, pixel_size, PixelReport};
pub use read_headers::read_headers;
