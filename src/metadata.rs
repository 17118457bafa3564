use crate::error::{PixelMetricError, Result};
use std::collections::HashMap;

/// A keyword lookup over image header metadata.
///
/// `get` returns the numeric value of a keyword, or `None` when the keyword
/// is absent or not a number. Sources that can tell those two cases apart
/// override `contains` so callers can report non-numeric values precisely.
pub trait MetadataSource {
    fn get(&self, key: &str) -> Option<f64>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Look up a numeric keyword that must be present
pub fn require(source: &dyn MetadataSource, key: &str) -> Result<f64> {
    match source.get(key) {
        Some(value) => Ok(value),
        None if source.contains(key) => Err(PixelMetricError::invalid_argument(
            key,
            "header value is not numeric",
        )),
        None => Err(PixelMetricError::missing_key(key)),
    }
}

/// Look up an optional numeric keyword. Present but non-numeric values are
/// still an error.
pub fn optional(source: &dyn MetadataSource, key: &str) -> Result<Option<f64>> {
    match require(source, key) {
        Ok(value) => Ok(Some(value)),
        Err(PixelMetricError::MissingMetadataKey { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl MetadataSource for HashMap<String, f64> {
    fn get(&self, key: &str) -> Option<f64> {
        HashMap::get(self, key).copied()
    }
}

impl MetadataSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<f64> {
        HashMap::get(self, key).and_then(|v| parse_fits_number(v))
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }
}

/// Parse a FITS numeric value, accepting the Fortran `D` exponent marker
pub fn parse_fits_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .or_else(|| value.replace(['D', 'd'], "E").parse::<f64>().ok())
}
