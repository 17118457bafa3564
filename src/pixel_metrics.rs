//! Physical pixel scale of a solar image.
//!
//! The linear pixel size is the arc length subtended on a sphere of the
//! reference solar radius by one coordinate increment:
//! `dx = (2π × cdelt / 360) × R`, and the pixel area is `dx²`. The area is
//! only meaningful as a single image-wide value for equal-area projections.

use crate::error::{PixelMetricError, Result};
use crate::metadata::{optional, require, MetadataSource};
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// Solar radius assumed when the header's own value is not used (meters)
pub const DEFAULT_SOLAR_RADIUS_M: f64 = 6.955e8;

/// Header keyword holding the coordinate increment (arc-seconds per pixel)
pub const DEFAULT_CDELT_KEYWORD: &str = "CDELT2";

pub const RSUN_REF_KEYWORD: &str = "RSUN_REF";
pub const R_SUN_KEYWORD: &str = "R_SUN";
pub const RSUN_OBS_KEYWORD: &str = "RSUN_OBS";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationSample {
    pub cdelt_arcsec: f64,
    pub solar_radius_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelMetrics {
    pub pixel_size_m: f64,
    pub pixel_area_m2: f64,
}

impl fmt::Display for PixelMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "The HMI pixel size is {} meters.", self.pixel_size_m)?;
        write!(f, "The HMI pixel area is {} meters squared.", self.pixel_area_m2)
    }
}

/// Where the reference solar radius comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusSource {
    /// Always use this radius in meters
    Fixed(f64),
    /// Use the header's `RSUN_REF`, or `fallback` when it is absent
    Header { fallback: f64 },
}

impl Default for RadiusSource {
    fn default() -> Self {
        RadiusSource::Fixed(DEFAULT_SOLAR_RADIUS_M)
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Keyword read for the coordinate increment
    pub cdelt_keyword: String,
    pub radius: RadiusSource,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            cdelt_keyword: DEFAULT_CDELT_KEYWORD.to_string(),
            radius: RadiusSource::default(),
        }
    }
}

/// Compute the physical size and area of one pixel.
///
/// `cdelt_arcsec` may be zero, which yields a zero-sized pixel. Negative or
/// non-finite increments and non-positive radii are rejected.
pub fn compute(cdelt_arcsec: f64, solar_radius_m: f64) -> Result<PixelMetrics> {
    if !cdelt_arcsec.is_finite() {
        return Err(PixelMetricError::invalid_argument(
            "cdelt_arcsec",
            format!("must be a finite number (got {})", cdelt_arcsec),
        ));
    }
    if cdelt_arcsec < 0.0 {
        return Err(PixelMetricError::invalid_argument(
            "cdelt_arcsec",
            format!("must not be negative (got {})", cdelt_arcsec),
        ));
    }
    if !solar_radius_m.is_finite() || solar_radius_m <= 0.0 {
        return Err(PixelMetricError::invalid_argument(
            "solar_radius_m",
            format!("must be a positive finite number (got {})", solar_radius_m),
        ));
    }

    let pixel_size_m = (2.0 * PI * cdelt_arcsec / 360.0) * solar_radius_m;
    Ok(PixelMetrics {
        pixel_size_m,
        pixel_area_m2: pixel_size_m * pixel_size_m,
    })
}

impl CalibrationSample {
    pub fn new(cdelt_arcsec: f64, solar_radius_m: f64) -> Self {
        Self {
            cdelt_arcsec,
            solar_radius_m,
        }
    }

    /// Extract the increment and reference radius from header metadata
    pub fn from_source(source: &dyn MetadataSource, config: &CalibrationConfig) -> Result<Self> {
        let cdelt_arcsec = require(source, &config.cdelt_keyword)?;

        let solar_radius_m = match config.radius {
            RadiusSource::Fixed(radius) => radius,
            RadiusSource::Header { fallback } => match optional(source, RSUN_REF_KEYWORD)? {
                Some(radius) => {
                    tracing::debug!("Using {} = {} m from header", RSUN_REF_KEYWORD, radius);
                    radius
                }
                None => {
                    tracing::warn!(
                        "{} not present in header, falling back to {} m",
                        RSUN_REF_KEYWORD,
                        fallback
                    );
                    fallback
                }
            },
        };

        tracing::debug!(
            "{} = {} arcsec/pixel, solar radius = {} m",
            config.cdelt_keyword,
            cdelt_arcsec,
            solar_radius_m
        );

        Ok(Self::new(cdelt_arcsec, solar_radius_m))
    }

    pub fn metrics(&self) -> Result<PixelMetrics> {
        compute(self.cdelt_arcsec, self.solar_radius_m)
    }
}

/// Meters per pixel measured from the solar disk in the image.
///
/// Uses `R_SUN` (disk radius in pixels) when present, otherwise derives it
/// from `RSUN_OBS` (disk radius in arc-seconds) and the coordinate increment.
/// Returns `None` when the header carries neither.
pub fn disk_pixel_size(
    source: &dyn MetadataSource,
    cdelt_keyword: &str,
    solar_radius_m: f64,
) -> Result<Option<f64>> {
    let disk_radius_px = match optional(source, R_SUN_KEYWORD)? {
        Some(r_sun) => r_sun,
        None => match optional(source, RSUN_OBS_KEYWORD)? {
            Some(rsun_obs) => {
                let cdelt = require(source, cdelt_keyword)?;
                if cdelt <= 0.0 {
                    return Err(PixelMetricError::invalid_argument(
                        cdelt_keyword,
                        "must be positive to derive the disk radius in pixels",
                    ));
                }
                rsun_obs / cdelt
            }
            None => return Ok(None),
        },
    };

    if !disk_radius_px.is_finite() || disk_radius_px <= 0.0 {
        return Err(PixelMetricError::invalid_argument(
            R_SUN_KEYWORD,
            format!("disk radius must be positive (got {} pixels)", disk_radius_px),
        ));
    }

    Ok(Some(solar_radius_m / disk_radius_px))
}
