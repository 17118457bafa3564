use crate::fits::read_fits_headers;
use crate::pixel_metrics::{disk_pixel_size, CalibrationConfig, CalibrationSample, PixelMetrics};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct PixelReport {
    pub filename: String,
    pub hdu_index: usize,
    pub sample: CalibrationSample,
    pub metrics: PixelMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_pixel_size_m: Option<f64>,
}

pub fn pixel_size(
    path: &str,
    hdu: Option<usize>,
    config: &CalibrationConfig,
    cross_check: bool,
    format: &str,
) -> Result<()> {
    let report = build_report(Path::new(path), hdu, config, cross_check)?;

    match format.to_lowercase().as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("{}", report.metrics);
            if cross_check {
                match report.disk_pixel_size_m {
                    Some(size) => {
                        println!("The disk-measured pixel size is {} meters.", size)
                    }
                    None => tracing::warn!(
                        "No R_SUN or RSUN_OBS in HDU {}, skipping disk cross-check",
                        report.hdu_index
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Read the calibration HDU of a FITS file and compute its pixel metrics
pub fn build_report(
    path: &Path,
    hdu: Option<usize>,
    config: &CalibrationConfig,
    cross_check: bool,
) -> Result<PixelReport> {
    let headers = read_fits_headers(path)?;

    let header = match hdu {
        Some(index) => headers
            .headers
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("No HDU {} in {}", index, path.display()))?,
        None => headers
            .find_calibration_hdu(&config.cdelt_keyword)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No HDU in {} carries {}",
                    path.display(),
                    config.cdelt_keyword
                )
            })?,
    };

    tracing::info!(
        "Reading calibration from HDU {} of {}",
        header.hdu_index,
        path.display()
    );

    let sample = CalibrationSample::from_source(header, config)
        .with_context(|| format!("Failed to read calibration from {}", path.display()))?;
    let metrics = sample.metrics()?;

    let disk_pixel_size_m = if cross_check {
        disk_pixel_size(header, &config.cdelt_keyword, sample.solar_radius_m)?
    } else {
        None
    };

    Ok(PixelReport {
        filename: headers.filename.clone(),
        hdu_index: header.hdu_index,
        sample,
        metrics,
        disk_pixel_size_m,
    })
}
