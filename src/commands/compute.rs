use crate::pixel_metrics::{CalibrationSample, PixelMetrics};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ComputeOutput {
    sample: CalibrationSample,
    metrics: PixelMetrics,
}

/// Compute pixel metrics from explicit values, without any file I/O
pub fn compute_metrics(cdelt: f64, solar_radius: f64, format: &str) -> Result<()> {
    let sample = CalibrationSample::new(cdelt, solar_radius);
    let metrics = sample.metrics()?;

    match format.to_lowercase().as_str() {
        "json" => {
            let output = ComputeOutput { sample, metrics };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => println!("{}", metrics),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixelMetricError;

    #[test]
    fn test_compute_metrics_rejects_negative() {
        let err = compute_metrics(-1.0, 6.955e8, "text").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PixelMetricError>(),
            Some(PixelMetricError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_compute_output_json_shape() {
        let sample = CalibrationSample::new(0.5, 6.955e8);
        let output = ComputeOutput {
            sample,
            metrics: sample.metrics().unwrap(),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["sample"]["cdelt_arcsec"], 0.5);
        assert!(json["metrics"]["pixel_size_m"].as_f64().unwrap() > 0.0);
        assert!(json["metrics"]["pixel_area_m2"].is_number());
    }
}
