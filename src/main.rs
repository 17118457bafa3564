use clap::Parser;
use hmi_pixel::cli::{Cli, Commands};
use hmi_pixel::commands::{compute_metrics, pixel_size, read_headers};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the results
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::PixelSize {
            path,
            hdu,
            calibration,
            cross_check,
            format,
        } => {
            let config = calibration.to_calibration_config();
            pixel_size(&path, hdu, &config, cross_check, &format)?;
        }
        Commands::Compute {
            cdelt,
            solar_radius,
            format,
        } => {
            compute_metrics(cdelt, solar_radius, &format)?;
        }
        Commands::Headers { path, all, format } => {
            read_headers(&path, all, &format)?;
        }
    }

    Ok(())
}
