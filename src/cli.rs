use crate::pixel_metrics::{
    CalibrationConfig, RadiusSource, DEFAULT_CDELT_KEYWORD, DEFAULT_SOLAR_RADIUS_M,
};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hmi-pixel")]
#[command(
    about = "Physical pixel size and area of solar images from FITS calibration headers",
    long_about = None
)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the pixel size and area of a FITS image
    PixelSize {
        /// FITS file to read
        path: String,

        /// HDU holding the calibration keywords (default: first HDU that has them)
        #[arg(long)]
        hdu: Option<usize>,

        #[command(flatten)]
        calibration: CalibrationOptions,

        /// Also report the pixel size measured from the solar disk (R_SUN / RSUN_OBS)
        #[arg(long)]
        cross_check: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compute the pixel size and area from explicit values
    Compute {
        /// Coordinate increment in arc-seconds per pixel
        #[arg(long, allow_negative_numbers = true)]
        cdelt: f64,

        /// Reference solar radius in meters
        #[arg(long, default_value_t = DEFAULT_SOLAR_RADIUS_M, allow_negative_numbers = true)]
        solar_radius: f64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the calibration keywords in each HDU of a FITS file
    Headers {
        /// FITS file to read
        path: String,

        /// Show every keyword instead of the calibration subset
        #[arg(long)]
        all: bool,

        /// Output format (text, json, csv)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RadiusChoice {
    /// Use --solar-radius for every image
    Fixed,
    /// Use the image's RSUN_REF, falling back to --solar-radius
    Header,
}

#[derive(Parser, Debug, Clone)]
pub struct CalibrationOptions {
    /// Header keyword holding the increment in arc-seconds per pixel
    #[arg(long, default_value = DEFAULT_CDELT_KEYWORD)]
    pub cdelt_key: String,

    /// Where the reference solar radius comes from
    #[arg(long, value_enum, default_value_t = RadiusChoice::Fixed)]
    pub radius_source: RadiusChoice,

    /// Reference solar radius in meters
    #[arg(long, default_value_t = DEFAULT_SOLAR_RADIUS_M)]
    pub solar_radius: f64,
}

impl CalibrationOptions {
    pub fn to_calibration_config(&self) -> CalibrationConfig {
        let radius = match self.radius_source {
            RadiusChoice::Fixed => RadiusSource::Fixed(self.solar_radius),
            RadiusChoice::Header => RadiusSource::Header {
                fallback: self.solar_radius,
            },
        };

        CalibrationConfig {
            cdelt_keyword: self.cdelt_key.to_uppercase(),
            radius,
        }
    }
}
