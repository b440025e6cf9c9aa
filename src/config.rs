// src/config.rs

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::magnifier::MagnifierConfig;

/// Select a screen region and save it for OCR.
#[derive(Parser, Debug, Clone)]
#[command(name = "ocrsnip", version, about)]
pub struct Config {
    /// Directory for the timestamped captures and the fixed-name `capture.png`
    #[arg(long, default_value = "captures")]
    pub captures_dir: PathBuf,

    /// Smallest width/height of a capture, px
    #[arg(long, default_value_t = 30)]
    pub min_size: u32,

    #[arg(long, default_value_t = 120)]
    pub magnifier_size: u32,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub magnifier_zoom: u32,

    /// Wait between closing the overlay and grabbing the region, ms
    #[arg(long, default_value_t = 100)]
    pub settle_ms: u64,

    /// Wait before the first snapshot so the launching window can get out of the way, ms
    #[arg(long, default_value_t = 500)]
    pub startup_delay_ms: u64,

    /// Percent of darkest/brightest pixels ignored by auto-contrast
    #[arg(long, default_value_t = 0.5)]
    pub contrast_cutoff: f32,

    /// Pop up a dialog when the capture fails or looks blank
    #[arg(long)]
    pub notify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["ocrsnip"])
    }
}

impl Config {
    pub fn magnifier(&self) -> MagnifierConfig {
        MagnifierConfig {
            size: self.magnifier_size,
            zoom: self.magnifier_zoom,
            ..MagnifierConfig::default()
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}
