use std::path::PathBuf;

use clap::Parser;
use effectconfig::{EffectConfig, VariantSetting, WindowSize};

#[derive(Parser, Debug)]
#[command(
    name = "acidwall",
    author,
    version,
    about = "Scrolling GPU feedback effect"
)]
pub struct Cli {
    /// Read settings from a TOML file; flags given here override it.
    #[arg(long, value_name = "FILE", env = "ACIDWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Effect variant to render (`feedback` or `noise`).
    #[arg(long, value_name = "VARIANT", value_parser = parse_variant)]
    pub variant: Option<VariantSetting>,

    /// Fixed canvas height in pixels; the width follows the window aspect ratio.
    #[arg(long, value_name = "PIXELS", value_parser = parse_logical_height)]
    pub logical_height: Option<u32>,

    /// Image (png, jpeg, bmp or gif) used to seed every new pipeline.
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,

    /// Seed for the procedural noise used when no `--seed` image is given.
    #[arg(long, value_name = "N")]
    pub noise_seed: Option<u64>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Settings given on the command line, as a config layer.
    pub fn overrides(&self) -> EffectConfig {
        EffectConfig {
            variant: self.variant,
            logical_height: self.logical_height,
            seed: self.seed.clone(),
            noise_seed: self.noise_seed,
            window: self.size,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_variant(value: &str) -> Result<VariantSetting, String> {
    value.parse()
}

fn parse_size(value: &str) -> Result<WindowSize, String> {
    value.parse()
}

fn parse_logical_height(value: &str) -> Result<u32, String> {
    let height: u32 = value
        .trim()
        .parse()
        .map_err(|err| format!("invalid logical height '{value}': {err}"))?;
    if height == 0 {
        return Err("logical height must be greater than zero".to_string());
    }
    Ok(height)
}
