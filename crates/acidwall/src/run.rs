use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use effectconfig::{EffectConfig, ResolvedConfig, VariantSetting};
use feedback::EffectVariant;
use renderer::{Renderer, RendererConfig, SeedInput};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn run(cli: Cli) -> Result<()> {
    let resolved = resolve_config(&cli)?;

    if cli.print_config {
        let printed = resolved
            .to_toml_string()
            .context("failed to render resolved configuration")?;
        print!("{printed}");
        return Ok(());
    }

    let config = renderer_config(&resolved)?;
    tracing::debug!(
        variant = %config.variant,
        logical_height = config.logical_height,
        window = %resolved.window,
        seed = ?config.seed,
        "resolved acidwall configuration"
    );
    let mut renderer = Renderer::new(config);
    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Layers command-line flags over the optional config file.
fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let file = match cli.config.as_deref() {
        Some(path) => load_config_file(path)?,
        None => EffectConfig::default(),
    };
    let merged = file.merged_with(cli.overrides());
    merged
        .validate()
        .context("invalid command-line configuration")?;
    Ok(merged.resolve())
}

/// Loads `path`, rebasing a relative `seed` onto the file's directory.
fn load_config_file(path: &Path) -> Result<EffectConfig> {
    let mut config = EffectConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let (Some(seed), Some(parent)) = (config.seed.as_ref(), path.parent()) {
        if seed.is_relative() {
            config.seed = Some(parent.join(seed));
        }
    }
    Ok(config)
}

fn renderer_config(resolved: &ResolvedConfig) -> Result<RendererConfig> {
    let seed = match resolved.seed.as_deref() {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read seed image {}", path.display()))?;
            SeedInput::Image(Arc::from(bytes))
        }
        None => SeedInput::Noise {
            seed: resolved.noise_seed,
        },
    };

    Ok(RendererConfig {
        variant: map_variant(resolved.variant),
        logical_height: resolved.logical_height,
        window_size: (resolved.window.width, resolved.window.height),
        seed,
        ..RendererConfig::default()
    })
}

fn map_variant(setting: VariantSetting) -> EffectVariant {
    match setting {
        VariantSetting::Feedback => EffectVariant::Feedback,
        VariantSetting::Noise => EffectVariant::Noise,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["acidwall"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn default_variant_maps_to_core_default() {
        assert_eq!(
            map_variant(VariantSetting::default()),
            EffectVariant::default()
        );
    }

    #[test]
    fn flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("acidwall.toml");
        fs::write(
            &path,
            "variant = \"noise\"\nlogical_height = 300\nnoise_seed = 4\n",
        )
        .unwrap();

        let resolved = resolve_config(&cli(&[
            "--config",
            path.to_str().unwrap(),
            "--logical-height",
            "600",
        ]))
        .unwrap();

        assert_eq!(resolved.variant, VariantSetting::Noise);
        assert_eq!(resolved.logical_height, 600);
        assert_eq!(resolved.noise_seed, 4);
    }

    #[test]
    fn relative_seed_is_resolved_against_config_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("acidwall.toml");
        fs::write(&path, "seed = \"images/seed.png\"\n").unwrap();

        let resolved = resolve_config(&cli(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(resolved.seed, Some(dir.path().join("images/seed.png")));
    }

    #[test]
    fn missing_seed_image_is_reported() {
        let resolved = EffectConfig {
            seed: Some(PathBuf::from("/nonexistent/acidwall-seed.png")),
            ..EffectConfig::default()
        }
        .resolve();

        let err = renderer_config(&resolved).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read seed image"));
    }

    #[test]
    fn noise_seed_is_used_without_an_image() {
        let resolved = EffectConfig {
            variant: Some(VariantSetting::Noise),
            noise_seed: Some(11),
            ..EffectConfig::default()
        }
        .resolve();

        let config = renderer_config(&resolved).unwrap();
        assert_eq!(config.variant, EffectVariant::Noise);
        assert!(matches!(config.seed, SeedInput::Noise { seed: 11 }));
        assert_eq!(config.window_size, (1280, 720));
    }

    #[test]
    fn seed_image_bytes_are_read_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.bin");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let resolved = EffectConfig {
            seed: Some(path),
            ..EffectConfig::default()
        }
        .resolve();

        let config = renderer_config(&resolved).unwrap();
        match config.seed {
            SeedInput::Image(bytes) => assert_eq!(&bytes[..], &[1, 2, 3]),
            other => panic!("expected image seed, got {other:?}"),
        }
    }
}
