//! `genbench config ...` and configuration loading

use anyhow::{Context, Result};
use colored::Colorize;
use genbench_config::{ConfigLoader, GenbenchConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Load configuration from file (with env overrides) or from env and defaults
pub fn load_config(config_path: Option<&PathBuf>) -> Result<GenbenchConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            loader
                .from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Handle configuration validation
pub fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    info!("Validating configuration file: {}", config_file.display());

    match load_config(Some(config_file)) {
        Ok(_config) => {
            println!("{} Configuration file is valid", "✓".green());
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("{} Configuration validation failed: {:#}", "✗".red(), e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
pub fn handle_config_generate(output: &Path, force: bool) -> Result<()> {
    info!("Generating configuration at: {}", output.display());

    if output.exists() && !force {
        anyhow::bail!(
            "Output file already exists: {}. Use --force to overwrite.",
            output.display()
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, GenbenchConfig::generate_sample())
        .context("Failed to write configuration file")?;

    println!("{} Configuration generated at: {}", "✓".green(), output.display());
    println!(
        "Validate with: genbench config validate --config-file {}",
        output.display()
    );
    Ok(())
}

/// Handle configuration display
pub fn handle_config_show(config: &GenbenchConfig, format: &str) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

fn render_config(config: &GenbenchConfig, format: &str) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::to_string(config).context("Failed to serialize to YAML"),
        "json" => serde_json::to_string_pretty(config).context("Failed to serialize to JSON"),
        _ => anyhow::bail!("Unknown output format: {}. Valid formats: yaml, json", format),
    }
}
