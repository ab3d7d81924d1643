use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use tour_core::config::{EngineConfig, WarnLevel};
use tour_core::paths;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a default config to .tour/config.yaml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config (defaults filled in)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init { force } => init(root, force, json),
        ConfigSubcommand::Show => {
            let config = load(root)?;
            if json {
                return print_json(&config);
            }
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        ConfigSubcommand::Validate => validate(&load(root)?, json),
    }
}

fn load(root: &Path) -> anyhow::Result<EngineConfig> {
    EngineConfig::load_from_root(root)
        .with_context(|| format!("failed to load {}", paths::config_path(root).display()))
}

fn init(root: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    EngineConfig::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        return print_json(&serde_json::json!({ "path": path }));
    }
    println!("Initialized {}", paths::tour_dir(root).display());
    Ok(())
}

fn validate(config: &EngineConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({
            "valid": !warnings.iter().any(|w| w.level == WarnLevel::Error),
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config OK.");
    } else {
        for w in &warnings {
            let label = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{label}: {}", w.message);
        }
    }

    config.ensure_valid()?;
    Ok(())
}
