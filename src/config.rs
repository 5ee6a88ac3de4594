use crate::cli::StackArgs;
use anyhow::{Context, Result};
use stackgraph::StackConfig;
use std::path::{Path, PathBuf};

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("stackgen").join("config.toml"))
}

/// Parse a TOML config; missing fields keep their defaults
pub fn parse(content: &str) -> Result<StackConfig> {
    toml::from_str(content).context("Invalid TOML format in stackgen config")
}

/// Load the config file at `path`
pub fn load_file(path: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    parse(&content).with_context(|| format!("In config file: {}", path.display()))
}

/// Load the explicit config, else the default one if it exists, else defaults
pub fn load(explicit: Option<&str>) -> Result<StackConfig> {
    if let Some(path) = explicit {
        let expanded = shellexpand::tilde(path);
        return load_file(Path::new(expanded.as_ref()));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            log::debug!("using config file {}", path.display());
            load_file(&path)
        }
        _ => Ok(StackConfig::default()),
    }
}

/// Apply CLI overrides on top of a loaded config
pub fn apply_overrides(config: &mut StackConfig, args: &StackArgs) {
    if let Some(name) = &args.app_name {
        config.application_name = name.clone();
    }
    if let Some(port) = args.port {
        config.application_port = port;
    }
    if let Some(repo) = &args.repo {
        config.playbook_repository = repo.clone();
    }
    if let Some(image) = &args.image {
        config.image_id = image.clone();
    }
    if let Some(instance_type) = &args.instance_type {
        config.instance_type = instance_type.clone();
    }
    if let Some(principal) = &args.principal {
        config.trust_principal = principal.clone();
    }
    if let Some(mode) = args.mode {
        config.bootstrap_mode = mode.into();
    }
}

/// Load, override and validate the effective config
pub fn resolve(args: &StackArgs) -> Result<StackConfig> {
    let mut config = load(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Render a config as TOML
pub fn to_toml(config: &StackConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}
