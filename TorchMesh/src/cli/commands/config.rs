//! Settings file handling

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Settings;
use crate::converter::write_atomic;

/// Path of the settings file.
pub fn settings_path() -> anyhow::Result<PathBuf> {
    Settings::default_path().context("Could not determine the config directory")
}

/// Load saved settings, or defaults when none are saved.
pub fn load_settings() -> anyhow::Result<Settings> {
    let Some(path) = Settings::default_path() else {
        tracing::warn!("Could not determine config directory; using default settings");
        return Ok(Settings::default());
    };
    load_from(&path)
}

fn load_from(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let settings =
        Settings::from_toml_str(&text).with_context(|| format!("Failed to parse settings: {}", path.display()))?;
    tracing::info!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn save_to(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    write_atomic(path, settings.to_toml_string()?.as_bytes())?;
    Ok(())
}

/// Show the settings path and contents; `init` writes the defaults first.
pub fn execute(init: bool) -> anyhow::Result<()> {
    let path = settings_path()?;
    if init {
        if path.exists() {
            println!("Settings already exist; leaving {} unchanged", path.display());
        } else {
            save_to(&path, &Settings::default())?;
            println!("Wrote default settings to {}", path.display());
        }
    }

    let settings = load_from(&path)?;
    println!("Settings file: {}{}", path.display(), if path.exists() { "" } else { " (not created)" });
    println!("XML converter: {}", settings.xml_converter_path().display());
    println!();
    print!("{}", settings.to_toml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torchmesh").join("settings.toml");
        assert_eq!(load_from(&path).unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.export.edge_lists = true;
        save_to(&path, &settings).unwrap();
        assert_eq!(load_from(&path).unwrap(), settings);
    }
}
