/*!
 * Lifeline Init Command - writes a starter configuration
 *
 * Without a path the file goes to ~/.lifeline/lifeline.toml. An existing
 * file is only replaced after confirmation (or with --force).
 */

use crate::cli_style::{print_info, print_success, Theme};
use crate::config::LifelineConfig;
use crate::error::{LifelineError, Result};
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::{Path, PathBuf};

/// What `init-config` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Written(PathBuf),
    Unchanged(PathBuf),
}

/// Write the configuration, asking before overwriting
pub fn run_init(path: Option<PathBuf>, force: bool, demo: bool) -> Result<InitOutcome> {
    let path = match path {
        Some(path) => path,
        None => get_default_config_path()?,
    };

    if path.exists() && !force && !confirm_overwrite(&path)? {
        print_info(&format!(
            "Configuration unchanged: {}",
            Theme::muted(path.display())
        ));
        return Ok(InitOutcome::Unchanged(path));
    }

    let config = if demo {
        LifelineConfig::demo_preset()
    } else {
        LifelineConfig::default()
    };
    write_config(&config, &path)?;

    print_success(&format!("Configuration written to {}", path.display()));
    print_info("Set monitor.probe_url to enable the crisis monitor.");
    Ok(InitOutcome::Written(path))
}

/// Validate and persist a configuration
pub fn write_config(config: &LifelineConfig, path: &Path) -> Result<()> {
    config.validate()?;
    config.to_file(path)
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    // Never block on a prompt without a terminal
    if !Term::stderr().is_term() {
        return Ok(false);
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} exists. Overwrite?", path.display()))
        .default(false)
        .interact()
        .map_err(|e| LifelineError::Config(format!("Prompt failed: {}", e)))
}

fn get_default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LifelineError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".lifeline").join("lifeline.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lifeline.toml");

        let outcome = run_init(Some(path.clone()), false, false).unwrap();
        assert_eq!(outcome, InitOutcome::Written(path.clone()));

        let loaded = LifelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, LifelineConfig::default());
    }

    #[test]
    fn test_existing_file_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lifeline.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        // Test runs have no terminal, so the prompt is declined
        let outcome = run_init(Some(path.clone()), false, true).unwrap();
        assert_eq!(outcome, InitOutcome::Unchanged(path.clone()));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "log_level = \"warn\"\n"
        );

        let outcome = run_init(Some(path.clone()), true, true).unwrap();
        assert_eq!(outcome, InitOutcome::Written(path.clone()));
        assert_eq!(
            LifelineConfig::from_file(&path).unwrap(),
            LifelineConfig::demo_preset()
        );
    }
}
