//! Configuration loading and catalog manifest resolution

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the catalog manifest path using the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `catalog` key in the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_manifest_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = manifest_from_config_file() {
        return Ok(path);
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_manifest_path())
}

/// Find the configuration file for the platform, if one exists.
fn config_file_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("phrasebook").join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/phrasebook/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read the `catalog` key from the config file, if present.
fn manifest_from_config_file() -> Option<PathBuf> {
    let config_path = config_file_path()?;
    debug!("Reading config file: {}", config_path.display());

    let content = std::fs::read_to_string(&config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&content).ok()?;
    config
        .get("catalog")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// OS-dependent default manifest location.
fn default_manifest_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("phrasebook").join("catalog.toml"))
        .unwrap_or_else(|| PathBuf::from("./catalog.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cli_arg_wins() {
        std::env::set_var("PHRASEBOOK_TEST_CATALOG_A", "/from/env/catalog.toml");
        let resolved = resolve_manifest_path(
            Some(Path::new("/from/cli/catalog.toml")),
            "PHRASEBOOK_TEST_CATALOG_A",
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/from/cli/catalog.toml"));
        std::env::remove_var("PHRASEBOOK_TEST_CATALOG_A");
    }

    #[test]
    #[serial]
    fn test_env_var_when_no_cli_arg() {
        std::env::set_var("PHRASEBOOK_TEST_CATALOG_B", "/from/env/catalog.toml");
        let resolved = resolve_manifest_path(None, "PHRASEBOOK_TEST_CATALOG_B").unwrap();
        assert_eq!(resolved, PathBuf::from("/from/env/catalog.toml"));
        std::env::remove_var("PHRASEBOOK_TEST_CATALOG_B");
    }

    #[test]
    #[serial]
    fn test_fallback_is_nonempty() {
        std::env::remove_var("PHRASEBOOK_TEST_CATALOG_C");
        let resolved = resolve_manifest_path(None, "PHRASEBOOK_TEST_CATALOG_C").unwrap();
        assert!(resolved.ends_with("catalog.toml"));
    }
}
