//! Upgrade an on-disk config file written by an older release.
//!
//! Older files lack the newer keys; serde fills them with defaults at load
//! time, but `config --check` reports them and `config --migrate` writes
//! them back so the file documents the effective policy.

use super::Config;
use crate::errors::{AppError, AppResult};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

fn read_mapping(path: &Path) -> AppResult<Mapping> {
    let content = fs::read_to_string(path)?;
    let yaml: Value = serde_yaml::from_str(&content)?;
    match yaml {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(AppError::Config(format!(
            "{} is not a YAML mapping",
            path.display()
        ))),
    }
}

fn default_mapping() -> AppResult<Mapping> {
    match serde_yaml::to_value(Config::default())? {
        Value::Mapping(m) => Ok(m),
        _ => Err(AppError::Config("default config is not a mapping".into())),
    }
}

/// Keys present in the current config layout but missing from the file.
pub fn missing_fields(path: &Path) -> AppResult<Vec<String>> {
    let current = read_mapping(path)?;
    let defaults = default_mapping()?;

    Ok(defaults
        .keys()
        .filter(|k| !current.contains_key(*k))
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect())
}

/// Add missing keys with their defaults, keeping every existing value.
///   Returns:
///   Ok(true)  → file rewritten
///   Ok(false) → already up to date
pub fn migrate_config_file(path: &Path) -> AppResult<bool> {
    let mut current = read_mapping(path)?;
    let defaults = default_mapping()?;
    let mut changed = false;

    for (k, v) in defaults {
        if !current.contains_key(&k) {
            current.insert(k, v);
            changed = true;
        }
    }

    if changed {
        let serialized = serde_yaml::to_string(&Value::Mapping(current))?;
        fs::write(path, serialized)?;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn migrate_fills_missing_keys_once() {
        let path = env::temp_dir().join("optracker_cfg_migrate_test.conf");
        fs::write(&path, "database: /tmp/keep.sqlite\ndefault_hourly_rate: 31.5\n").unwrap();

        let missing = missing_fields(&path).unwrap();
        assert!(missing.contains(&"notes_merge".to_string()));
        assert!(!missing.contains(&"database".to_string()));

        assert!(migrate_config_file(&path).unwrap());
        assert!(!migrate_config_file(&path).unwrap());
        assert!(missing_fields(&path).unwrap().is_empty());

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.database, "/tmp/keep.sqlite");
        assert_eq!(cfg.default_hourly_rate, 31.5);

        fs::remove_file(&path).ok();
    }
}
