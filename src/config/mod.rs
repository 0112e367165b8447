use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod migrate; // use submodule at src/config/migrate.rs

/// How punch-out notes combine with notes recorded at punch-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotesMerge {
    /// Keep both, punch-in notes first.
    Append,
    /// Punch-out notes win when present.
    Replace,
    /// Punch-in notes win when present.
    Keep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    /// Rate applied when an employee has no salary on file.
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: f64,
    /// Divisor turning an annual salary into an hourly rate.
    #[serde(default = "default_annual_work_hours")]
    pub annual_work_hours: f64,
    #[serde(default = "default_notes_merge")]
    pub notes_merge: NotesMerge,
    #[serde(default = "default_notes_separator")]
    pub notes_separator: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    #[serde(default)]
    pub compress_backups: bool,
}

fn default_hourly_rate() -> f64 {
    25.0
}
fn default_annual_work_hours() -> f64 {
    2080.0
}
fn default_notes_merge() -> NotesMerge {
    NotesMerge::Append
}
fn default_notes_separator() -> String {
    " | ".to_string()
}
fn default_backup_dir() -> String {
    Config::config_dir()
        .join("backups")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            default_hourly_rate: default_hourly_rate(),
            annual_work_hours: default_annual_work_hours(),
            notes_merge: default_notes_merge(),
            notes_separator: default_notes_separator(),
            backup_dir: default_backup_dir(),
            compress_backups: false,
        }
    }
}

impl Config {
    /// Defaults pointing at an explicit database file, used by tests and
    /// embedding callers that do not own a config file.
    pub fn with_database<P: AsRef<Path>>(path: P) -> Self {
        Self {
            database: path.as_ref().to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("optracker")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".optracker")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("optracker.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("optracker.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.annual_work_hours <= 0.0 {
            return Err(AppError::Config(format!(
                "annual_work_hours must be positive, got {}",
                self.annual_work_hours
            )));
        }
        if self.default_hourly_rate < 0.0 {
            return Err(AppError::Config(format!(
                "default_hourly_rate cannot be negative, got {}",
                self.default_hourly_rate
            )));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        // Write config file
        if !is_test {
            config.save(&Self::config_file())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        // Create empty DB file if not exists
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }

        println!("✅ Database:    {:?}", db_path);

        Ok(config)
    }
}
