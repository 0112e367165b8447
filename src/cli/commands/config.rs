use crate::config::Config;
use crate::config::migrate::{migrate_config_file, missing_fields};
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};

use crate::cli::parser::Commands;
use std::process::Command;

fn default_editor() -> String {
    std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        })
}

fn run_editor(editor: &str, path: &std::path::Path) -> bool {
    matches!(Command::new(editor).arg(path).status(), Ok(s) if s.success())
}

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
        migrate,
        edit_config,
        editor,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG ----
        if *print_config {
            println!("📄 Current configuration ({}):\n", path.display());
            println!("{}", serde_yaml::to_string(cfg)?);
        }

        // ---- CHECK ----
        if *check {
            if !path.exists() {
                warning(format!(
                    "No config file at {}, defaults are in use. Run `init` to create one.",
                    path.display()
                ));
            } else {
                let missing = missing_fields(&path)?;
                if missing.is_empty() {
                    success("Configuration file is up to date.");
                } else {
                    warning(format!(
                        "Missing fields (defaults in use): {}",
                        missing.join(", ")
                    ));
                    info("Run `config --migrate` to write them to the file.");
                }
            }
        }

        // ---- MIGRATE ----
        if *migrate {
            if !path.exists() {
                warning(format!("No config file at {}", path.display()));
            } else if migrate_config_file(&path)? {
                success(format!("Configuration file updated: {}", path.display()));
            } else {
                info("Configuration file already up to date.");
            }
        }

        // ---- EDIT CONFIG ----
        if *edit_config {
            let fallback = default_editor();
            let editor_to_use = editor.clone().unwrap_or_else(|| fallback.clone());

            if run_editor(&editor_to_use, &path) {
                success(format!(
                    "Configuration file edited successfully using '{}'",
                    editor_to_use
                ));
            } else {
                warning(format!(
                    "Editor '{}' not available, falling back to '{}'",
                    editor_to_use, fallback
                ));
                if run_editor(&fallback, &path) {
                    success(format!(
                        "Configuration file edited successfully using fallback '{}'",
                        fallback
                    ));
                } else {
                    crate::ui::messages::error(format!(
                        "Failed to edit configuration file using fallback '{}'",
                        fallback
                    ));
                }
            }
        }
    }

    Ok(())
}
