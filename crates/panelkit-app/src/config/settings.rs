//! Settings parser for .panelkit/config.toml

use std::path::Path;

use panelkit_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const PANELKIT_DIR: &str = ".panelkit";

/// Load settings from `.panelkit/config.toml` under `project_path`
///
/// A missing or unreadable file yields defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(PANELKIT_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.panelkit/config.toml` with commented defaults if it does not exist
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let panelkit_dir = project_path.join(PANELKIT_DIR);

    if !panelkit_dir.exists() {
        std::fs::create_dir_all(&panelkit_dir)
            .map_err(|e| Error::config(format!("Failed to create .panelkit dir: {}", e)))?;
    }

    let config_path = panelkit_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# panelkit configuration

[behavior]
request_timeout_ms = 30000   # 0 = wait forever for replies
auto_refresh_ms = 5000       # polling interval while jobs are running
default_page_size = 10

# Per-view overrides
# [views.DataObjects]
# page_size = 25
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}

/// Save settings to `.panelkit/config.toml`
///
/// Writes to a temp file first and renames it into place.
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let panelkit_dir = project_path.join(PANELKIT_DIR);

    if !panelkit_dir.exists() {
        std::fs::create_dir_all(&panelkit_dir)
            .map_err(|e| Error::config(format!("Failed to create .panelkit dir: {}", e)))?;
    }

    let config_path = panelkit_dir.join(CONFIG_FILENAME);
    let temp_path = panelkit_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("# panelkit configuration\n\n{}", content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}
