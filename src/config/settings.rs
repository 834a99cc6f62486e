use crate::utils::error::Result;
use crate::utils::paths::user_config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const SETTINGS_FILENAME: &str = "settings.json";
pub const SETTINGS_VERSION: u32 = 1;

/// Per-user persisted preferences. Unknown keys in the file are dropped on
/// load; missing keys are back-filled from the defaults and the normalized
/// file is written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub csv_separator: String,
    pub last_output_dir: String,
    pub log_level: String,
    pub log_to_file: bool,
    pub version: u32,
    /// Forward-compat bucket.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            csv_separator: ";".to_string(),
            last_output_dir: String::new(),
            log_level: "info".to_string(),
            log_to_file: false,
            version: SETTINGS_VERSION,
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        Self::load_from(&user_config_dir())
    }

    pub fn load_from(dir: &Path) -> Self {
        let file = dir.join(SETTINGS_FILENAME);

        if !file.exists() {
            let settings = Self::default();
            let _ = settings.save_to(dir);
            return settings;
        }

        let parsed = std::fs::read_to_string(&file)
            .ok()
            .and_then(|text| serde_json::from_str::<Self>(&text).ok());

        match parsed {
            Some(settings) => {
                let _ = settings.save_to(dir);
                settings
            }
            None => {
                // Corrupt file: keep it around for inspection, start fresh.
                let _ = std::fs::rename(&file, file.with_extension("bak"));
                let settings = Self::default();
                let _ = settings.save_to(dir);
                settings
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&user_config_dir())
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(SETTINGS_FILENAME), text)?;
        Ok(())
    }

    pub fn delimiter(&self) -> u8 {
        self.csv_separator.as_bytes().first().copied().unwrap_or(b';')
    }
}
