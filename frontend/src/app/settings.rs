use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use weather_archive::DEFAULT_BASE_URL;

pub const SETTINGS_PATH: &str = "../weather_archive.json";

pub static CACHED_SETTINGS: Lazy<Mutex<Option<Settings>>> = Lazy::new(|| Mutex::new(None));

/// Front-end settings, read from `../weather_archive.json` when present
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_address")]
    pub api_address: String,
    /// Directory downloaded archives are saved into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_api_address() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_address: default_api_address(),
            output_dir: default_output_dir(),
        }
    }
}

pub fn parse_settings(content: &str) -> Result<Settings> {
    serde_json::from_str(content).map_err(|e| anyhow!("invalid settings: {}", e))
}

/// Read settings from `path`; a missing file yields the defaults
pub fn read_settings(path: &Path) -> Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_settings(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{} not found, using default settings", path.display());
            Ok(Settings::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Load settings once per process
pub fn load_settings() -> Result<Settings> {
    let mut cache = CACHED_SETTINGS
        .lock()
        .map_err(|_| anyhow!("settings cache poisoned"))?;
    if let Some(settings) = cache.as_ref() {
        return Ok(settings.clone());
    }

    let settings = read_settings(Path::new(SETTINGS_PATH))?;
    *cache = Some(settings.clone());
    Ok(settings)
}
