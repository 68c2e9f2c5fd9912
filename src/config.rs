//! Configuration file support

use crate::error::{GlanceError, Result};
use crate::sentinel::DEFAULT_SENTINEL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working and home directories
pub const CONFIG_FILE_NAME: &str = ".glance.json";

/// Environment variable overriding the configured endpoint
pub const ENDPOINT_ENV: &str = "GLANCE_ENDPOINT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlanceConfig {
    /// Base URL of the analysis server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Path of the analysis route on the server
    #[serde(default = "default_analyze_path")]
    pub analyze_path: String,

    /// End-of-answer marker embedded in the streamed text
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Directory saved transcripts are written to
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    #[serde(default)]
    pub theme: Theme,

    /// Re-render the final answer as markdown
    #[serde(default = "default_render_markdown")]
    pub render_markdown: bool,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_analyze_path() -> String {
    "/analyze".to_string()
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_save_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_render_markdown() -> bool {
    true
}

impl Default for GlanceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            analyze_path: default_analyze_path(),
            sentinel: default_sentinel(),
            save_dir: default_save_dir(),
            theme: Theme::default(),
            render_markdown: default_render_markdown(),
        }
    }
}

impl GlanceConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| GlanceError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Full URL of the analysis route
    pub fn analyze_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = self.analyze_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Apply overrides from the environment
    pub fn with_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        self
    }
}

/// Find the config file: current directory first, then home
pub fn find_config() -> Option<PathBuf> {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return Some(local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(CONFIG_FILE_NAME);
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load the config from `explicit` or the discovered file, else defaults.
///
/// Returns the path the config came from so changes can be written back.
pub fn load_config(explicit: Option<&Path>) -> Result<(GlanceConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    match path {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            let config = GlanceConfig::from_file(&path)?;
            Ok((config.with_env(), Some(path)))
        }
        None => {
            tracing::debug!("No {} found, using default config", CONFIG_FILE_NAME);
            Ok((GlanceConfig::default().with_env(), None))
        }
    }
}

/// Write an example config to `path`, refusing to overwrite an existing file
pub fn create_example_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(GlanceError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let example = GlanceConfig {
        save_dir: PathBuf::from("./results"),
        ..GlanceConfig::default()
    };
    example.to_file(path)?;
    tracing::info!("Created example config at: {}", path.display());
    Ok(())
}
