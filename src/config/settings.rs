//! Application settings loading from config.toml
//!
//! Every section has defaults, so a missing file or a partial file is fine. The file
//! location comes from `RESEARCH_FUND_CONFIG` and falls back to `./config.toml`.

use crate::{
    entities::{Budget, DEFAULT_BUDGET},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "RESEARCH_FUND_CONFIG";

/// File name of the local fallback document inside `data_dir`.
pub const STORAGE_KEY: &str = "researchFundData";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spreadsheet and blob storage settings
    pub remote: RemoteConfig,
    /// Local fallback settings
    pub local: LocalConfig,
    /// Budgets used before anything is stored
    pub budget: BudgetConfig,
}

/// Remote spreadsheet store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Spreadsheet holding the ledger tables
    pub spreadsheet_id: String,
    /// Folder uploads are placed in
    pub folder_id: Option<String>,
    /// Base URL of the spreadsheets values API
    pub sheets_api: String,
    /// Base URL of the multipart file upload API
    pub upload_api: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            folder_id: None,
            sheets_api: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            upload_api: "https://www.googleapis.com/upload/drive/v3/files".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Local fallback store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding the fallback document
    pub data_dir: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl LocalConfig {
    /// Full path of the fallback document.
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join(format!("{STORAGE_KEY}.json"))
    }
}

/// Budgets assigned to a professor with no stored budget row.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Default activity budget
    pub default_activity: f64,
    /// Default materials budget
    pub default_materials: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_activity: DEFAULT_BUDGET.activity,
            default_materials: DEFAULT_BUDGET.materials,
        }
    }
}

impl BudgetConfig {
    /// The configured defaults as a validated budget.
    pub fn defaults(&self) -> Result<Budget> {
        Budget::new(self.default_activity, self.default_materials)
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The default budgets are negative
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.budget.defaults()?;
    Ok(config)
}

/// Loads settings from `RESEARCH_FUND_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: every setting has a default.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from);

    if !path.exists() {
        tracing::info!(
            "No configuration file at {}, using defaults.",
            path.display()
        );
        return Ok(AppConfig::default());
    }

    load_config(&path)
        .inspect(|_| tracing::info!("Loaded configuration from {}", path.display()))
        .inspect_err(|e| tracing::error!("Failed to load configuration: {}", e))
}
