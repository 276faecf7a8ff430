/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, BudgetConfig, LocalConfig, RemoteConfig, load_app_configuration, load_config};
