use super::schemas::Config;
/// Configuration utilities - loading and access helpers
///
/// - Loading configuration from disk (missing file → defaults)
/// - Thread-safe access helpers
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::RwLock;

/// Global configuration instance
///
/// Single source of truth for configuration values. Reads before
/// `load_config_from_path` see the defaults.
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "logcast.toml";

/// Parse and validate a configuration file
///
/// A missing file yields the defaults.
pub fn read_config_file(path: &str) -> Result<Config, String> {
    if !Path::new(path).exists() {
        eprintln!("⚠️  Config file '{}' not found, using default values", path);
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

    let config = toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?;

    config
        .validate()
        .map_err(|e| format!("Invalid config file '{}': {}", path, e))?;

    Ok(config)
}

/// Load configuration from a specific file path into the global CONFIG
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = read_config_file(path)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())
}

/// Execute a function with read access to the configuration
///
/// # Example
/// ```
/// use logcast::config::with_config;
///
/// let port = with_config(|cfg| cfg.server.port);
/// assert!(port > 0);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let config = config_lock
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    f(&config)
}

/// Get a clone of the entire configuration
///
/// Use when values are needed across await points.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Update the in-memory configuration
pub fn update_config<F>(update_fn: F)
where
    F: FnOnce(&mut Config),
{
    let config_lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let mut config = config_lock
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    update_fn(&mut config);
}

/// Check if configuration has been initialized
pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}
