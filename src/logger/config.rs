/// Logger configuration derived from command-line flags
///
/// Recognized flags:
/// - `--debug-<tag>` / `--debug-all`: enable DEBUG output for a tag
/// - `--verbose`: enable VERBOSE output everywhere
/// - `--verbose-<tag>`: enable VERBOSE output for one tag
/// - `--quiet`: only warnings and errors
/// - `--log-level <level>`: explicit minimum level
/// - `--log-file <path>`: mirror output to a file
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{arg_present, arg_value, get_cmd_args};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub debug_all: bool,
    pub debug_tags: HashSet<String>,
    pub verbose_tags: HashSet<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_all: false,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            log_file: None,
        }
    }
}

impl LoggerConfig {
    pub fn from_args(args: &[String]) -> Self {
        let mut config = LoggerConfig::default();

        for arg in args {
            if arg == "--debug-all" {
                config.debug_all = true;
            } else if let Some(key) = arg.strip_prefix("--debug-") {
                config.debug_tags.insert(key.to_lowercase());
            } else if let Some(key) = arg.strip_prefix("--verbose-") {
                config.verbose_tags.insert(key.to_lowercase());
            }
        }

        if arg_present(args, "--quiet") {
            config.min_level = LogLevel::Warning;
        }
        if arg_present(args, "--verbose") {
            config.min_level = LogLevel::Verbose;
        } else if config.debug_all || !config.debug_tags.is_empty() {
            config.min_level = config.min_level.max(LogLevel::Debug);
        }
        if let Some(level) = arg_value(args, "--log-level").and_then(|v| LogLevel::parse(&v)) {
            config.min_level = level;
        }

        config.log_file = arg_value(args, "--log-file").map(PathBuf::from);
        config
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Read the process command line into the logger configuration
pub fn init_from_args() {
    set_logger_config(LoggerConfig::from_args(&get_cmd_args()));
}

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|cfg| cfg.clone())
        .unwrap_or_default()
}

pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut cfg) = LOGGER_CONFIG.write() {
        *cfg = config;
    }
}

pub fn is_debug_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.debug_all || config.debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.verbose_tags.contains(&tag.to_debug_key())
}
