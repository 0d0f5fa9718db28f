//! Structured console logging
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug output via `--debug-<tag>` flags
//! - Colored console output with an optional plain file mirror
//!
//! ```no_run
//! use logcast::logger::{self, LogTag};
//!
//! logger::init();
//! logger::info(LogTag::Hub, "Hub started");
//! logger::debug(LogTag::Feed, "Skipped banner line"); // only with --debug-feed
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Read logger flags from the command line and open the file mirror.
///
/// Call once at startup, before any logging.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Always shown.
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Shown unless `--quiet` raised the threshold past it.
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Only shown with `--debug-<tag>` for this tag (or `--debug-all`).
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Only shown with `--verbose` or `--verbose-<tag>`.
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush the file mirror; call during shutdown.
pub fn flush() {
    file::flush_file_logging();
}
