/// Filtering rules applied before anything is formatted
///
/// 1. Errors are always shown
/// 2. Anything above the minimum level is dropped
/// 3. Debug requires --debug-<tag> (or --debug-all)
/// 4. Verbose requires --verbose or --verbose-<tag>
use super::config::{
    get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag, LoggerConfig,
};
use super::levels::LogLevel;
use super::tags::LogTag;

pub fn should_log(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    match level {
        LogLevel::Error => true,
        LogLevel::Debug => is_debug_enabled_for_tag(config, tag),
        LogLevel::Verbose => {
            config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(config, tag)
        }
        _ => level <= config.min_level,
    }
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&get_logger_config(), &tag, level) {
        return;
    }

    super::format::format_and_log(&tag, level, message);
}
