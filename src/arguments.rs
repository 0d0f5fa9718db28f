/// Centralized argument handling for logcast
///
/// - Global CMD_ARGS storage with thread-safe access
/// - Flag and value lookup helpers
/// - Debug flags (--debug-<tag>) are read by the logger
/// - Server overrides (--host, --port, --root) and --config
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    arg_present(&get_cmd_args(), arg)
}

/// Gets the value that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    arg_value(&get_cmd_args(), flag)
}

pub fn arg_present(args: &[String], arg: &str) -> bool {
    args.iter().any(|a| a == arg)
}

pub fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

// =============================================================================
// OVERRIDES
// =============================================================================

/// Config file path (--config <path>)
pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// Bind host override (--host <addr>)
pub fn get_host_override() -> Option<String> {
    get_arg_value("--host")
}

/// Port override (--port <n>); None if absent or invalid
pub fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|p| parse_port(&p).ok())
}

/// Static root override (--root <dir>)
pub fn get_root_override() -> Option<String> {
    get_arg_value("--root")
}

pub fn parse_port(value: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(0) => Err("Port cannot be 0".to_string()),
        Ok(port) => Ok(port),
        Err(e) => Err(format!("Invalid port '{}': {}", value, e)),
    }
}

/// Reject a malformed --port before anything starts
pub fn validate_port_argument() -> Result<(), String> {
    match get_arg_value("--port") {
        Some(value) => parse_port(&value).map(|_| ()),
        None if has_arg("--port") => Err("--port requires a value".to_string()),
        None => Ok(()),
    }
}

pub fn is_privileged_port(port: u16) -> bool {
    port < 1024
}

// =============================================================================
// HELP
// =============================================================================

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

pub fn print_help() {
    println!("logcast - stream device logs to WebSocket subscribers");
    println!();
    println!("USAGE:");
    println!("    logcast [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>      Config file (default: logcast.toml)");
    println!("    --host <addr>        Bind address override");
    println!("    --port <n>           Listening port override");
    println!("    --root <dir>         Static file root override");
    println!("    --log-file <path>    Mirror log output to a file");
    println!("    --verbose            Show verbose output for every subsystem");
    println!("    --quiet              Only show warnings and errors");
    println!("    --log-level <level>  error, warning, info, debug or verbose");
    println!("    -h, --help           Print this help");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-hub          Registry and fan-out details");
    println!("    --debug-subscriber   Per-subscriber lifecycle");
    println!("    --debug-feed         Producer feed and skipped lines");
    println!("    --debug-webserver    HTTP and WebSocket connections");
    println!("    --debug-all          Every subsystem");
    println!("    --verbose-<tag>      Verbose output for one subsystem");
}
