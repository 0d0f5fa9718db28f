/// Configuration system
///
/// TOML file with `[server]`, `[hub]` and `[feed]` sections. Every key is
/// optional; command-line overrides are applied on top by `run`.
///
/// ```toml
/// [server]
/// port = 12345
/// static_root = "web"
///
/// [hub]
/// queue_capacity = 1024
/// send_timeout_ms = 1000
///
/// [feed]
/// program = "adb"
/// args = ["logcat", "-v", "threadtime"]
/// ```
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{Config, FeedConfig, HubConfig, ServerConfig};
pub use utils::{
    get_config_clone, is_config_initialized, load_config_from_path, read_config_file,
    update_config, with_config, CONFIG_FILE_PATH,
};
