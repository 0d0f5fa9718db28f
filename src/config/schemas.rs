/// Configuration schemas - all config structures defined once with defaults
///
/// Every section is declared with `config_struct!`, so a config file only
/// needs the keys it wants to change.
use crate::config_struct;

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// HTTP / WebSocket listener
    pub struct ServerConfig {
        host: String = "0.0.0.0".to_string(),
        port: u16 = 12345,

        /// WebSocket upgrade path
        ws_path: String = "/ws".to_string(),

        /// Directory served for every other path
        static_root: String = ".".to_string(),

        /// Document served at `/`, relative to `static_root`
        index_file: String = "index.html".to_string(),
    }
}

// ============================================================================
// HUB CONFIGURATION
// ============================================================================

config_struct! {
    /// Broadcast hub tuning
    pub struct HubConfig {
        /// Inbound queue size; a full queue blocks publishers
        queue_capacity: usize = 1024,

        /// Deadline for one send to one subscriber
        send_timeout_ms: u64 = 1000,

        /// First payload sent to each new subscriber
        greeting: String = "Welcome".to_string(),
    }
}

// ============================================================================
// FEED CONFIGURATION
// ============================================================================

config_struct! {
    /// Log-producing subprocess
    pub struct FeedConfig {
        program: String = "adb".to_string(),
        args: Vec<String> = vec![
            "logcat".to_string(),
            "-v".to_string(),
            "threadtime".to_string(),
        ],
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        server: ServerConfig = ServerConfig::default(),
        hub: HubConfig = HubConfig::default(),
        feed: FeedConfig = FeedConfig::default(),
    }
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }

        if !self.ws_path.starts_with('/') {
            return Err(format!("ws_path must start with '/': {}", self.ws_path));
        }

        Ok(())
    }

    /// Get the full bind address (host:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;

        if self.hub.queue_capacity == 0 {
            return Err("hub.queue_capacity must be > 0".to_string());
        }
        if self.hub.send_timeout_ms == 0 {
            return Err("hub.send_timeout_ms must be > 0".to_string());
        }
        if self.feed.program.is_empty() {
            return Err("feed.program cannot be empty".to_string());
        }

        Ok(())
    }
}
