/// Log tags identifying the subsystem a message comes from
///
/// The debug key of a tag is what `--debug-<key>` and `--verbose-<key>`
/// match against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Hub,
    Subscriber,
    Feed,
    Webserver,
    Other(String),
}

impl LogTag {
    /// Lowercase key used by command-line flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Hub => "hub".to_string(),
            LogTag::Subscriber => "subscriber".to_string(),
            LogTag::Feed => "feed".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uppercase label without color codes (file output)
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
