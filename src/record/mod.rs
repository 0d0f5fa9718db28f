/// Structured log records and the line parser that produces them
///
/// A `LogRecord` is built once from one well-formed `threadtime` line and is
/// never mutated afterwards. Its JSON form is the wire payload delivered to
/// every subscriber; the field names are a compatibility contract with
/// consuming clients and must not change.
use serde::{Deserialize, Serialize};

mod parser;

pub use parser::{parse_line, parse_line_with_year, TIMESTAMP_FORMAT};

/// One structured log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unix seconds
    #[serde(rename = "Time")]
    pub time: i64,

    #[serde(rename = "Tag")]
    pub tag: String,

    #[serde(rename = "Message")]
    pub message: String,

    #[serde(rename = "Priority")]
    pub priority: String,

    #[serde(rename = "PID")]
    pub pid: String,

    #[serde(rename = "TID")]
    pub tid: String,
}

impl LogRecord {
    /// Serialize to the wire payload
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
