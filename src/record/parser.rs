/// Parser for `logcat -v threadtime` lines
///
/// Line layout: `MM-DD HH:MM:SS.mmm  PID  TID P Tag: message`
///
/// Lines without the `": "` separator (banners such as
/// `--------- beginning of main`, wrapped continuation lines) are not records
/// and yield `Ok(None)`. Lines that have the separator but not the six
/// leading fields yield an error; a partial record is never produced.
use chrono::{Datelike, Local, NaiveDateTime};

use super::LogRecord;
use crate::errors::ParseError;

/// Full timestamp format after the year has been prepended
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const SEPARATOR: &str = ": ";
const MIN_FIELDS: usize = 6;

/// Parse a line, stamping it with the current local calendar year
///
/// Log lines carry no year. Records from a producer whose buffer spans a
/// year boundary get the wrong year; this mirrors the producer format's
/// lack of year information and is left as is.
pub fn parse_line(line: &str) -> Result<Option<LogRecord>, ParseError> {
    parse_line_with_year(line, Local::now().year())
}

/// Parse a line using an explicit year
pub fn parse_line_with_year(line: &str, year: i32) -> Result<Option<LogRecord>, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let Some((meta, message)) = line.split_once(SEPARATOR) else {
        return Ok(None);
    };

    let fields: Vec<&str> = meta.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            found: fields.len(),
        });
    }

    let stamp = format!("{}-{} {}", year, fields[0], fields[1]);
    let time = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT)
        .map_err(|e| ParseError::Timestamp {
            value: stamp.clone(),
            reason: e.to_string(),
        })?
        .and_utc()
        .timestamp();

    Ok(Some(LogRecord {
        time,
        tag: fields[5..].join(" "),
        message: message.to_string(),
        priority: fields[4].to_string(),
        pid: fields[2].to_string(),
        tid: fields[3].to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LINE: &str = "01-02 03:04:05.123  1000  2000 D MyTag: hello world";

    fn unix(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> i64 {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    #[test]
    fn test_parse_well_formed_line() {
        let record = parse_line_with_year(LINE, 2024).unwrap().unwrap();

        assert_eq!(record.priority, "D");
        assert_eq!(record.pid, "1000");
        assert_eq!(record.tid, "2000");
        assert_eq!(record.tag, "MyTag");
        assert_eq!(record.message, "hello world");
        assert_eq!(record.time, unix(2024, 1, 2, 3, 4, 5));
    }

    #[test]
    fn test_parse_uses_current_year() {
        let record = parse_line(LINE).unwrap().unwrap();
        let year = Local::now().year();
        assert_eq!(record.time, unix(year, 1, 2, 3, 4, 5));
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let line = format!("{}\r\n", LINE);
        let record = parse_line_with_year(&line, 2024).unwrap().unwrap();
        assert_eq!(record.message, "hello world");
    }

    #[test]
    fn test_message_keeps_inner_separators() {
        let line = "01-02 03:04:05.123  1000  2000 W Net: failed: host unreachable";
        let record = parse_line_with_year(line, 2024).unwrap().unwrap();
        assert_eq!(record.tag, "Net");
        assert_eq!(record.message, "failed: host unreachable");
    }

    #[test]
    fn test_padded_tag() {
        let line = "12-31 23:59:59.999   512   530 I chatty  : uid=1000 expire 3 lines";
        let record = parse_line_with_year(line, 2023).unwrap().unwrap();
        assert_eq!(record.tag, "chatty");
        assert_eq!(record.priority, "I");
        assert_eq!(record.time, unix(2023, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_line_without_separator_is_not_a_record() {
        assert_eq!(
            parse_line_with_year("--------- beginning of main", 2024),
            Ok(None)
        );
        assert_eq!(parse_line_with_year("", 2024), Ok(None));
    }

    #[test]
    fn test_too_few_fields_is_error() {
        let result = parse_line_with_year("01-02 03:04:05.123 1000 D: oops", 2024);
        assert_eq!(result, Err(ParseError::TooFewFields { found: 4 }));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let result = parse_line_with_year("13-45 03:04:05.123  1000  2000 D MyTag: hi", 2024);
        assert!(matches!(result, Err(ParseError::Timestamp { .. })));

        let result = parse_line_with_year("01-02 noon  1000  2000 D MyTag: hi", 2024);
        assert!(matches!(result, Err(ParseError::Timestamp { .. })));
    }
}
