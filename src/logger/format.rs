//! Console formatting with ANSI colors and word wrapping
//!
//! Every line goes to stdout (colored) and to the file mirror (plain).
//! A closed stdout pipe ends the process quietly.

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;
const TIME_WIDTH: usize = 9;
const BRACKET_SPACE_WIDTH: usize = 3;
const PREFIX_WIDTH: usize = TIME_WIDTH + TAG_WIDTH + LEVEL_WIDTH + BRACKET_SPACE_WIDTH * 2;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 140;

pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let now = Local::now();
    let time = format!("{} ", now.format("%H:%M:%S")).dimmed();
    let base_line = format!("{}[{}] [{}] ", time, format_tag(tag), format_level(level));

    let chunks = wrap_text(message, MAX_LINE_LENGTH.saturating_sub(PREFIX_WIDTH).max(40));
    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let plain_tag = tag.to_plain_string();

    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            print_stdout_safe(&format!("{}{}", base_line, chunk));
        } else {
            print_stdout_safe(&format!("{}{}", " ".repeat(PREFIX_WIDTH), chunk));
        }
        write_to_file(&format!(
            "{} [{}] [{}] {}",
            timestamp,
            plain_tag,
            level.as_str(),
            chunk
        ));
    }
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Hub => label.bright_cyan().bold(),
        LogTag::Subscriber => label.bright_magenta().bold(),
        LogTag::Feed => label.bright_blue().bold(),
        LogTag::Webserver => label.bright_green().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Debug | LogLevel::Verbose => label.dimmed(),
        LogLevel::Info => label.white().bold(),
    }
}

fn print_stdout_safe(message: &str) {
    let mut out = stdout().lock();
    let result = writeln!(out, "{}", message).and_then(|_| out.flush());
    if let Err(e) = result {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Wrap at word boundaries, keeping explicit newlines; words longer than
/// `max_width` are split by character count.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                result.extend(chars.chunks(max_width).map(|c| c.iter().collect::<String>()));
            } else if current.is_empty() {
                current = word.to_string();
            } else if current_len + word_len + 1 <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}
