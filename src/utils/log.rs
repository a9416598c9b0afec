// src/utils/log.rs

//! Operator-facing console output with server-style formatting.
//!
//! Every line is also forwarded to the `log` facade so the log file keeps
//! the same progress trail the operator saw.

use std::sync::OnceLock;

use chrono::Local;

/// Console level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Current console level
static LOG_LEVEL: OnceLock<LogLevel> = OnceLock::new();

/// Set the console level once; later calls are ignored.
pub fn init(level: &str) {
    let _ = LOG_LEVEL.set(LogLevel::from_str(level));
}

/// Check if a level should be displayed on the console
fn should_log(level: LogLevel) -> bool {
    let current = LOG_LEVEL.get().copied().unwrap_or(LogLevel::Info);
    level >= current
}

/// Format a console line with timestamp and level
fn format_log(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.as_str(), message)
}

pub fn debug(message: &str) {
    log::debug!("{message}");
    if should_log(LogLevel::Debug) {
        eprintln!("{}", format_log(LogLevel::Debug, message));
    }
}

pub fn info(message: &str) {
    log::info!("{message}");
    if should_log(LogLevel::Info) {
        println!("{}", format_log(LogLevel::Info, message));
    }
}

pub fn warn(message: &str) {
    log::warn!("{message}");
    if should_log(LogLevel::Warn) {
        eprintln!("{}", format_log(LogLevel::Warn, message));
    }
}

pub fn error(message: &str) {
    log::error!("{message}");
    if should_log(LogLevel::Error) {
        eprintln!("{}", format_log(LogLevel::Error, message));
    }
}

/// Log a success message (always shown as INFO)
pub fn success(message: &str) {
    log::info!("{message}");
    println!("{}", format_log(LogLevel::Info, &format!("✓ {}", message)));
}

/// Log a header
pub fn header(title: &str) {
    log::info!("{title}");
    if should_log(LogLevel::Info) {
        println!();
        println!("{}", "═".repeat(60));
        println!("  {}", title);
        println!("{}", "═".repeat(60));
    }
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("  {message}");
    if should_log(LogLevel::Info) {
        println!("    {}", message);
    }
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("  {key}: {value}");
    }
    if should_log(LogLevel::Info) {
        println!();
        println!("[{}] [SUMMARY] {}", Local::now().format("%H:%M:%S"), title);
        for (key, value) in items {
            println!("    {}: {}", key, value);
        }
    }
}
