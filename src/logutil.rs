//! Logging setup and helpers.
//!
//! Lines look like `2026-10-16T12:00:00Z [INFO] message`. With a log file configured every
//! line goes to the file and is echoed to the console only when stdout is a terminal.
//! User-supplied text must go through [`escape_log`] so one event stays on one line.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::config::LoggingConfig;

const MAX_PREVIEW: usize = 120;

/// Escape control characters and cap the length of user text before logging it.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write as _;
                let _ = write!(&mut out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn level_from_str(level: &str) -> log::LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" | "warning" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

/// Effective level: `-v` flags win over the configured level.
pub fn effective_level(config: Option<&LoggingConfig>, verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => config
            .map(|c| level_from_str(&c.level))
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Install the global logger. Safe to call more than once; later calls are ignored.
pub fn init_logging(config: Option<&LoggingConfig>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(effective_level(config, verbosity));

    let log_file = config
        .and_then(|c| c.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| eprintln!("Cannot open log file {path}: {e}; logging to console"))
                .ok()
        });

    match log_file {
        Some(file) => {
            let file = Arc::new(Mutex::new(file));
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_and_truncates() {
        assert_eq!(escape_log("roll\n2d6\t+3"), "roll\\n2d6\\t+3");
        assert_eq!(escape_log("a\u{1b}b"), "a\\u{1b}b");
        let long = escape_log(&"x".repeat(500));
        assert_eq!(long.chars().count(), MAX_PREVIEW + 1);
    }

    #[test]
    fn verbosity_overrides_config() {
        let cfg = LoggingConfig {
            level: "warn".into(),
            file: None,
        };
        assert_eq!(effective_level(Some(&cfg), 0), log::LevelFilter::Warn);
        assert_eq!(effective_level(Some(&cfg), 1), log::LevelFilter::Debug);
        assert_eq!(effective_level(None, 0), log::LevelFilter::Info);
        assert_eq!(effective_level(None, 3), log::LevelFilter::Trace);
    }
}
