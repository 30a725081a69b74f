// src/io/log_path.rs

//! Per-attempt log file naming.
//!
//! `<sanitized-name>.<YYYYMMDD.HH:MM:SS.mmm>.<request-id prefix>.log`

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;

const TIMESTAMP_FORMAT: &str = "%Y%m%d.%H:%M:%S%.3f";
const REQUEST_ID_PREFIX_LEN: usize = 8;

static RESERVED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("valid reserved-char regex"));

static RESERVED_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])$").expect("valid reserved-name regex")
});

/// Build the log path for one attempt of node `name`.
pub fn log_file_path<Tz>(
    log_dir: &Path,
    name: &str,
    started_at: &DateTime<Tz>,
    request_id: &str,
) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    log_dir.join(format!(
        "{}.{}.{}.log",
        sanitize_filename(name, "_"),
        started_at.format(TIMESTAMP_FORMAT),
        truncate(request_id, REQUEST_ID_PREFIX_LEN),
    ))
}

/// Replace characters (and whole names) that are not portable in file names.
pub fn sanitize_filename(name: &str, replacement: &str) -> String {
    let s = RESERVED_CHARS.replace_all(name, replacement);
    let s = RESERVED_NAMES.replace_all(&s, replacement);
    s.replace(' ', replacement)
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
