//! Shared display and input helpers for the command-line surface

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};

use asinopt::error::Result;

/// Truncate a string to max_len characters (not bytes), adding "..." if truncated.
/// Safe for non-ASCII content (emoji, CJK, etc).
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}

/// Age of a timestamp relative to `now`, e.g. "5m ago"
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let ago = now.signed_duration_since(then);
    if ago.num_seconds() < 60 {
        format!("{}s ago", ago.num_seconds().max(0))
    } else if ago.num_minutes() < 60 {
        format!("{}m ago", ago.num_minutes())
    } else if ago.num_hours() < 24 {
        format!("{}h ago", ago.num_hours())
    } else {
        format!("{}d ago", ago.num_days())
    }
}

/// Read a whole file, or stdin when no path is given
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
