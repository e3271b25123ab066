//! Turns raw generative-model output into an `OptimizedListing`.
//!
//! The model is asked for a JSON object but often wraps it in prose or code
//! fences, leaves trailing commas, uses single quotes, or drops JSON entirely
//! for `key: value` lines. Four parse strategies run in order and the first
//! one that recovers an object wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::NormalizationError;
use crate::listing::OptimizedListing;

static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",\s*([}\]])").expect("Invalid trailing comma regex")
});

static SINGLE_QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'([^']*)'").expect("Invalid single quote regex")
});

static KEY_VALUE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*"?([a-zA-Z0-9_\- ]+)"?\s*:\s*(.*)$"#).expect("Invalid key/value regex")
});

static EDGE_QUOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^['"]|['"]$"#).expect("Invalid edge quote regex")
});

const TITLE_KEYS: &[&str] = &["optimizedTitle", "optimized_title"];
const BULLET_KEYS: &[&str] = &["optimizedBulletPoints", "optimized_bullet_points"];
const DESCRIPTION_KEYS: &[&str] = &["optimizedDescription", "optimized_description"];
const KEYWORD_KEYS: &[&str] = &["keywords"];

/// Which parse strategy recovered the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole response is a JSON object
    Strict,
    /// First `{` through last `}` is a JSON object
    Substring,
    /// The substring parses after removing trailing commas and single quotes
    Repaired,
    /// Rebuilt from `key: value` lines
    LineBased,
}

impl ParseStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            ParseStrategy::Strict => "strict",
            ParseStrategy::Substring => "substring",
            ParseStrategy::Repaired => "repaired",
            ParseStrategy::LineBased => "line-based",
        }
    }
}

/// Normalize raw model output into a listing with all four fields present
pub fn normalize(raw: &str) -> Result<OptimizedListing, NormalizationError> {
    normalize_with_strategy(raw).map(|(listing, _)| listing)
}

/// Like `normalize`, also reporting which strategy succeeded
pub fn normalize_with_strategy(
    raw: &str,
) -> Result<(OptimizedListing, ParseStrategy), NormalizationError> {
    let (object, strategy) = recover_object(raw).ok_or_else(|| NormalizationError::new(raw))?;
    debug!(strategy = strategy.label(), keys = object.len(), "model response normalized");
    Ok((shape(&object), strategy))
}

fn recover_object(raw: &str) -> Option<(Map<String, Value>, ParseStrategy)> {
    if let Some(object) = parse_object(raw) {
        return Some((object, ParseStrategy::Strict));
    }

    if let Some(candidate) = outer_braces(raw) {
        if let Some(object) = parse_object(candidate) {
            return Some((object, ParseStrategy::Substring));
        }
        if let Some(object) = parse_object(&repair(candidate)) {
            return Some((object, ParseStrategy::Repaired));
        }
    }

    parse_lines(raw).map(|object| (object, ParseStrategy::LineBased))
}

/// Parse text as a JSON document, accepting only objects
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Greedy outer-brace match: first `{` through last `}`
fn outer_braces(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Best-effort repair: drop trailing commas, turn single-quoted literals double-quoted
fn repair(candidate: &str) -> String {
    let without_commas = TRAILING_COMMA_RE.replace_all(candidate, "$1");
    SINGLE_QUOTED_RE
        .replace_all(&without_commas, "\"${1}\"")
        .into_owned()
}

/// Rebuild an object from `key: value` lines. None when no line matched.
fn parse_lines(raw: &str) -> Option<Map<String, Value>> {
    let mut object = Map::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some(caps) = KEY_VALUE_LINE_RE.captures(line) else {
            continue;
        };
        let key = caps[1].trim().to_string();
        let value = caps[2].trim();
        object.insert(key, line_value(value));
    }

    (!object.is_empty()).then_some(object)
}

fn line_value(value: &str) -> Value {
    if value.starts_with('[') || value.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(value) {
            return parsed;
        }
    }

    let unquoted = EDGE_QUOTE_RE.replace_all(value, "");
    if unquoted.contains(',') {
        Value::Array(
            unquoted
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )
    } else {
        Value::String(unquoted.into_owned())
    }
}

/// Map a recovered object onto the listing shape, backfilling absent keys
pub fn shape(object: &Map<String, Value>) -> OptimizedListing {
    OptimizedListing {
        optimized_title: lookup(object, TITLE_KEYS).map(value_to_text).unwrap_or_default(),
        optimized_bullet_points: lookup(object, BULLET_KEYS).map(value_to_list).unwrap_or_default(),
        optimized_description: lookup(object, DESCRIPTION_KEYS).map(value_to_text).unwrap_or_default(),
        keywords: lookup(object, KEYWORD_KEYS).map(value_to_list).unwrap_or_default(),
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    }
}

fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Number(_) | Value::Bool(_) => vec![value_to_text(value)],
        Value::Null | Value::Object(_) => Vec::new(),
    }
}
