use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use crate::db::OptimizationRow;

/// One run of words in a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Segment {
    Kept(String),
    Removed(String),
    Added(String),
}

/// Word-level comparison of original and optimized copy
#[derive(Debug, Clone, Serialize)]
pub struct CopyDiff {
    pub changed: bool,
    pub segments: Vec<Segment>,
    pub additions: usize,
    pub deletions: usize,
    /// Share of the text left untouched, 0.0 to 1.0
    pub similarity: f32,
    /// Simple summary of the change (e.g., "+5 / -3 words")
    pub summary: Option<String>,
}

impl CopyDiff {
    /// Inline markup: removed words as `[-..]`, added words as `[+..]`
    pub fn render_plain(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Kept(text) => text.clone(),
                Segment::Removed(text) => format!("[-{}]", text),
                Segment::Added(text) => format!("[+{}]", text),
            })
            .collect()
    }
}

/// Compare original and optimized copy word by word
pub fn diff(original: &str, optimized: &str) -> CopyDiff {
    let text_diff = TextDiff::from_words(original, optimized);

    let mut segments: Vec<Segment> = Vec::new();
    let mut additions = 0;
    let mut deletions = 0;

    for change in text_diff.iter_all_changes() {
        let value = change.value();
        match change.tag() {
            ChangeTag::Delete => {
                if !value.trim().is_empty() {
                    deletions += 1;
                }
                push_segment(&mut segments, Segment::Removed(value.to_string()));
            }
            ChangeTag::Insert => {
                if !value.trim().is_empty() {
                    additions += 1;
                }
                push_segment(&mut segments, Segment::Added(value.to_string()));
            }
            ChangeTag::Equal => push_segment(&mut segments, Segment::Kept(value.to_string())),
        }
    }

    CopyDiff {
        changed: original != optimized,
        segments,
        additions,
        deletions,
        similarity: text_diff.ratio(),
        summary: generate_summary(additions, deletions),
    }
}

/// Merge consecutive segments of the same kind
fn push_segment(segments: &mut Vec<Segment>, next: Segment) {
    if let Some(last) = segments.last_mut() {
        match (last, &next) {
            (Segment::Kept(acc), Segment::Kept(text))
            | (Segment::Removed(acc), Segment::Removed(text))
            | (Segment::Added(acc), Segment::Added(text)) => {
                acc.push_str(text);
                return;
            }
            _ => {}
        }
    }
    segments.push(next);
}

/// Generate a simple summary from change counts
fn generate_summary(additions: usize, deletions: usize) -> Option<String> {
    if additions > 0 && deletions > 0 {
        Some(format!("+{} / -{} words", additions, deletions))
    } else if additions > 0 {
        Some(format!("+{} words", additions))
    } else if deletions > 0 {
        Some(format!("-{} words", deletions))
    } else {
        None
    }
}

/// Comparison of one listing field
#[derive(Debug, Clone, Serialize)]
pub struct FieldComparison {
    pub field: &'static str,
    pub diff: CopyDiff,
}

/// Compare title, bullets and description of a stored optimization
pub fn compare_row(row: &OptimizationRow) -> Vec<FieldComparison> {
    vec![
        FieldComparison {
            field: "title",
            diff: diff(&row.original_title, &row.optimized_title),
        },
        FieldComparison {
            field: "bullets",
            diff: diff(&row.original_bullets.join("\n"), &row.optimized_bullets.join("\n")),
        },
        FieldComparison {
            field: "description",
            diff: diff(&row.original_description, &row.optimized_description),
        },
    ]
}
