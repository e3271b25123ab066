//! Strips code-like noise (style rules, script fragments, tags, URLs, emails)
//! from text pulled out of a product page.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on full-pipeline rounds while looking for a fixed point
const MAX_ROUNDS: usize = 8;

/// Characters that mark a sentence fragment as leftover code
const CODE_OPERATORS: [char; 4] = ['=', '!', '<', '>'];

/// Shortest sentence fragment worth keeping, in characters
const MIN_FRAGMENT_CHARS: usize = 3;

// Non-nested brace blocks. Nested braces are not balanced: the innermost
// block goes and the outer residue may survive.
static BRACE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^}]*\}").expect("Invalid brace block regex")
});

static CODE_SHAPE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // function (...) { ... }
        r"function\s*\([^)]*\)\s*\{[^}]*\}",
        // if (...) { ... }
        r"if\s*\([^)]*\)\s*\{[^}]*\}",
        // Namespace.when(...).execute(...)
        r"[A-Za-z_$][\w$]*\.when\([^)]*\)\.execute\([^)]*\)",
        // Namespace.register(...)
        r"[A-Za-z_$][\w$]*\.register\([^)]*\)",
        // (function (...) ... }
        r"\(function\s*\([^)]*\)[^}]*\}",
        // function (...) header whose body the brace pass already took
        r"\bfunction\s*\([^)]*\)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid code shape regex"))
    .collect()
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[^>]*>").expect("Invalid tag regex")
});

static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(var|const|let|function|if|else|return|class|async|await)\b\s+")
        .expect("Invalid keyword regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[^\s]+").expect("Invalid URL regex")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+").expect("Invalid email regex")
});

/// Remove code-like noise from raw extracted text.
///
/// Never fails. The passes run in a fixed order, since each one assumes the
/// noise handled by the earlier ones is gone. The whole pipeline is repeated
/// until the text stops changing, so `sanitize(sanitize(s)) == sanitize(s)`.
pub fn sanitize(raw: &str) -> String {
    let mut current = run_passes(raw);
    for _ in 1..MAX_ROUNDS {
        let next = run_passes(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn run_passes(text: &str) -> String {
    let text = strip_brace_blocks(text);
    let text = strip_code_shapes(&text);
    let text = strip_tags(&text);
    let text = strip_keywords(&text);
    let text = collapse_whitespace(&text);
    let text = drop_code_fragments(&text);
    strip_links(&text)
}

fn strip_brace_blocks(text: &str) -> String {
    BRACE_BLOCK_RE.replace_all(text, "").into_owned()
}

fn strip_code_shapes(text: &str) -> String {
    CODE_SHAPE_RES.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}

fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

fn strip_keywords(text: &str) -> String {
    KEYWORD_RE.replace_all(text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Split on periods and drop fragments that are empty, too short, or carry
/// comparison/assignment operators.
fn drop_code_fragments(text: &str) -> String {
    text.split('.')
        .map(str::trim)
        .filter(|fragment| {
            !fragment.starts_with('.')
                && !fragment.contains(&CODE_OPERATORS[..])
                && fragment.chars().count() >= MIN_FRAGMENT_CHARS
        })
        .collect::<Vec<_>>()
        .join(". ")
}

fn strip_links(text: &str) -> String {
    let text = URL_RE.replace_all(text, "");
    EMAIL_RE.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "Hello World",
        "function(x){return 1;} Hello World",
        ".a-box{color:red;margin:0} Great grinder. Built to last.",
        "<div class=\"x\">Premium <b>steel</b> body</div>",
        "var x = 5; Stainless steel body. if (a > b) { run(); } Quiet motor.",
        "P.when('A').execute(function(A){ A.init(); }); Easy to clean burrs.",
        "Visit https://example.com/page.html or mail help@example.com today.",
        "Nested {outer {inner} tail} braces remain partly. Durable design.",
        "a. b. cc. ddd. eeee",
        "   lots\n\n of \t whitespace   here   ",
    ];

    #[test]
    fn test_removes_function_noise() {
        let out = sanitize("function(x){return 1;} Hello World");
        assert!(!out.contains("function("));
        assert!(out.contains("Hello World"));
    }

    #[test]
    fn test_idempotent_on_samples() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            let twice = sanitize(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_strips_style_blocks() {
        let out = sanitize(".a-box{color:red;margin:0} Great grinder. Built to last.");
        assert!(!out.contains("color"));
        assert!(out.contains("Great grinder"));
        assert!(out.contains("Built to last"));
    }

    #[test]
    fn test_strips_tags() {
        let out = sanitize("<div class=\"x\">Premium <b>steel</b> body</div>");
        assert_eq!(out, "Premium steel body");
    }

    #[test]
    fn test_drops_fragments_with_operators() {
        let out = sanitize("Quiet motor. x = 5. Works great");
        assert_eq!(out, "Quiet motor. Works great");
    }

    #[test]
    fn test_drops_short_fragments() {
        assert_eq!(sanitize("a. b. cc. ddd. eeee"), "ddd. eeee");
    }

    #[test]
    fn test_strips_namespaced_calls() {
        let out = sanitize("Acme.register('widget') Sturdy handle for daily use");
        assert!(!out.contains("register"));
        assert!(out.contains("Sturdy handle"));
    }

    #[test]
    fn test_strips_reserved_words() {
        let out = sanitize("const value return stuff Solid build");
        assert_eq!(out, "value stuff Solid build");
    }

    #[test]
    fn test_strips_urls_and_emails() {
        let out = sanitize("Visit https://example.com/page or mail help@example.com today");
        assert!(!out.contains("https://"));
        assert!(!out.contains('@'));
        assert!(out.contains("Visit"));
        assert!(out.contains("today"));
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(sanitize("   lots\n\n of \t whitespace   here   "), "lots of whitespace here");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n "), "");
    }
}
