use crate::listing::{ProductDetails, DESCRIPTION_NOT_FOUND};

/// Longest original description passed to the model, in characters
const MAX_DESCRIPTION_CHARS: usize = 6000;
/// Longest single bullet passed to the model, in characters
const MAX_BULLET_CHARS: usize = 500;

const OPTIMIZATION_PROMPT: &str = r#"You are an expert Amazon SEO specialist and senior copywriter.

INSTRUCTIONS
- Read the ORIGINAL PRODUCT DETAILS and produce an optimized listing that is keyword-aware, persuasive, and compliant with Amazon policy.
- Output MUST be a single JSON object, and nothing else. Do not add commentary or extraneous text.
- If a field cannot be created, return an empty string (for strings) or an empty array (for lists).

RESPONSE SCHEMA (exact keys)
{
  "optimizedTitle": string,
  "optimizedBulletPoints": [string],
  "optimizedDescription": string,
  "keywords": [string]
}

CONSTRAINTS & TONE
- Title: include main product type and 1-2 high-value keywords naturally; avoid ALL CAPS; keep under 150 chars.
- Bullets: produce 3-5 bullets. Start with the strongest benefit, include measurable claims only if present in the original, use active voice, avoid medical/illegal claims.
- Description: 2-4 short paragraphs (approx. 40-120 words total). Use persuasive, scannable copy (short sentences, clear CTAs). Do not invent claims not present in original.
- Keywords: suggest 3-5 relevant search phrases (no commas inside phrases). Lowercase, no punctuation.

ORIGINAL PRODUCT DETAILS:
Title: {{title}}

Bullet Points:
{{bullets}}

Description:
{{description}}

EXAMPLE OUTPUT (must follow schema exactly):
{
  "optimizedTitle": "Acme Stainless Steel Coffee Grinder - Electric Burr Grinder, 12-Cup Capacity, Quiet Motor",
  "optimizedBulletPoints": [
    "Precision burrs deliver uniform grind size for better flavor",
    "Quiet motor reduces noise during operation",
    "12-cup capacity ideal for households and small offices",
    "Durable stainless steel body with easy-clean components",
    "Includes removable catch cup and anti-slip base"
  ],
  "optimizedDescription": "Upgrade your morning routine with the Acme Stainless Steel Coffee Grinder. Its precision burrs produce consistent grounds for fuller flavor and better extraction.\n\nDesigned for quiet operation and built to last, this grinder features a 12-cup capacity and easy-to-clean parts. Perfect for home or office use.",
  "keywords": ["stainless steel coffee grinder", "electric burr grinder", "quiet coffee grinder"]
}

Now produce the JSON response for the ORIGINAL PRODUCT DETAILS above, and return only the JSON object (no surrounding text)."#;

/// Truncate content on a char boundary, marking the cut
fn truncate_content(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        content.to_string()
    } else {
        let head: String = content.chars().take(max_chars).collect();
        format!("{}...[truncated, {} chars total]", head, total)
    }
}

/// Build the optimization prompt for a product
pub fn build_prompt(product: &ProductDetails) -> String {
    let bullets = if product.bullet_points.is_empty() {
        "(none)".to_string()
    } else {
        product
            .bullet_points
            .iter()
            .enumerate()
            .map(|(i, bullet)| format!("{}. {}", i + 1, truncate_content(bullet, MAX_BULLET_CHARS)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    // The sentinel would only teach the model to echo it back
    let description = if product.description == DESCRIPTION_NOT_FOUND {
        String::new()
    } else {
        truncate_content(&product.description, MAX_DESCRIPTION_CHARS)
    };

    OPTIMIZATION_PROMPT
        .replace("{{title}}", &product.title)
        .replace("{{bullets}}", &bullets)
        .replace("{{description}}", &description)
}
