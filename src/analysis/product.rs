use super::schema::{Schema, HEADLINE};
use super::sections::parse;

/// Longest product name stored with a scan, in characters.
pub const MAX_PRODUCT_NAME: usize = 60;

/// Shown wherever a scan has no derived product name.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Derive a short product name from the first line of the HEADLINE section.
pub fn derive_product_name(text: &str) -> Option<String> {
    let sections = parse(text, &Schema::any());
    let headline = sections.get(&HEADLINE)?;
    let first = headline.lines().next()?;
    let name = sanitize(first);
    (!name.is_empty()).then_some(name)
}

/// Keep letters, digits, spaces, hyphens and ampersands; collapse runs of
/// whitespace; cap the length.
pub fn sanitize(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '&'))
        .collect();

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_PRODUCT_NAME).collect();
    capped.trim_end().to_string()
}
