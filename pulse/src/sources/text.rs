use scraper::Html;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Upper bound on `Mention::content`, in grapheme clusters.
pub const MAX_CONTENT_CHARS: usize = 500;

/// Strip markup, decode entities, collapse whitespace and truncate.
pub fn clean_text(raw: &str) -> String {
    truncate_graphemes(&collapse_whitespace(&strip_markup(raw)), MAX_CONTENT_CHARS)
}

pub fn strip_markup(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.to_string();
    }

    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_graphemes(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_none() {
        return head;
    }

    let mut truncated: String = head.graphemes(true).take(max - 1).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}

/// `<kind>:<scope>:<first 16 hex chars of sha256(content)>`
pub fn source_qualified_id(kind: &str, scope: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let hash = format!("{digest:x}");
    if scope.is_empty() {
        format!("{kind}:{}", &hash[..16])
    } else {
        format!("{kind}:{scope}:{}", &hash[..16])
    }
}

pub fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Case-insensitive substring match against already-lowercased keywords.
pub fn contains_any(text: &str, lowercase_keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    lowercase_keywords.iter().any(|k| lower.contains(k.as_str()))
}
