//! Slug and heading utilities.
//!
//! Pure string transformations shared by document creation, folder
//! creation, importing, and table-of-contents extraction.
//!
//! ```rust
//! use docs_portal_core::slug::slugify;
//!
//! assert_eq!(slugify("  Hello, World!  "), "hello-world");
//! assert_eq!(slugify("Setup & Install Guide"), "setup-install-guide");
//! ```

use crate::models::Heading;

/// Convert a display name into a URL-safe slug.
///
/// Lowercases, drops every character that is not alphanumeric, `_`, `-`,
/// or whitespace, turns runs of whitespace and dashes into a single `-`,
/// and trims separators from both ends. Alphanumerics are Unicode-aware,
/// so `"Café"` becomes `"café"`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    out
}

/// Turn a slug back into a readable title: `"getting-started"` → `"Getting Started"`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract ATX headings (`#` through `######`) in document order.
///
/// Lines inside fenced code blocks are ignored.
pub fn extract_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((level, text)) = parse_heading(line) {
            headings.push(Heading {
                level,
                text: text.to_string(),
                id: slugify(text),
            });
        }
    }

    headings
}

/// Text of the first level-1 heading, if any.
pub fn first_heading_title(markdown: &str) -> Option<String> {
    extract_headings(markdown)
        .into_iter()
        .find(|h| h.level == 1)
        .map(|h| h.text)
}

fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some((hashes as u8, text))
}
