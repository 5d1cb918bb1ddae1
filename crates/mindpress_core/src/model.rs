//! Shared build models

use serde::Serialize;

/// One entry of `search_index.json`. `href` is site-root-relative and may
/// carry a `#fragment` for chapter deep links.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchDocument {
    pub href: String,
    pub title: String,
    pub text: String,
}

/// Pretty-printed with a trailing newline so rebuilds are byte-identical
/// and diffs stay readable.
pub fn search_index_json(docs: &[SearchDocument]) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(docs)?;
    out.push('\n');
    Ok(out)
}

/// A manuscript chapter as the site builder sees it.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Heading anchor inside the reader page, e.g. `chapter-1-minds`.
    pub anchor_id: String,
    /// Bare title with any `Chapter N:` prefix dropped.
    pub title: String,
    pub markdown: String,
}
