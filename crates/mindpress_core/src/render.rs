//! Block sequence to HTML fragment + search text
//!
//! Blocks render in isolation; the only cross-block state is the per-page
//! counter that keeps heading anchor ids unique. Alongside the HTML every
//! block (except code) contributes stripped plain text for the search
//! index.

use std::collections::BTreeMap;

use crate::blocks::Block;
use crate::cite::Citer;
use crate::inline::{escape, inline_format, strip_for_search};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDoc {
    pub html: String,
    pub search_text: String,
}

/// Lowercase, collapse non-alphanumeric runs to single hyphens.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_hyphen = false;
    for ch in s.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    if out.is_empty() {
        "section".to_string()
    } else {
        out
    }
}

pub fn render_blocks(blocks: &[Block], citer: &Citer<'_>) -> RenderedDoc {
    let mut parts: Vec<String> = Vec::new();
    let mut search_parts: Vec<String> = Vec::new();
    let mut seen_ids: BTreeMap<String, usize> = BTreeMap::new();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let base = slugify(text);
                let n = seen_ids.get(&base).copied().unwrap_or(0);
                seen_ids.insert(base.clone(), n + 1);
                let hid = if n == 0 { base } else { format!("{base}-{}", n + 1) };
                parts.push(format!(
                    "<h{level} id=\"{}\">{}</h{level}>",
                    escape(&hid),
                    inline_format(text)
                ));
                search_parts.push(strip_for_search(text));
            }
            Block::Rule => {
                parts.push("<hr />".to_string());
            }
            Block::Blockquote { lines } => {
                let inner = lines
                    .iter()
                    .map(|line| inline_format(line))
                    .collect::<Vec<_>>()
                    .join("<br />");
                parts.push(format!("<blockquote><p>{inner}</p></blockquote>"));
                search_parts.push(strip_for_search(&lines.join("\n")));
            }
            Block::Code { language, text } => {
                // Mermaid rendering is disabled; the source stays in the
                // Markdown but never reaches the page.
                if language.trim().eq_ignore_ascii_case("mermaid") {
                    continue;
                }
                let class = if language.is_empty() {
                    String::new()
                } else {
                    format!("language-{}", escape(language))
                };
                parts.push(format!(
                    "<pre><code class=\"{class}\">{}</code></pre>",
                    escape(text)
                ));
            }
            Block::List {
                ordered,
                items,
                tag,
                anchor,
            } => {
                if let Some(tag) = tag {
                    parts.push(format!(
                        "<div class=\"blk\" data-tag=\"{0}\"><span class=\"pill\">{0}</span>",
                        tag.as_str()
                    ));
                }
                let list_tag = if *ordered { "ol" } else { "ul" };
                parts.push(format!("<{list_tag}>"));
                for item in items {
                    let rendered = citer
                        .linkify_source_ref(item)
                        .unwrap_or_else(|| inline_format(item));
                    parts.push(format!("<li>{rendered}</li>"));
                    search_parts.push(strip_for_search(item));
                }
                parts.push(format!("</{list_tag}>"));
                if let Some(anchor) = anchor {
                    if let Some(link) = citer.cite_link(&anchor.source_id, &anchor.timecode, false)
                    {
                        parts.push(link);
                    }
                }
                if tag.is_some() {
                    parts.push("</div>".to_string());
                }
            }
            Block::Paragraph { text, tag, anchor } => {
                if let Some(tag) = tag {
                    parts.push(format!(
                        "<div class=\"blk\" data-tag=\"{0}\"><span class=\"pill\">{0}</span>",
                        tag.as_str()
                    ));
                }
                let mut cite_html = String::new();
                if let Some(anchor) = anchor {
                    if let Some(link) = citer.cite_link(&anchor.source_id, &anchor.timecode, false)
                    {
                        cite_html = format!(" {link}");
                    }
                }
                parts.push(format!("<p>{}{cite_html}</p>", inline_format(text)));
                if tag.is_some() {
                    parts.push("</div>".to_string());
                }
                search_parts.push(strip_for_search(text));
            }
        }
    }

    RenderedDoc {
        html: parts.join("\n"),
        search_text: search_parts
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string(),
    }
}
