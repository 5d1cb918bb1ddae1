//! Book and series exports
//!
//! Two renditions of the manuscript exist: an internal one that keeps the
//! drafting tags and hidden anchors, and a public one with all internal
//! markers stripped and the anchors section renamed to "References".

use crate::blocks::{Tag, strip_tag_prefix};
use crate::cite::split_source_ref;

pub const ANCHORS_HEADING: &str = "## Anchors (sources + timecodes)";
pub const REFERENCES_HEADING: &str = "## References";

/// Strip internal markers from a chapter for reader-facing exports:
/// rename the anchors heading, drop trailing anchor comments and leading
/// tags, remove `(keywords: ...)` tails from anchor bullets, and collapse
/// blank-line runs.
pub fn public_transform(text: &str) -> String {
    let mut out_lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if raw.trim() == ANCHORS_HEADING {
            out_lines.push(REFERENCES_HEADING.to_string());
            continue;
        }

        let line = strip_trailing_src_comment(raw);
        let line = strip_tag_prefix(&line).1;
        let line = strip_keywords_tail(&line);
        out_lines.push(line);
    }

    let mut normalized: Vec<String> = Vec::new();
    let mut blank = 0;
    for line in out_lines {
        if line.trim().is_empty() {
            blank += 1;
            if blank > 1 {
                continue;
            }
        } else {
            blank = 0;
        }
        normalized.push(line);
    }

    let mut out = normalized.join("\n").trim_end().to_string();
    out.push('\n');
    out
}

/// Remove an end-of-line `<!-- src: ... -->` comment, plus the whitespace
/// in front of it. Comments earlier in the line are left alone.
fn strip_trailing_src_comment(line: &str) -> String {
    let mut offset = 0;
    while let Some(pos) = line[offset..].find("<!--") {
        let start = offset + pos;
        if let Some(stripped) = match_trailing_src_comment(line, start) {
            return stripped;
        }
        offset = start + 4;
    }
    line.to_string()
}

fn match_trailing_src_comment(line: &str, start: usize) -> Option<String> {
    let body = &line[start + 4..];
    let trimmed = body.trim_start();
    match trimmed.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("src:") => {}
        _ => return None,
    }
    let close = body.find("-->")?;
    if body[..close].contains('>') {
        return None;
    }
    if !body[close + 3..].trim().is_empty() {
        return None;
    }
    Some(line[..start].trim_end().to_string())
}

/// Turn `- <id> @ <HH:MM:SS> (keywords: ...)` into `- <id> @ <HH:MM:SS>`.
fn strip_keywords_tail(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let Some(item) = line.trim_start().strip_prefix("- ") else {
        return line.to_string();
    };
    let Some((source_id, timecode, rest)) = split_source_ref(item.trim_start()) else {
        return line.to_string();
    };
    if timecode.len() != 8 {
        // Keywords bullets never carry fractional timecodes.
        return line.to_string();
    }
    let tail = rest.trim_start();
    if !tail.starts_with("(keywords:") || !tail.trim_end().ends_with(')') {
        return line.to_string();
    }
    format!("{}- {source_id} @ {timecode}", &line[..indent_len])
}

/// First `# Chapter N: <title>` heading, or the fallback.
pub fn chapter_title(text: &str, fallback: &str) -> String {
    for line in text.lines() {
        if let Some(title) = parse_chapter_heading(line.trim()) {
            return title;
        }
    }
    fallback.to_string()
}

fn parse_chapter_heading(line: &str) -> Option<String> {
    let rest = line.strip_prefix("# ")?;
    strip_chapter_prefix_opt(rest.trim())
}

/// Drop a leading `Chapter N:` from a heading, if present.
pub fn strip_chapter_prefix(heading: &str) -> String {
    strip_chapter_prefix_opt(heading).unwrap_or_else(|| heading.trim().to_string())
}

fn strip_chapter_prefix_opt(heading: &str) -> Option<String> {
    let rest = heading.trim();
    let after = rest
        .strip_prefix("Chapter ")
        .or_else(|| rest.strip_prefix("chapter "))?;
    let digits = after.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let after = after[digits..].strip_prefix(':')?;
    let title = after.trim();
    if title.is_empty() {
        return None;
    }
    Some(title.to_string())
}

/// First `# ` heading of a document, whitespace-collapsed; fallback
/// otherwise. Used for blog post titles.
pub fn first_h1(text: &str, fallback: &str) -> String {
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("# ") {
            let title = rest.split_whitespace().collect::<Vec<_>>().join(" ");
            if !title.is_empty() {
                return title;
            }
        }
    }
    fallback.to_string()
}

/// Internal full-fidelity concatenation of the book.
pub fn combined_book(
    title: &str,
    subtitle: &str,
    chapters: &[String],
    references: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push(format!("# {title}\n"));
    parts.push(format!("{subtitle}\n"));
    parts.push("---\n".to_string());
    for chapter in chapters {
        parts.push(format!("{}\n", chapter.trim_end()));
        parts.push("---\n".to_string());
    }
    if let Some(references) = references {
        parts.push(format!("{}\n", references.trim_end()));
    }
    let mut out = parts.join("\n").trim().to_string();
    out.push('\n');
    out
}

/// Reader-facing concatenation: every chapter goes through
/// [`public_transform`] first.
pub fn combined_public_book(
    title: &str,
    subtitle: &str,
    chapters: &[String],
    references: Option<&str>,
) -> String {
    let transformed: Vec<String> = chapters.iter().map(|c| public_transform(c)).collect();
    combined_book(title, subtitle, &transformed, references)
}

/// A chapter as a standalone series post: transformed body with the H1
/// rewritten to the bare chapter title.
pub fn export_chapter(text: &str, fallback_title: &str) -> (String, String) {
    let title = chapter_title(text, fallback_title);
    let body = public_transform(text);
    let mut lines: Vec<String> = body.lines().map(str::to_string).collect();
    if lines.first().is_some_and(|line| line.starts_with("# ")) {
        lines[0] = format!("# {title}");
    } else {
        lines.insert(0, String::new());
        lines.insert(0, format!("# {title}"));
    }
    let mut body = lines.join("\n").trim_end().to_string();
    body.push('\n');
    (title, body)
}
