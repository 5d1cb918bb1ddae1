//! Provenance linter
//!
//! Validates the two canonical citation encodings against the source
//! registry and rejects ad-hoc variants. Findings never fail the site
//! build; only the standalone lint command turns them into a non-zero
//! exit.

use std::fmt;

use crate::blocks::{Tag, scan_timecode_token, strip_tag_prefix};
use crate::book::ANCHORS_HEADING;
use crate::sources::SourceRegistry;
use crate::timecode::parse_timecode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub path: String,
    pub line_no: usize,
    pub message: String,
    pub line: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}\n  {}", self.path, self.line_no, self.message, self.line)
    }
}

/// Lint one document. `is_chapter` enables the anchors-section rules that
/// only apply to manuscript chapters.
pub fn lint_text(
    path: &str,
    text: &str,
    registry: &SourceRegistry,
    is_chapter: bool,
) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    let mut in_anchors_section = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\n');
        let push = |findings: &mut Vec<LintFinding>, message: String| {
            findings.push(LintFinding {
                path: path.to_string(),
                line_no,
                message,
                line: line.to_string(),
            });
        };

        if is_chapter {
            if line.trim() == ANCHORS_HEADING {
                in_anchors_section = true;
            } else if in_anchors_section && line.starts_with("## ") {
                in_anchors_section = false;
            }
        }

        let comments = src_comment_spans(line);

        // Hidden comments do not belong inside list items.
        if !comments.is_empty() && is_list_item(line) {
            push(
                &mut findings,
                "Do not use <!-- src: ... --> inside list items; use '- <source_id> @ <HH:MM:SS>' instead."
                    .to_string(),
            );
        }

        if !comments.is_empty() {
            match canonical_src_comment(line) {
                None => push(
                    &mut findings,
                    "Non-canonical src comment; must be '... <!-- src: <source_id> @ <HH:MM:SS> -->' at end of line."
                        .to_string(),
                ),
                Some((source_id, timecode)) => {
                    if !registry.contains(&source_id) {
                        push(
                            &mut findings,
                            format!("Unknown source_id '{source_id}' (not in sources/sources.csv)."),
                        );
                    }
                    if parse_timecode(&timecode).is_none() {
                        push(
                            &mut findings,
                            format!("Invalid timecode '{timecode}' (expected HH:MM:SS)."),
                        );
                    }
                    if comments.len() > 1 {
                        push(
                            &mut findings,
                            "Multiple src comments on one line; use exactly one.".to_string(),
                        );
                    }
                }
            }
        }

        if let Some((source_id, timecode)) = list_cite(line) {
            if !registry.contains(&source_id) {
                push(
                    &mut findings,
                    format!("Unknown source_id '{source_id}' (not in sources/sources.csv)."),
                );
            }
            if parse_timecode(&timecode).is_none() {
                push(
                    &mut findings,
                    format!("Invalid timecode '{timecode}' (expected HH:MM:SS)."),
                );
            }
        }

        if in_anchors_section && line.trim_start().starts_with("- ") {
            match anchors_bullet(line) {
                None => push(
                    &mut findings,
                    "Chapter anchor bullets must be '- <source_id> @ <HH:MM:SS> (keywords: ...)'."
                        .to_string(),
                ),
                Some((source_id, timecode)) => {
                    if !registry.contains(&source_id) {
                        push(
                            &mut findings,
                            format!("Unknown source_id '{source_id}' (not in sources/sources.csv)."),
                        );
                    }
                    if parse_timecode(&timecode).is_none() {
                        push(
                            &mut findings,
                            format!("Invalid timecode '{timecode}' (expected HH:MM:SS)."),
                        );
                    }
                }
            }
        }

        // Visible citations belong in list items, not prose.
        let without_comments = remove_src_comments(line);
        if list_cite(&without_comments).is_none() {
            for (source_id, timecode) in visible_cite_tokens(&without_comments) {
                if !registry.contains(&source_id) {
                    continue;
                }
                if parse_timecode(&timecode).is_some() {
                    push(
                        &mut findings,
                        "Visible 'source_id @ timecode' in prose; use a hidden end-of-line comment instead: <!-- src: ... -->."
                            .to_string(),
                    );
                }
            }
        }

        // Verbatim-sourced lines must carry their provenance inline.
        if strip_tag_prefix(line).0 == Some(Tag::Bach) && canonical_src_comment(line).is_none() {
            push(
                &mut findings,
                "[BACH] lines must include a canonical end-of-line src comment: <!-- src: <source_id> @ <HH:MM:SS> -->."
                    .to_string(),
            );
        }
    }

    findings
}

fn is_list_item(line: &str) -> bool {
    let rest = line.trim_start();
    if let Some(after) = rest.strip_prefix(['-', '*', '+']) {
        return after.starts_with(|c: char| c.is_whitespace());
    }
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0
        && rest[digits..]
            .strip_prefix('.')
            .is_some_and(|after| after.starts_with(|c: char| c.is_whitespace()))
}

/// Byte spans of every `<!-- src: ... -->` comment, canonical or not.
fn src_comment_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(pos) = line[offset..].find("<!--") {
        let start = offset + pos;
        let body = &line[start + 4..];
        let trimmed = body.trim_start();
        let is_src = matches!(trimmed.get(..4), Some(head) if head.eq_ignore_ascii_case("src:"));
        match (is_src, body.find("-->")) {
            (true, Some(close)) => {
                spans.push((start, start + 4 + close + 3));
                offset = start + 4 + close + 3;
            }
            _ => offset = start + 4,
        }
    }
    spans
}

fn remove_src_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for (start, end) in src_comment_spans(line) {
        out.push_str(&line[last..start]);
        last = end;
    }
    out.push_str(&line[last..]);
    out
}

/// The canonical end-of-line form: nothing but whitespace may follow the
/// closing `-->`.
fn canonical_src_comment(line: &str) -> Option<(String, String)> {
    let mut rest = line;
    while let Some((_start, end, anchor)) = crate::blocks::scan_anchor_comment(rest) {
        if rest[end..].trim().is_empty() {
            return Some((anchor.source_id, anchor.timecode));
        }
        rest = &rest[end..];
    }
    None
}

/// Visible list citation: `- <id> @ <tc>` with any list marker.
fn list_cite(line: &str) -> Option<(String, String)> {
    let rest = line.trim_start();
    let rest = if let Some(after) = rest.strip_prefix(['-', '*', '+']) {
        after
    } else {
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        rest[digits..].strip_prefix('.')?
    };
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    cite_token_at(rest.trim_start(), true)
}

/// Chapter anchor bullet with a required `(keywords: ...)` tail and a
/// whole-second timecode.
fn anchors_bullet(line: &str) -> Option<(String, String)> {
    let item = line.trim_start().strip_prefix("- ")?;
    let item = item.trim_start();
    let (source_id, timecode) = cite_token_at(item, false)?;
    let consumed = consumed_len(item, &source_id, &timecode);
    let tail = item[consumed..].trim_start();
    let tail = tail.strip_prefix("(keywords:")?;
    let tail = tail.trim_end();
    if !tail.ends_with(')') || tail.len() < 2 {
        return None;
    }
    Some((source_id, timecode))
}

fn consumed_len(item: &str, source_id: &str, _timecode: &str) -> usize {
    // The id, the `@` separator with its whitespace, and the 8-char clock.
    let after_id = &item[source_id.len()..];
    let ws1 = after_id.len() - after_id.trim_start().len();
    let after_at = &after_id[ws1 + 1..];
    let ws2 = after_at.len() - after_at.trim_start().len();
    source_id.len() + ws1 + 1 + ws2 + 8
}

/// Match `<id> @ <tc>` at the start of `text`. `allow_fraction` mirrors
/// the difference between list citations (fractions allowed) and chapter
/// anchor bullets (whole seconds only).
fn cite_token_at(text: &str, allow_fraction: bool) -> Option<(String, String)> {
    let id_len = text
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        .count();
    if id_len == 0 {
        return None;
    }
    let source_id = &text[..id_len];

    let rest = &text[id_len..];
    let after_ws = rest.trim_start();
    if after_ws.len() == rest.len() || !after_ws.starts_with('@') {
        return None;
    }
    let after_at = after_ws[1..].trim_start();

    let mut tc_len = scan_timecode_token(after_at)?;
    if !allow_fraction {
        tc_len = tc_len.min(8);
    }
    if word_follows(after_at, tc_len) {
        if tc_len > 8 && !word_follows(after_at, 8) {
            tc_len = 8;
        } else {
            return None;
        }
    }
    Some((
        source_id.to_string(),
        after_at[..tc_len].replace(',', "."),
    ))
}

fn word_follows(s: &str, len: usize) -> bool {
    s[len..]
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
}

/// Stray `<id> @ <tc>` tokens anywhere in prose.
fn visible_cite_tokens(line: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < line.len() {
        let is_id_byte =
            bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'-';
        let at_boundary = i == 0
            || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_' || bytes[i - 1] == b'-');
        if is_id_byte && at_boundary {
            if let Some((source_id, timecode)) = cite_token_at(&line[i..], true) {
                let len = source_id.len();
                out.push((source_id, timecode));
                i += len.max(1);
                continue;
            }
        }
        i += 1;
    }
    out
}
