//! Line-oriented block parser for manuscript Markdown
//!
//! Documents are a restricted Markdown dialect: headings, paragraphs, flat
//! lists, blockquotes, fenced code and horizontal rules, plus two
//! provenance encodings: a leading internal tag marker (`[BACH]` etc.)
//! and a hidden end-of-line anchor comment
//! (`<!-- src: <id> @ <HH:MM:SS> -->`).
//!
//! The parser keeps a single tagged-union "open block" so a paragraph, a
//! list and a blockquote can never accumulate at the same time. An open
//! code fence suspends all other recognition.

/// Internal provenance marker for a paragraph or list. A closed set; the
/// marker only adds a visual pill in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Bach,
    Synth,
    Note,
    Open,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Bach => "BACH",
            Tag::Synth => "SYNTH",
            Tag::Note => "NOTE",
            Tag::Open => "OPEN",
        }
    }

    fn from_marker(word: &str) -> Option<Tag> {
        if word.eq_ignore_ascii_case("BACH") {
            Some(Tag::Bach)
        } else if word.eq_ignore_ascii_case("SYNTH") {
            Some(Tag::Synth)
        } else if word.eq_ignore_ascii_case("NOTE") {
            Some(Tag::Note)
        } else if word.eq_ignore_ascii_case("OPEN") {
            Some(Tag::Open)
        } else {
            None
        }
    }
}

/// A `(source_id, timecode)` pair extracted from an anchor comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub source_id: String,
    pub timecode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
        tag: Option<Tag>,
        anchor: Option<Anchor>,
    },
    List {
        ordered: bool,
        items: Vec<String>,
        tag: Option<Tag>,
        anchor: Option<Anchor>,
    },
    Blockquote {
        lines: Vec<String>,
    },
    Code {
        language: String,
        text: String,
    },
    Rule,
}

/// At most one of these accumulates between flushes.
enum OpenBlock {
    None,
    Paragraph(Vec<String>),
    List { ordered: bool, items: Vec<String> },
    Quote(Vec<String>),
}

struct Fence {
    language: String,
    lines: Vec<String>,
}

struct Parser {
    blocks: Vec<Block>,
    open: OpenBlock,
    fence: Option<Fence>,
    pending_tag: Option<Tag>,
    pending_anchor: Option<Anchor>,
}

pub fn parse_blocks(md: &str) -> Vec<Block> {
    let mut parser = Parser {
        blocks: Vec::new(),
        open: OpenBlock::None,
        fence: None,
        pending_tag: None,
        pending_anchor: None,
    };
    for line in md.lines() {
        parser.line(line);
    }
    parser.finish()
}

impl Parser {
    fn line(&mut self, raw: &str) {
        if let Some(fence) = self.fence.as_mut() {
            if raw.trim().starts_with("```") {
                let text = fence.lines.join("\n").trim_end().to_string();
                let language = std::mem::take(&mut fence.language);
                self.fence = None;
                self.blocks.push(Block::Code { language, text });
            } else {
                fence.lines.push(raw.to_string());
            }
            return;
        }

        let stripped = raw.trim();
        if stripped.starts_with("```") {
            self.flush();
            self.fence = Some(Fence {
                language: stripped[3..].trim().to_string(),
                lines: Vec::new(),
            });
            return;
        }

        if stripped == "---" {
            self.flush();
            self.blocks.push(Block::Rule);
            return;
        }

        if let Some((level, text)) = parse_heading(raw) {
            self.flush();
            self.blocks.push(Block::Heading { level, text });
            return;
        }

        // A quote ends as soon as a line is no longer `>`-prefixed.
        if matches!(self.open, OpenBlock::Quote(_)) && !raw.trim_start().starts_with('>') {
            self.flush();
        }

        // A leading tag marker applies to the block starting on this line,
        // or is held for the next block when the line carries nothing else.
        let mut line = raw.to_string();
        let (tag, rest) = strip_tag_prefix(&line);
        if let Some(tag) = tag {
            let (anchor, rest) = extract_anchor(&rest);
            if let Some(anchor) = anchor {
                self.pending_anchor = Some(anchor);
            }
            self.pending_tag = Some(tag);
            if rest.trim().is_empty() {
                return;
            }
            line = rest;
        }

        if let Some(item) = line.trim_start().strip_prefix("- ") {
            self.push_list_item(item.trim().to_string(), false);
            return;
        }
        if let Some(item) = parse_ordered_item(&line) {
            self.push_list_item(item, true);
            return;
        }

        if let Some(quoted) = line.trim_start().strip_prefix('>') {
            if !matches!(self.open, OpenBlock::Quote(_)) {
                self.flush();
            }
            let quoted = quoted.strip_prefix(' ').unwrap_or(quoted);
            let quoted = quoted.trim_end().to_string();
            match &mut self.open {
                OpenBlock::Quote(lines) => lines.push(quoted),
                open => *open = OpenBlock::Quote(vec![quoted]),
            }
            return;
        }

        // Blank lines are the universal block separator.
        if line.trim().is_empty() {
            self.flush();
            return;
        }

        if !matches!(self.open, OpenBlock::None | OpenBlock::Paragraph(_)) {
            self.flush();
        }
        let trimmed = line.trim().to_string();
        match &mut self.open {
            OpenBlock::Paragraph(lines) => lines.push(trimmed),
            open => *open = OpenBlock::Paragraph(vec![trimmed]),
        }
    }

    fn push_list_item(&mut self, item: String, ordered: bool) {
        if !matches!(self.open, OpenBlock::List { .. }) {
            self.flush();
        }
        match &mut self.open {
            // List type is fixed by the first item.
            OpenBlock::List { items, .. } => items.push(item),
            open => {
                *open = OpenBlock::List {
                    ordered,
                    items: vec![item],
                }
            }
        }
    }

    /// Emit whatever is open. Pending tag/anchor state is consumed either
    /// way, so a stale marker can never leak past a block boundary.
    fn flush(&mut self) {
        let open = std::mem::replace(&mut self.open, OpenBlock::None);
        let tag = self.pending_tag.take();
        let anchor = self.pending_anchor.take();
        match open {
            OpenBlock::None => {}
            OpenBlock::Paragraph(lines) => {
                let joined = lines.join(" ").trim().to_string();
                // An anchor in the paragraph body wins over a tag-line one.
                let (body_anchor, text) = extract_anchor(&joined);
                self.blocks.push(Block::Paragraph {
                    text: text.trim().to_string(),
                    tag,
                    anchor: body_anchor.or(anchor),
                });
            }
            OpenBlock::List { ordered, items } => {
                self.blocks.push(Block::List {
                    ordered,
                    items,
                    tag,
                    anchor,
                });
            }
            OpenBlock::Quote(lines) => {
                self.blocks.push(Block::Blockquote { lines });
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        // An unterminated fence is dropped, matching the flush rules: only
        // paragraph/list/quote buffers survive end of input.
        self.flush();
        self.blocks
    }
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    if !line.starts_with('#') {
        return None;
    }
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some((level as u8, rest.trim().to_string()))
}

fn parse_ordered_item(line: &str) -> Option<String> {
    let rest = line.trim_start();
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = rest[digits..].strip_prefix('.')?;
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some(rest.trim().to_string())
}

/// Split a leading `[TAG]` marker off a line.
pub fn strip_tag_prefix(line: &str) -> (Option<Tag>, String) {
    let Some(rest) = line.strip_prefix('[') else {
        return (None, line.to_string());
    };
    let Some(end) = rest.find(']') else {
        return (None, line.to_string());
    };
    let Some(tag) = Tag::from_marker(&rest[..end]) else {
        return (None, line.to_string());
    };
    (Some(tag), rest[end + 1..].trim_start().to_string())
}

/// Extract the first anchor comment and strip every anchor comment from
/// the text. Two anchors never merge; the first one wins and the linter
/// flags the duplication.
pub fn extract_anchor(text: &str) -> (Option<Anchor>, String) {
    let mut anchor = None;
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((start, end, found)) = scan_anchor_comment(rest) {
        out.push_str(&rest[..start]);
        if anchor.is_none() {
            anchor = Some(found);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    (anchor, out.trim().to_string())
}

/// Strip all anchor comments, keeping the surrounding text.
pub fn strip_anchor_comments(text: &str) -> String {
    extract_anchor(text).1
}

/// Find the next canonical `<!-- src: <id> @ <tc> -->` comment. Returns
/// the byte range of the whole comment and the parsed anchor. Comments
/// that open like one but do not match the grammar are left in place.
pub(crate) fn scan_anchor_comment(text: &str) -> Option<(usize, usize, Anchor)> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find("<!--") {
        let start = offset + pos;
        if let Some((end, anchor)) = match_anchor_body(&text[start + 4..]) {
            return Some((start, start + 4 + end, anchor));
        }
        offset = start + 4;
    }
    None
}

fn match_anchor_body(rest: &str) -> Option<(usize, Anchor)> {
    let mut i = skip_spaces(rest, 0);
    match rest.get(i..i + 4) {
        Some(head) if head.eq_ignore_ascii_case("src:") => {}
        _ => return None,
    }
    i = skip_spaces(rest, i + 4);

    let id_len = rest[i..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        .count();
    if id_len == 0 {
        return None;
    }
    let source_id = rest[i..i + id_len].to_string();
    i = skip_spaces(rest, i + id_len);

    if !rest[i..].starts_with('@') {
        return None;
    }
    i = skip_spaces(rest, i + 1);

    let tc_len = scan_timecode_token(&rest[i..])?;
    let timecode = rest[i..i + tc_len].replace(',', ".");
    i = skip_spaces(rest, i + tc_len);

    if !rest[i..].starts_with("-->") {
        return None;
    }
    Some((i + 3, Anchor { source_id, timecode }))
}

fn skip_spaces(s: &str, mut i: usize) -> usize {
    while i < s.len() && s.as_bytes()[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Match a structural `\d{2}:\d{2}:\d{2}([.,]\d{1,3})?` token at the start
/// of the input; range validation happens when the timecode is used.
pub fn scan_timecode_token(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.len() < 8 {
        return None;
    }
    for (i, &byte) in b[..8].iter().enumerate() {
        let expect_colon = i == 2 || i == 5;
        if expect_colon {
            if byte != b':' {
                return None;
            }
        } else if !byte.is_ascii_digit() {
            return None;
        }
    }
    let mut len = 8;
    if b.len() > 8 && (b[8] == b'.' || b[8] == b',') {
        let frac = b[9..].iter().take_while(|byte| byte.is_ascii_digit()).count();
        if (1..=3).contains(&frac) {
            len = 9 + frac;
        }
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(blocks: &[Block], idx: usize) -> (&str, Option<Tag>, Option<&Anchor>) {
        match &blocks[idx] {
            Block::Paragraph { text, tag, anchor } => (text.as_str(), *tag, anchor.as_ref()),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn one_paragraph_per_blank_separated_chunk() {
        let blocks = parse_blocks("first one\nstill first\n\nsecond\n\n\nthird\n");
        assert_eq!(blocks.len(), 3);
        assert_eq!(para(&blocks, 0).0, "first one still first");
        assert_eq!(para(&blocks, 1).0, "second");
        assert_eq!(para(&blocks, 2).0, "third");
    }

    #[test]
    fn headings_at_each_level() {
        let blocks = parse_blocks("# One\n###### Six\n####### Seven\n");
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                text: "One".to_string()
            }
        );
        assert_eq!(
            blocks[1],
            Block::Heading {
                level: 6,
                text: "Six".to_string()
            }
        );
        // Seven hashes is not a heading; it falls through to a paragraph.
        assert_eq!(para(&blocks, 2).0, "####### Seven");
    }

    #[test]
    fn tagged_paragraph_with_inline_anchor() {
        let blocks =
            parse_blocks("[BACH] The mind predicts its own states. <!-- src: yt_abc123 @ 00:12:34 -->\n");
        let (text, tag, anchor) = para(&blocks, 0);
        assert_eq!(text, "The mind predicts its own states.");
        assert_eq!(tag, Some(Tag::Bach));
        assert_eq!(
            anchor,
            Some(&Anchor {
                source_id: "yt_abc123".to_string(),
                timecode: "00:12:34".to_string()
            })
        );
    }

    #[test]
    fn tag_only_line_marks_the_next_block() {
        let blocks = parse_blocks("[SYNTH]\nA synthesized claim.\n");
        let (text, tag, _) = para(&blocks, 0);
        assert_eq!(text, "A synthesized claim.");
        assert_eq!(tag, Some(Tag::Synth));
    }

    #[test]
    fn tag_only_line_with_anchor_carries_both_forward() {
        let blocks = parse_blocks("[NOTE] <!-- src: cc_9 @ 00:00:10 -->\n- item one\n- item two\n");
        match &blocks[0] {
            Block::List {
                ordered,
                items,
                tag,
                anchor,
            } => {
                assert!(!ordered);
                assert_eq!(items, &["item one", "item two"]);
                assert_eq!(*tag, Some(Tag::Note));
                assert_eq!(anchor.as_ref().map(|a| a.source_id.as_str()), Some("cc_9"));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn body_anchor_wins_over_tag_line_anchor() {
        let blocks = parse_blocks(
            "[BACH] <!-- src: first @ 00:00:01 -->\ntext body <!-- src: second @ 00:00:02 -->\n",
        );
        let (text, _, anchor) = para(&blocks, 0);
        assert_eq!(text, "text body");
        assert_eq!(anchor.map(|a| a.source_id.as_str()), Some("second"));
    }

    #[test]
    fn pending_tag_does_not_leak_past_a_flush() {
        let blocks = parse_blocks("[OPEN]\n\nuntagged paragraph\n");
        let (_, tag, _) = para(&blocks, 0);
        assert_eq!(tag, None);
    }

    #[test]
    fn duplicate_anchor_keeps_first_and_strips_both() {
        let (anchor, text) =
            extract_anchor("a <!-- src: one @ 00:00:01 --> b <!-- src: two @ 00:00:02 -->");
        assert_eq!(anchor.map(|a| a.source_id), Some("one".to_string()));
        assert_eq!(text, "a  b");
    }

    #[test]
    fn fences_suspend_all_other_recognition() {
        let blocks = parse_blocks("```rust\n# not a heading\n- not a list\n\ncode\n```\nafter\n");
        assert_eq!(
            blocks[0],
            Block::Code {
                language: "rust".to_string(),
                text: "# not a heading\n- not a list\n\ncode".to_string()
            }
        );
        assert_eq!(para(&blocks, 1).0, "after");
    }

    #[test]
    fn unterminated_fence_is_dropped() {
        let blocks = parse_blocks("before\n\n```\ndangling\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(para(&blocks, 0).0, "before");
    }

    #[test]
    fn rule_and_quote_blocks() {
        let blocks = parse_blocks("---\n> quoted line\n> second line\nplain\n");
        assert_eq!(blocks[0], Block::Rule);
        assert_eq!(
            blocks[1],
            Block::Blockquote {
                lines: vec!["quoted line".to_string(), "second line".to_string()]
            }
        );
        assert_eq!(para(&blocks, 2).0, "plain");
    }

    #[test]
    fn quote_strips_one_leading_space_only() {
        let blocks = parse_blocks(">  indented\n");
        assert_eq!(
            blocks[0],
            Block::Blockquote {
                lines: vec![" indented".to_string()]
            }
        );
    }

    #[test]
    fn ordered_list_type_is_fixed_by_first_item() {
        let blocks = parse_blocks("1. one\n2. two\n- stray dash item\n");
        match &blocks[0] {
            Block::List { ordered, items, .. } => {
                assert!(*ordered);
                assert_eq!(items.len(), 3);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn list_interrupts_paragraph_and_vice_versa() {
        let blocks = parse_blocks("para text\n- item\ntrailing para\n");
        assert_eq!(para(&blocks, 0).0, "para text");
        assert!(matches!(blocks[1], Block::List { .. }));
        assert_eq!(para(&blocks, 2).0, "trailing para");
    }

    #[test]
    fn comma_fraction_is_normalized_to_dot() {
        let (anchor, _) = extract_anchor("x <!-- src: a_1 @ 00:00:01,250 -->");
        assert_eq!(anchor.map(|a| a.timecode), Some("00:00:01.250".to_string()));
    }

    #[test]
    fn malformed_comments_are_left_in_the_text() {
        let (anchor, text) = extract_anchor("x <!-- src: bad syntax --> y");
        assert_eq!(anchor, None);
        assert_eq!(text, "x <!-- src: bad syntax --> y");
    }
}
