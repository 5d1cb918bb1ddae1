//! Citation link resolution
//!
//! Resolution is total: an unknown source id or a source without a URL
//! renders nothing, never an error, so the site always builds even with
//! lint debt outstanding.

use crate::blocks::scan_timecode_token;
use crate::format::FormatRules;
use crate::inline::{escape, escape_attr, inline_format};
use crate::sources::SourceRegistry;
use crate::timecode::{seconds_to_hhmmss, timecoded_url};

/// Optional enrichment: approximate seconds attributable to the primary
/// speaker of a source. Absence only affects tooltip content, never link
/// resolution.
pub trait SpeakerTime {
    fn seconds_for(&self, source_id: &str) -> Option<u32>;
}

/// The always-absent capability.
pub struct NoSpeakerTime;

impl SpeakerTime for NoSpeakerTime {
    fn seconds_for(&self, _source_id: &str) -> Option<u32> {
        None
    }
}

/// Build-scoped citation renderer over the read-only registry.
pub struct Citer<'a> {
    registry: &'a SourceRegistry,
    rules: FormatRules,
    speaker_time: &'a dyn SpeakerTime,
}

impl<'a> Citer<'a> {
    pub fn new(registry: &'a SourceRegistry, speaker_time: &'a dyn SpeakerTime) -> Self {
        Self {
            registry,
            rules: FormatRules::default(),
            speaker_time,
        }
    }

    pub fn with_rules(mut self, rules: FormatRules) -> Self {
        self.rules = rules;
        self
    }

    /// Render an anchor as a citation link, or `None` when the source does
    /// not resolve to a URL.
    pub fn cite_link(&self, source_id: &str, timecode: &str, show_time: bool) -> Option<String> {
        let record = self.registry.get(source_id)?;
        let url = record.url.trim();
        if url.is_empty() {
            return None;
        }

        let tc = timecode.trim().replace(',', ".");
        let href = timecoded_url(url, &tc);

        let format = self.rules.classify(record);
        let title = record
            .title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let title = if title.is_empty() { source_id } else { &title };
        let label = format!("{}: {}", format.as_str(), title);

        let mut tooltip = vec![label.clone(), format!("{source_id} @ {tc}")];
        if let Some(seconds) = self.speaker_time.seconds_for(source_id) {
            tooltip.push(format!(
                "Speaker time: {} (approx)",
                seconds_to_hhmmss(seconds as i64)
            ));
        }
        let tooltip = tooltip.join(" | ");

        let mut html = format!(
            "<a class=\"cite\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" title=\"{}\">{}</a>",
            escape_attr(&href),
            escape_attr(&tooltip),
            escape(&label)
        );
        if show_time {
            html.push_str(&format!(
                "<span class=\"cite_time\"> @ {}</span>",
                escape(&tc)
            ));
        }
        Some(html)
    }

    /// Turn a visible `source_id @ HH:MM:SS ...` list item into a citation
    /// link plus its inline-formatted tail. `None` when the item does not
    /// match the pattern or the id does not resolve.
    pub fn linkify_source_ref(&self, text: &str) -> Option<String> {
        let (source_id, timecode, rest) = split_source_ref(text.trim())?;
        let linked = self.cite_link(source_id, &timecode, true)?;
        let tail = if rest.is_empty() {
            String::new()
        } else {
            inline_format(rest)
        };
        Some(linked + &tail)
    }
}

/// Match `<id> @ <HH:MM:SS[.mmm]>` at the start of a trimmed list item.
/// The timecode must end at a word boundary; the remainder is returned
/// verbatim (leading whitespace included, e.g. " (keywords: ...)").
pub fn split_source_ref(text: &str) -> Option<(&str, String, &str)> {
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
    let rest = &after_ws[1..];
    let after_at = rest.trim_start();
    if after_at.len() == rest.len() {
        return None;
    }

    let mut tc_len = scan_timecode_token(after_at)?;
    if ends_at_word(after_at, tc_len) {
        // Retry without the fractional part before giving up.
        if tc_len > 8 && !ends_at_word(after_at, 8) {
            tc_len = 8;
        } else {
            return None;
        }
    }
    let timecode = after_at[..tc_len].replace(',', ".");
    Some((source_id, timecode, &after_at[tc_len..]))
}

fn ends_at_word(s: &str, len: usize) -> bool {
    s[len..]
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
}
