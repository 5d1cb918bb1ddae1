//! Presentation-format classification for citation labels
//!
//! Sources collapse into one of three reader-facing formats. An explicit
//! `format=` token in the source notes wins; otherwise keyword heuristics
//! over the metadata decide. The keyword lists are data on `FormatRules`
//! so they can be tested and extended without touching the classifier.

use crate::sources::{SourceRecord, parse_notes_kv};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationFormat {
    Talk,
    Interview,
    Essay,
}

impl PresentationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationFormat::Talk => "talk",
            PresentationFormat::Interview => "interview",
            PresentationFormat::Essay => "essay",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormatRules {
    /// Synonyms accepted in an explicit `format=` note.
    pub synonyms: Vec<(&'static str, PresentationFormat)>,
    /// Title/creator keywords that mark a recording as an interview.
    pub interview_keywords: Vec<&'static str>,
    /// Creators whose recordings are interviews regardless of title.
    pub interview_creators: Vec<&'static str>,
}

impl Default for FormatRules {
    fn default() -> Self {
        Self {
            synonyms: vec![
                ("podcast", PresentationFormat::Interview),
                ("conversation", PresentationFormat::Interview),
                ("qa", PresentationFormat::Interview),
                ("lecture", PresentationFormat::Talk),
                ("presentation", PresentationFormat::Talk),
                ("keynote", PresentationFormat::Talk),
                ("article", PresentationFormat::Essay),
                ("post", PresentationFormat::Essay),
                ("blog", PresentationFormat::Essay),
            ],
            interview_keywords: vec![
                "interview",
                "podcast",
                "conversation",
                "salon",
                "debate",
                "q&a",
                "qa",
            ],
            interview_creators: vec!["lex fridman", "curt jaimungal", "street talk"],
        }
    }
}

impl FormatRules {
    /// Normalize an explicit format value; `None` when unrecognized.
    pub fn normalize(&self, value: &str) -> Option<PresentationFormat> {
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            return None;
        }
        match value.as_str() {
            "talk" => return Some(PresentationFormat::Talk),
            "interview" => return Some(PresentationFormat::Interview),
            "essay" => return Some(PresentationFormat::Essay),
            _ => {}
        }
        self.synonyms
            .iter()
            .find(|(synonym, _)| *synonym == value)
            .map(|(_, format)| *format)
    }

    pub fn classify(&self, record: &SourceRecord) -> PresentationFormat {
        let kv = parse_notes_kv(&record.notes);
        if let Some(format) = kv.get("format").and_then(|value| self.normalize(value)) {
            return format;
        }

        let kind = record.kind.trim().to_lowercase();
        let url = record.url.trim().to_lowercase();

        // Written sources.
        if kind == "web" {
            return PresentationFormat::Essay;
        }
        // CCC recordings are almost always talks.
        if kind == "ccc" || url.contains("media.ccc.de") {
            return PresentationFormat::Talk;
        }

        let hay = format!(
            "{} {}",
            record.title.trim().to_lowercase(),
            record.creator_or_channel.trim().to_lowercase()
        );
        if self.interview_keywords.iter().any(|kw| hay.contains(kw))
            || self.interview_creators.iter().any(|kw| hay.contains(kw))
        {
            return PresentationFormat::Interview;
        }

        PresentationFormat::Talk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, url: &str, title: &str, creator: &str, notes: &str) -> SourceRecord {
        SourceRecord {
            source_id: "s".to_string(),
            title: title.to_string(),
            kind: kind.to_string(),
            creator_or_channel: creator.to_string(),
            url: url.to_string(),
            notes: notes.to_string(),
            ..SourceRecord::default()
        }
    }

    #[test]
    fn explicit_format_note_wins() {
        let rules = FormatRules::default();
        let rec = record("youtube", "https://youtu.be/x", "Lex Fridman #100", "", "format=essay");
        assert_eq!(rules.classify(&rec), PresentationFormat::Essay);
    }

    #[test]
    fn synonyms_normalize() {
        let rules = FormatRules::default();
        assert_eq!(rules.normalize("keynote"), Some(PresentationFormat::Talk));
        assert_eq!(rules.normalize("Podcast"), Some(PresentationFormat::Interview));
        assert_eq!(rules.normalize("blog"), Some(PresentationFormat::Essay));
        assert_eq!(rules.normalize("mixtape"), None);
    }

    #[test]
    fn web_kind_is_essay() {
        let rules = FormatRules::default();
        let rec = record("web", "https://example.com", "Some Essay", "", "");
        assert_eq!(rules.classify(&rec), PresentationFormat::Essay);
    }

    #[test]
    fn ccc_is_talk_by_kind_or_url() {
        let rules = FormatRules::default();
        assert_eq!(
            rules.classify(&record("ccc", "", "36c3 talk", "", "")),
            PresentationFormat::Talk
        );
        assert_eq!(
            rules.classify(&record("", "https://media.ccc.de/v/x", "x", "", "")),
            PresentationFormat::Talk
        );
    }

    #[test]
    fn interview_keywords_in_title_or_creator() {
        let rules = FormatRules::default();
        assert_eq!(
            rules.classify(&record("youtube", "", "A conversation about minds", "", "")),
            PresentationFormat::Interview
        );
        assert_eq!(
            rules.classify(&record("youtube", "", "On cognition", "Lex Fridman", "")),
            PresentationFormat::Interview
        );
    }

    #[test]
    fn default_is_talk() {
        let rules = FormatRules::default();
        assert_eq!(
            rules.classify(&record("youtube", "", "Machine dreams", "media lab", "")),
            PresentationFormat::Talk
        );
    }
}
