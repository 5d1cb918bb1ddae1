//! Source registry: citable source metadata keyed by source id
//!
//! Loaded once from `sources/sources.csv` at the start of a build and
//! read-only afterwards.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub creator_or_channel: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    records: BTreeMap<String, SourceRecord>,
}

impl SourceRegistry {
    pub fn from_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let mut out = BTreeMap::new();
        for record in records {
            let sid = record.source_id.trim().to_string();
            if sid.is_empty() {
                continue;
            }
            out.insert(sid, record);
        }
        Self { records: out }
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, RegistryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let mut records = Vec::new();
        for row in csv_reader.deserialize::<SourceRecord>() {
            records.push(row?);
        }
        Ok(Self::from_records(records))
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceRecord> {
        self.records.get(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.records.contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sources marked `curation_status=keep` in their notes, ordered by
    /// published date then id. These feed the sources index page.
    pub fn kept_sources(&self) -> Vec<&SourceRecord> {
        let mut keep: Vec<&SourceRecord> = self
            .records
            .values()
            .filter(|record| {
                parse_notes_kv(&record.notes).get("curation_status").map(String::as_str)
                    == Some("keep")
            })
            .collect();
        keep.sort_by(|a, b| {
            (a.published_date.as_str(), a.source_id.as_str())
                .cmp(&(b.published_date.as_str(), b.source_id.as_str()))
        });
        keep
    }
}

/// Parse free-form notes as whitespace-separated `key=value` tokens.
/// Tokens without `=` or with an empty side are skipped.
pub fn parse_notes_kv(notes: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for token in notes.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        out.insert(key.to_string(), value.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
source_id,title,kind,creator_or_channel,url,published_date,language,notes
yt_abc123,Talk,youtube,Some Channel,https://youtube.com/watch?v=abc123,2020-01-01,en,curation_status=keep format=talk
ccc_999,Congress Talk,ccc,CCC,https://media.ccc.de/v/talk-1,2019-12-28,en,curation_status=keep
web_1,An Essay,web,Author,https://example.com/essay,2021-06-01,en,
,skipped row,web,,,,,
";

    #[test]
    fn loads_rows_and_skips_empty_ids() {
        let registry = SourceRegistry::from_reader(CSV.as_bytes()).expect("load");
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("yt_abc123"));
        assert!(!registry.contains("skipped"));
        assert_eq!(registry.get("web_1").map(|r| r.kind.as_str()), Some("web"));
    }

    #[test]
    fn kept_sources_sorted_by_date_then_id() {
        let registry = SourceRegistry::from_reader(CSV.as_bytes()).expect("load");
        let kept: Vec<&str> = registry
            .kept_sources()
            .iter()
            .map(|r| r.source_id.as_str())
            .collect();
        assert_eq!(kept, ["ccc_999", "yt_abc123"]);
    }

    #[test]
    fn notes_kv_parsing() {
        let kv = parse_notes_kv("curation_status=keep  format=talk stray =x y=");
        assert_eq!(kv.get("curation_status").map(String::as_str), Some("keep"));
        assert_eq!(kv.get("format").map(String::as_str), Some("talk"));
        assert_eq!(kv.len(), 2);
    }
}
