//! Speaker-time enrichment from diarization sidecar files
//!
//! `transcripts/_speakers/<source_id>.speakers.json` holds segments
//! attributed to the primary speaker. The files are local-only (typically
//! gitignored); anything missing or malformed degrades to "no enrichment".

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use mindpress_core::cite::SpeakerTime;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct SpeakerSidecar {
    #[serde(default)]
    speaker_segments: Vec<SpeakerSegment>,
}

#[derive(Debug, Deserialize)]
struct SpeakerSegment {
    start_s: Option<f64>,
    end_s: Option<f64>,
}

/// Sums the segment durations per source id, memoized for the build.
pub struct SidecarSpeakerTime {
    dir: PathBuf,
    cache: RefCell<HashMap<String, Option<u32>>>,
}

impl SidecarSpeakerTime {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn compute(&self, source_id: &str) -> Option<u32> {
        let path = self.dir.join(format!("{source_id}.speakers.json"));
        let raw = std::fs::read_to_string(path).ok()?;
        let sidecar: SpeakerSidecar = serde_json::from_str(&raw).ok()?;
        let mut total = 0.0;
        for segment in &sidecar.speaker_segments {
            if let (Some(start), Some(end)) = (segment.start_s, segment.end_s) {
                if end > start {
                    total += end - start;
                }
            }
        }
        let seconds = total.round() as i64;
        if seconds <= 0 {
            return None;
        }
        u32::try_from(seconds).ok()
    }
}

impl SpeakerTime for SidecarSpeakerTime {
    fn seconds_for(&self, source_id: &str) -> Option<u32> {
        if let Some(cached) = self.cache.borrow().get(source_id) {
            return *cached;
        }
        let seconds = self.compute(source_id);
        self.cache.borrow_mut().insert(source_id.to_string(), seconds);
        seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sums_valid_segments_and_rounds() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join("yt_abc.speakers.json"),
            r#"{"speaker_segments": [
                {"start_s": 0.0, "end_s": 10.4},
                {"start_s": 20.0, "end_s": 20.0},
                {"start_s": 30.0, "end_s": 31.0}
            ]}"#,
        )
        .expect("write sidecar");
        let speakers = SidecarSpeakerTime::new(temp.path().to_path_buf());
        assert_eq!(speakers.seconds_for("yt_abc"), Some(11));
        // Memoized answer survives file deletion.
        fs::remove_file(temp.path().join("yt_abc.speakers.json")).expect("remove");
        assert_eq!(speakers.seconds_for("yt_abc"), Some(11));
    }

    #[test]
    fn missing_or_malformed_sidecars_yield_none() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("bad.speakers.json"), "not json").expect("write");
        fs::write(temp.path().join("empty.speakers.json"), r#"{"speaker_segments": []}"#)
            .expect("write");
        let speakers = SidecarSpeakerTime::new(temp.path().to_path_buf());
        assert_eq!(speakers.seconds_for("absent"), None);
        assert_eq!(speakers.seconds_for("bad"), None);
        assert_eq!(speakers.seconds_for("empty"), None);
    }

    #[test]
    fn missing_directory_is_fine() {
        let speakers = SidecarSpeakerTime::new(PathBuf::from("/nonexistent/_speakers"));
        assert_eq!(speakers.seconds_for("yt_abc"), None);
    }
}
