//! Timecode parsing and provider deep links
//!
//! Timecodes are `HH:MM:SS` with an optional `.mmm` (or `,mmm`) fraction.
//! Callers treat a failed parse as "no timecode", never as a build error.

/// Parse `HH:MM:SS[.mmm]` into whole seconds. All clock fields are
/// range-checked (hours below 24); the fraction is validated (at most
/// three digits) but dropped from the result.
pub fn parse_timecode(tc: &str) -> Option<u32> {
    let trimmed = tc.trim();
    let (clock, frac) = match trimmed.split_once(['.', ',']) {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (trimmed, None),
    };
    if let Some(frac) = frac {
        if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let mut fields = clock.split(':');
    let hours = two_digit_field(fields.next()?)?;
    let minutes = two_digit_field(fields.next()?)?;
    let seconds = two_digit_field(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

fn two_digit_field(field: &str) -> Option<u32> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Format whole seconds as zero-padded `HH:MM:SS`, clamped at zero.
pub fn seconds_to_hhmmss(total_s: i64) -> String {
    let mut s = total_s.max(0);
    let h = s / 3600;
    s -= h * 3600;
    let m = s / 60;
    s -= m * 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Append a provider-specific time offset to a media URL.
///
/// Unknown providers and unparsable timecodes return the URL unchanged.
pub fn timecoded_url(url: &str, timecode: &str) -> String {
    let u = url.trim();
    let Some(sec) = parse_timecode(timecode) else {
        return u.to_string();
    };
    if u.is_empty() {
        return u.to_string();
    }

    let join = if u.contains('?') { '&' } else { '?' };
    if u.contains("youtube.com/watch") {
        return format!("{u}{join}t={sec}s");
    }
    // youtu.be and media.ccc.de both take a bare seconds value.
    if u.contains("youtu.be/") || u.contains("media.ccc.de") {
        return format!("{u}{join}t={sec}");
    }
    u.to_string()
}
