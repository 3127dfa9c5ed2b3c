pub mod asr;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{DigestError, Result};

/// Speaker label prefix used by the speech model.
pub const SPEAKER_PREFIX: &str = "发言人";

/// Date header prefix (full-width colon).
pub const DATE_HEADER_PREFIX: &str = "日期：";

// MM:SS 发言人N: text, minutes unbounded, seconds exactly two ASCII digits
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+):([0-9]{2}) 发言人([0-9]+): (.+)$").expect("transcript line regex")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^日期：([0-9]{4}-[0-9]{2}-[0-9]{2})$").expect("date header regex")
});

/// One utterance from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Seconds since transcript start (`minutes * 60 + seconds`).
    pub timestamp: u32,
    /// Speaker label, e.g. `发言人3`.
    pub speaker_id: String,
    pub text: String,
    /// Date from the most recent `日期：` header above this line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl TranscriptEntry {
    /// Absolute time of the entry: header date at midnight plus the offset.
    /// `None` when no date header preceded the entry.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let date = self.date?;
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight + TimeDelta::seconds(i64::from(self.timestamp)))
    }
}

/// Parsed transcript, entries in input order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Entries anchored to a date header, in input order.
    pub fn dated_entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().filter(|e| e.date.is_some())
    }
}

/// Parse raw transcript text into entries.
///
/// Lines that do not match `MM:SS 发言人N: text` are skipped. A
/// `日期：YYYY-MM-DD` line sets the date for every entry below it.
/// Fails only when no line at all is recognized.
pub fn parse_transcript(content: &str) -> Result<Transcript> {
    let mut transcript = Transcript::default();
    let mut current_date: Option<NaiveDate> = None;

    for (lineno, raw) in content.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(cap) = DATE_RE.captures(line) {
            match NaiveDate::parse_from_str(&cap[1], "%Y-%m-%d") {
                Ok(date) => current_date = Some(date),
                Err(e) => debug!("Skipping line {}: bad date header ({e})", lineno + 1),
            }
            continue;
        }

        match parse_line(line, current_date) {
            Some(entry) => transcript.entries.push(entry),
            None => debug!("Skipping line {}: {}", lineno + 1, line),
        }
    }

    if transcript.entries.is_empty() {
        return Err(DigestError::Parse);
    }

    Ok(transcript)
}

/// Parse a single trimmed line. Returns `None` for anything that is not a
/// well-formed utterance line.
fn parse_line(line: &str, date: Option<NaiveDate>) -> Option<TranscriptEntry> {
    let cap = LINE_RE.captures(line)?;
    let minutes: u32 = cap[1].parse().ok()?;
    let seconds: u32 = cap[2].parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    let timestamp = minutes.checked_mul(60)?.checked_add(seconds)?;

    Some(TranscriptEntry {
        timestamp,
        speaker_id: format!("{SPEAKER_PREFIX}{}", &cap[3]),
        text: cap[4].to_string(),
        date,
    })
}

/// `M:SS` with unpadded minutes.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// `MM:SS` re-derived from a datetime as `(hour * 60 + minute, second)`.
///
/// This is not the original offset: offsets that roll past midnight wrap.
pub fn format_dated_clock(at: &NaiveDateTime) -> String {
    let minutes = at.hour() * 60 + at.minute();
    format!("{:02}:{:02}", minutes, at.second())
}
