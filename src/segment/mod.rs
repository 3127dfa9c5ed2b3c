//! Time-bucketing of transcript entries.
//!
//! Two policies, kept as separate functions:
//!
//! - [`split_fixed_origin`] keeps the first entry as a fixed origin and
//!   closes the k-th segment once an entry is `interval * (k + 1)` past it.
//! - [`split_elapsed_gap`] re-anchors at the first entry of every segment and
//!   closes once an entry is `interval` past that anchor.
//!
//! They disagree on the same input as soon as a segment does not start
//! exactly on a multiple of the interval.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{DigestError, Result};
use crate::transcript::{format_clock, format_dated_clock, Transcript, TranscriptEntry};

/// Bucketing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPolicy {
    /// Cumulative threshold from a fixed origin (summary stage).
    FixedOrigin,
    /// Plain elapsed-gap reset (chapter stage).
    ElapsedGap,
}

impl SegmentPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixed" | "fixed-origin" | "summary" => Some(SegmentPolicy::FixedOrigin),
            "gap" | "elapsed-gap" | "intro" | "chapter" => Some(SegmentPolicy::ElapsedGap),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SegmentPolicy::FixedOrigin => "fixed-origin",
            SegmentPolicy::ElapsedGap => "elapsed-gap",
        }
    }

    pub fn split(&self, transcript: &Transcript, interval_minutes: u32) -> Result<Vec<Segment>> {
        match self {
            SegmentPolicy::FixedOrigin => split_fixed_origin(transcript, interval_minutes),
            SegmentPolicy::ElapsedGap => split_elapsed_gap(transcript, interval_minutes),
        }
    }
}

/// A contiguous time window of entries.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    /// Offset of the first entry, in seconds.
    pub start_time: u32,
    /// Offset of the last entry, in seconds.
    pub end_time: u32,
    /// Absolute start, only for segments built from dated entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<NaiveDateTime>,
    pub entries: Vec<TranscriptEntry>,
    pub speakers: BTreeSet<String>,
}

impl Segment {
    fn open(entry: &TranscriptEntry, at: Option<NaiveDateTime>) -> Self {
        let mut segment = Segment {
            start_time: entry.timestamp,
            end_time: entry.timestamp,
            start_at: at,
            end_at: at,
            entries: Vec::new(),
            speakers: BTreeSet::new(),
        };
        segment.push(entry, at);
        segment
    }

    fn push(&mut self, entry: &TranscriptEntry, at: Option<NaiveDateTime>) {
        self.end_time = entry.timestamp;
        self.end_at = at;
        self.speakers.insert(entry.speaker_id.clone());
        self.entries.push(entry.clone());
    }

    /// Entry texts in order.
    pub fn contents(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    /// `M:SS - M:SS` from the raw offsets.
    pub fn clock_range(&self) -> String {
        format!("{} - {}", format_clock(self.start_time), format_clock(self.end_time))
    }

    /// `MM:SS-MM:SS` re-derived from the absolute datetimes when present.
    pub fn dated_range(&self) -> String {
        let render = |at: Option<NaiveDateTime>, secs: u32| match at {
            Some(at) => format_dated_clock(&at),
            None => format!("{:02}:{:02}", secs / 60, secs % 60),
        };
        format!(
            "{}-{}",
            render(self.start_at, self.start_time),
            render(self.end_at, self.end_time)
        )
    }
}

fn interval_seconds(interval_minutes: u32) -> Result<i64> {
    if interval_minutes == 0 {
        return Err(DigestError::invalid_config(
            "interval_minutes",
            "must be at least 1",
        ));
    }
    Ok(i64::from(interval_minutes) * 60)
}

/// Policy A: fixed origin, index-scaled threshold.
///
/// Only entries below a `日期：` header take part. With `k` segments already
/// closed, an entry closes the current one when it is at least
/// `interval * (k + 1)` past the first entry. The origin never moves, so
/// a single late entry advances `k` by one only and the threshold lags.
pub fn split_fixed_origin(transcript: &Transcript, interval_minutes: u32) -> Result<Vec<Segment>> {
    let interval = interval_seconds(interval_minutes)?;

    let mut dated: Vec<(NaiveDateTime, &TranscriptEntry)> = transcript
        .dated_entries()
        .filter_map(|e| e.datetime().map(|at| (at, e)))
        .collect();
    dated.sort_by_key(|(at, _)| *at);

    let Some(&(origin, first)) = dated.first() else {
        return Ok(Vec::new());
    };

    let mut segments = Vec::new();
    let mut current = Segment::open(first, Some(origin));

    for &(at, entry) in &dated[1..] {
        let elapsed = (at - origin).num_seconds();
        let threshold = interval * (segments.len() as i64 + 1);
        if elapsed >= threshold {
            segments.push(current);
            current = Segment::open(entry, Some(at));
        } else {
            current.push(entry, Some(at));
        }
    }

    segments.push(current);
    Ok(segments)
}

/// Policy B: re-anchor on every new segment.
pub fn split_elapsed_gap(transcript: &Transcript, interval_minutes: u32) -> Result<Vec<Segment>> {
    let interval = interval_seconds(interval_minutes)?;

    let mut entries: Vec<&TranscriptEntry> = transcript.entries.iter().collect();
    entries.sort_by_key(|e| e.timestamp);

    let Some(first) = entries.first() else {
        return Ok(Vec::new());
    };

    let mut segments = Vec::new();
    let mut anchor = first.timestamp;
    let mut current = Segment::open(first, None);

    for entry in &entries[1..] {
        if i64::from(entry.timestamp - anchor) >= interval {
            segments.push(current);
            current = Segment::open(entry, None);
            anchor = entry.timestamp;
        } else {
            current.push(entry, None);
        }
    }

    segments.push(current);
    Ok(segments)
}

/// Summary-stage rendering of one policy A segment.
#[derive(Debug, Clone, Serialize)]
pub struct Interval {
    pub id: usize,
    pub time_range: String,
    pub content: String,
    pub reporters: Vec<String>,
}

pub fn render_intervals(segments: &[Segment]) -> Vec<Interval> {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| Interval {
            id: i + 1,
            time_range: s.dated_range(),
            content: s.contents().join("\n"),
            reporters: s.speakers.iter().cloned().collect(),
        })
        .collect()
}

/// Chapter-stage rendering: `speaker M:SS` header then the text, entries
/// separated by a blank line.
pub fn render_chapter(segment: &Segment) -> String {
    segment
        .entries
        .iter()
        .map(|e| format!("{} {}\n{}", e.speaker_id, format_clock(e.timestamp), e.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::parse_transcript;

    /// Build a dated transcript from (minute, second) offsets.
    fn dated(offsets: &[(u32, u32)]) -> Transcript {
        let mut text = String::from("日期：2024-01-01\n");
        for (i, (m, s)) in offsets.iter().enumerate() {
            text.push_str(&format!("{m:02}:{s:02} 发言人{}: line{i}\n", i % 2 + 1));
        }
        parse_transcript(&text).unwrap()
    }

    fn bounds(segments: &[Segment]) -> Vec<(u32, u32)> {
        segments.iter().map(|s| (s.start_time, s.end_time)).collect()
    }

    #[test]
    fn test_both_close_after_long_gap() {
        let t = dated(&[(0, 0), (40, 0)]);
        let a = split_fixed_origin(&t, 30).unwrap();
        let b = split_elapsed_gap(&t, 30).unwrap();
        assert_eq!(bounds(&a), vec![(0, 0), (2400, 2400)]);
        assert_eq!(bounds(&b), vec![(0, 0), (2400, 2400)]);
    }

    #[test]
    fn test_zero_thirtyfive_sixtyfive() {
        let t = dated(&[(0, 0), (35, 0), (65, 0)]);

        // A: 2100 >= 1800 closes (k=1); 3900 >= 3600 closes (k=2).
        let a = split_fixed_origin(&t, 30).unwrap();
        assert_eq!(bounds(&a), vec![(0, 0), (2100, 2100), (3900, 3900)]);

        // B: 2100 - 0 >= 1800 closes; 3900 - 2100 = 1800 >= 1800 closes.
        let b = split_elapsed_gap(&t, 30).unwrap();
        assert_eq!(bounds(&b), vec![(0, 0), (2100, 2100), (3900, 3900)]);
    }

    #[test]
    fn test_policies_diverge() {
        let t = dated(&[(0, 0), (35, 0), (50, 0), (61, 0)]);

        // A: 35m closes (k=1, next threshold 60m); 50m stays; 61m closes.
        let a = split_fixed_origin(&t, 30).unwrap();
        assert_eq!(bounds(&a), vec![(0, 0), (2100, 3000), (3660, 3660)]);

        // B: 35m closes and re-anchors; 50m and 61m are within 30m of 35m.
        let b = split_elapsed_gap(&t, 30).unwrap();
        assert_eq!(bounds(&b), vec![(0, 0), (2100, 3660)]);
    }

    #[test]
    fn test_fixed_origin_lagging_threshold() {
        // Known edge case: one very late entry moves k by one only, so every
        // following entry still clears the threshold and sits alone.
        let t = dated(&[(0, 0), (100, 0), (101, 0), (102, 0), (103, 0)]);
        let a = split_fixed_origin(&t, 30).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(bounds(&a), vec![(0, 0), (6000, 6000), (6060, 6060), (6120, 6180)]);
        assert!(a.iter().all(|s| !s.entries.is_empty()));
    }

    #[test]
    fn test_end_to_end_elapsed_gap() {
        let text = "日期：2024-01-01\n00:05 发言人1: hello\n00:50 发言人2: world\n31:10 发言人1: bye\n";
        let t = parse_transcript(text).unwrap();
        let segments = split_elapsed_gap(&t, 30).unwrap();
        assert_eq!(bounds(&segments), vec![(5, 50), (1870, 1870)]);
        assert_eq!(segments[0].contents(), vec!["hello", "world"]);
        assert_eq!(segments[0].clock_range(), "0:05 - 0:50");
        assert_eq!(segments[1].clock_range(), "31:10 - 31:10");
    }

    #[test]
    fn test_sort_is_stable_on_equal_timestamps() {
        let t = parse_transcript(
            "日期：2024-01-01\n05:00 发言人1: first\n00:10 发言人2: early\n05:00 发言人3: second",
        )
        .unwrap();
        for policy in [SegmentPolicy::FixedOrigin, SegmentPolicy::ElapsedGap] {
            let segments = policy.split(&t, 30).unwrap();
            assert_eq!(segments.len(), 1);
            assert_eq!(segments[0].contents(), vec!["early", "first", "second"]);
        }
    }

    #[test]
    fn test_every_entry_in_exactly_one_segment() {
        let t = dated(&[(0, 0), (3, 0), (29, 59), (30, 0), (58, 0), (90, 1), (91, 0)]);
        for policy in [SegmentPolicy::FixedOrigin, SegmentPolicy::ElapsedGap] {
            let segments = policy.split(&t, 30).unwrap();
            let total: usize = segments.iter().map(|s| s.entries.len()).sum();
            assert_eq!(total, t.entries.len());
            for pair in segments.windows(2) {
                assert!(pair[0].end_time < pair[1].start_time);
            }
        }
    }

    #[test]
    fn test_fixed_origin_requires_date_header() {
        let t = parse_transcript("00:05 发言人1: a\n日期：2024-01-01\n00:06 发言人1: b").unwrap();
        let a = split_fixed_origin(&t, 30).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].contents(), vec!["b"]);

        let undated = parse_transcript("00:05 发言人1: a").unwrap();
        assert!(split_fixed_origin(&undated, 30).unwrap().is_empty());
        assert_eq!(split_elapsed_gap(&undated, 30).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_input_yields_no_segments() {
        let empty = Transcript::default();
        assert!(split_fixed_origin(&empty, 30).unwrap().is_empty());
        assert!(split_elapsed_gap(&empty, 30).unwrap().is_empty());
        for policy in [SegmentPolicy::FixedOrigin, SegmentPolicy::ElapsedGap] {
            assert!(policy.split(&empty, 30).unwrap().is_empty());
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let t = dated(&[(0, 0)]);
        assert!(matches!(
            split_elapsed_gap(&t, 0),
            Err(DigestError::InvalidConfig { .. })
        ));
        assert!(matches!(
            split_fixed_origin(&t, 0),
            Err(DigestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_render_intervals() {
        let t = dated(&[(0, 5), (10, 0), (75, 9)]);
        let intervals = render_intervals(&split_fixed_origin(&t, 30).unwrap());
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].id, 1);
        assert_eq!(intervals[0].time_range, "00:05-10:00");
        assert_eq!(intervals[0].content, "line0\nline1");
        assert_eq!(intervals[0].reporters, vec!["发言人1", "发言人2"]);
        assert_eq!(intervals[1].time_range, "75:09-75:09");
    }

    #[test]
    fn test_render_chapter() {
        let t = parse_transcript("00:05 发言人1: hello\n01:07 发言人2: world").unwrap();
        let segments = split_elapsed_gap(&t, 30).unwrap();
        assert_eq!(render_chapter(&segments[0]), "发言人1 0:05\nhello\n\n发言人2 1:07\nworld");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(SegmentPolicy::from_str("fixed"), Some(SegmentPolicy::FixedOrigin));
        assert_eq!(SegmentPolicy::from_str("GAP"), Some(SegmentPolicy::ElapsedGap));
        assert_eq!(SegmentPolicy::from_str("weekly"), None);
    }
}
