use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{DigestError, Result};
use crate::transcript::{DATE_HEADER_PREFIX, SPEAKER_PREFIX};

/// One recognized sentence as emitted by the speech model
/// (`sentence_info` entries).
#[derive(Debug, Clone, Deserialize)]
pub struct SentenceInfo {
    /// Start offset in milliseconds.
    pub start: u64,
    pub spk: u32,
    pub text: String,
}

/// Speech model output. Accepts either `{"sentence_info": [...]}` or a
/// list of such objects (only the first is used).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AsrOutput {
    Batch(Vec<AsrResult>),
    Single(AsrResult),
}

#[derive(Debug, Deserialize)]
struct AsrResult {
    sentence_info: Option<Vec<SentenceInfo>>,
}

/// Parse speech model JSON into its sentences.
pub fn parse_asr_json(content: &str) -> Result<Vec<SentenceInfo>> {
    let output: AsrOutput = serde_json::from_str(content)?;
    let result = match output {
        AsrOutput::Batch(list) => list.into_iter().next(),
        AsrOutput::Single(r) => Some(r),
    };

    // No speaker info means diarization was not enabled upstream.
    result
        .and_then(|r| r.sentence_info)
        .ok_or(DigestError::Parse)
}

/// Render sentences as transcript text: a `日期：` header followed by one
/// `MM:SS 发言人N: text` line per sentence.
pub fn format_sentences(date: NaiveDate, sentences: &[SentenceInfo]) -> String {
    let mut lines = Vec::with_capacity(sentences.len() + 1);
    lines.push(format!("{DATE_HEADER_PREFIX}{}", date.format("%Y-%m-%d")));

    for s in sentences {
        let total = s.start / 1000;
        lines.push(format!(
            "{:02}:{:02} {SPEAKER_PREFIX}{}: {}",
            total / 60,
            total % 60,
            s.spk,
            s.text
        ));
    }

    lines.join("\n")
}
