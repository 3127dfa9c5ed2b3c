//! Reassembly of per-unit completion outputs into one stage artifact.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::error::{DigestError, Result};
use crate::segment::Segment;

/// Stand-in for a chunk whose completion carried no content.
pub const MISSING_CONTENT_PLACEHOLDER: &str = "没有找到 'content' 字段";

/// Heading that opens the chapter overview section.
pub const OVERVIEW_START: &str = "### 章节速览";

/// Heading of the section that follows the chapter overview.
pub const OVERVIEW_END: &str = "### 要点回顾";

static ENUMERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\d+\.\s").expect("enumerator regex"));

/// Drop every line that is empty after trimming.
pub fn remove_blank_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join per-chunk outputs in chunk order and strip blank lines.
///
/// Outputs may arrive in any order; they are keyed by chunk index. A chunk
/// without content contributes [`MISSING_CONTENT_PLACEHOLDER`].
pub fn merge_chunk_outputs(mut outputs: Vec<(usize, Option<String>)>) -> String {
    outputs.sort_by_key(|(index, _)| *index);

    let joined = outputs
        .into_iter()
        .map(|(index, output)| {
            output.unwrap_or_else(|| {
                warn!("Chunk {} returned no content, using placeholder", index + 1);
                MISSING_CONTENT_PLACEHOLDER.to_string()
            })
        })
        .collect::<Vec<_>>()
        .join("\n");

    remove_blank_lines(&joined)
}

/// Byte range of the overview section: from the start heading up to the end
/// heading, or to the end of text when the end heading is missing.
fn overview_span(content: &str) -> Option<(usize, usize)> {
    let start = content.find(OVERVIEW_START)?;
    let body_start = start + OVERVIEW_START.len();
    let end = content[body_start..]
        .find(OVERVIEW_END)
        .map(|i| body_start + i)
        .unwrap_or(content.len());
    Some((start, end))
}

/// Per-chapter blocks of the overview section, at most `max` of them.
///
/// Only enumerated blocks count; any lead-in text between the heading and
/// the first `N. ` line is dropped.
pub fn extract_chapter_blocks(content: &str, max: usize) -> Vec<String> {
    let Some((start, end)) = overview_span(content) else {
        return Vec::new();
    };
    let body = &content[start + OVERVIEW_START.len()..end];

    // Every enumerator is preceded by a newline, so the first piece is
    // always whatever sits before chapter 1.
    ENUMERATOR_RE
        .split(body)
        .skip(1)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Rewrite the chapter overview so each block carries the time range of
/// the matching segment.
///
/// Surplus blocks are dropped; when there are fewer blocks than segments
/// only the blocks present are used. Text outside the overview section is
/// left as is. Without an overview section the content is returned as is.
pub fn splice_chapter_overview(content: &str, segments: &[Segment]) -> String {
    let Some((start, end)) = overview_span(content) else {
        return content.to_string();
    };

    let blocks = extract_chapter_blocks(content, segments.len());
    if blocks.is_empty() {
        return content.to_string();
    }
    if blocks.len() < segments.len() {
        warn!(
            "Chapter overview has {} blocks for {} segments",
            blocks.len(),
            segments.len()
        );
    }

    let rebuilt = blocks
        .iter()
        .zip(segments)
        .enumerate()
        .map(|(i, (block, segment))| {
            format!("{}. 时间段 {}：\n{}", i + 1, segment.clock_range(), block)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}{OVERVIEW_START}\n\n{rebuilt}\n\n{}",
        &content[..start],
        &content[end..]
    )
}

/// Parse completion content as JSON, falling back to `{"summary": content}`.
pub fn parse_structured(content: &str) -> Value {
    serde_json::from_str(content).unwrap_or_else(|_| serde_json::json!({ "summary": content }))
}

/// Parse completion content as JSON with no fallback.
pub fn parse_structured_strict(content: &str) -> Result<Value> {
    serde_json::from_str(content).map_err(DigestError::MalformedStructuredOutput)
}
