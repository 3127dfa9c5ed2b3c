//! Stage orchestration: parse, segment or chunk, call the completion
//! service once per unit, merge.
//!
//! Each stage is independent; an error aborts only that stage.

use serde_json::Value;
use tracing::info;

use crate::chunk::{split_into_chunks, DEFAULT_CHUNK_SIZE};
use crate::completion::CompletionClient;
use crate::error::{DigestError, Result, Stage};
use crate::merge;
use crate::prompt::Prompts;
use crate::segment::{render_intervals, split_elapsed_gap, split_fixed_origin};
use crate::transcript::parse_transcript;

pub const DEFAULT_SUMMARY_INTERVAL: u32 = 30;
pub const DEFAULT_INTRO_INTERVAL: u32 = 25;

/// Tunables for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Lines per chunk in the preprocessing stage.
    pub chunk_size: usize,
    /// Interval for the fixed-origin policy (summary stage).
    pub summary_interval_minutes: u32,
    /// Interval for the elapsed-gap policy (introduction stage).
    pub intro_interval_minutes: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            summary_interval_minutes: DEFAULT_SUMMARY_INTERVAL,
            intro_interval_minutes: DEFAULT_INTRO_INTERVAL,
        }
    }
}

pub struct Pipeline<C: CompletionClient> {
    client: C,
    prompts: Prompts,
    settings: PipelineSettings,
}

impl<C: CompletionClient> Pipeline<C> {
    pub fn new(client: C, prompts: Prompts, settings: PipelineSettings) -> Self {
        Self {
            client,
            prompts,
            settings,
        }
    }

    /// Clean raw text chunk by chunk and stitch the results.
    pub fn preprocess(&self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Err(DigestError::EmptyInput);
        }

        let chunks = split_into_chunks(text, self.settings.chunk_size)?;
        let total = chunks.len();
        let mut outputs = Vec::with_capacity(total);

        for chunk in &chunks {
            info!("Processing chunk {}/{}", chunk.index + 1, total);
            let response = self
                .client
                .complete(&self.prompts.preprocess, &chunk.text())?;
            outputs.push((
                chunk.index,
                response.first_nonempty_content().map(str::to_string),
            ));
        }

        Ok(merge::merge_chunk_outputs(outputs))
    }

    /// Summarize a dated transcript using fixed-origin intervals.
    pub fn summarize(&self, text: &str) -> Result<Value> {
        let interval = self.settings.summary_interval_minutes;
        let transcript = parse_transcript(text)?;
        let segments = split_fixed_origin(&transcript, interval)?;
        if segments.is_empty() {
            return Err(DigestError::Segmentation);
        }
        info!("Summary: {} intervals of {} minutes", segments.len(), interval);

        let intervals = serde_json::to_string_pretty(&render_intervals(&segments))?;
        let user_content = format!(
            "以下是按{interval}分钟区间划分的会议内容，请据此生成议题：\n{intervals}\n\n原始完整记录：\n{text}"
        );

        let response = self.client.complete(&self.prompts.summary, &user_content)?;
        let content = response
            .first_nonempty_content()
            .ok_or(DigestError::ContentMissing {
                stage: Stage::Summary,
            })?;

        Ok(merge::parse_structured(content))
    }

    /// Produce the meeting introduction with a time-stamped chapter overview.
    pub fn introduce(&self, text: &str) -> Result<Value> {
        let interval = self.settings.intro_interval_minutes;
        let transcript = parse_transcript(text)?;
        let segments = split_elapsed_gap(&transcript, interval)?;
        if segments.is_empty() {
            return Err(DigestError::Segmentation);
        }
        info!("Introduction: {} chapters of up to {} minutes", segments.len(), interval);

        let response = self.client.complete(&self.prompts.introduction, text)?;
        let content = response
            .first_choice_content()
            .ok_or(DigestError::ContentMissing {
                stage: Stage::Introduction,
            })?;

        let spliced = merge::splice_chapter_overview(content, &segments);
        merge::parse_structured_strict(&spliced)
    }
}
