use std::path::Path;
use tracing::debug;

use crate::error::{DigestError, Result};

pub const PREPROCESS_FILE: &str = "preprocess.txt";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const INTRODUCTION_FILE: &str = "introduction.txt";

/// Used when no summary prompt file exists.
pub const DEFAULT_SUMMARY_PROMPT: &str = "请总结会议内容，提取关键议题、讨论结果和行动计划。";

/// System prompts for the three stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub preprocess: String,
    pub summary: String,
    pub introduction: String,
}

impl Prompts {
    /// Load prompts from a directory.
    ///
    /// `preprocess.txt` and `introduction.txt` are required; the preprocess
    /// prompt must also be non-empty after trimming. A missing
    /// `summary.txt` falls back to [`DEFAULT_SUMMARY_PROMPT`].
    pub fn load(dir: &Path) -> Result<Self> {
        let preprocess = read_required(dir, PREPROCESS_FILE)?.trim().to_string();
        if preprocess.is_empty() {
            return Err(DigestError::Prompt {
                message: format!("{} is empty", dir.join(PREPROCESS_FILE).display()),
            });
        }

        let summary_path = dir.join(SUMMARY_FILE);
        let summary = if summary_path.exists() {
            std::fs::read_to_string(&summary_path)?
        } else {
            debug!("No {}, using built-in summary prompt", summary_path.display());
            DEFAULT_SUMMARY_PROMPT.to_string()
        };

        let introduction = read_required(dir, INTRODUCTION_FILE)?;

        Ok(Prompts {
            preprocess,
            summary,
            introduction,
        })
    }
}

fn read_required(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(DigestError::Prompt {
            message: format!("prompt file not found: {}", path.display()),
        });
    }
    Ok(std::fs::read_to_string(&path)?)
}
