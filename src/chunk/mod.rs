use serde::Serialize;

use crate::error::{DigestError, Result};

/// Default lines per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// A run of consecutive raw lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub lines: Vec<String>,
}

impl Chunk {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Split text on `\n` into chunks of at most `chunk_size` lines.
///
/// A pure partition: joining every chunk's lines in index order gives back
/// the input lines, including a trailing empty line after a final newline.
pub fn split_into_chunks(text: &str, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(DigestError::invalid_config("chunk_size", "must be at least 1"));
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let chunks = lines
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, lines)| Chunk {
            index,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        })
        .collect();

    Ok(chunks)
}
