//! JSONL pose recordings: one serialized [`Frame`] per line.

use crate::pose::types::Frame;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Errors reading or writing a recording.
#[derive(Debug)]
pub enum ReplayError {
    IoError(String),
    /// A line could not be parsed as a frame
    ParseError { line: usize, message: String },
    SerializeError(String),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::IoError(e) => write!(f, "IO error: {e}"),
            ReplayError::ParseError { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
            ReplayError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

/// Streaming reader over a JSONL recording. Blank lines are skipped.
pub struct FrameReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> FrameReader<R> {
    /// Read frames from any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl FrameReader<BufReader<std::fs::File>> {
    /// Open a recording on disk.
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        let file = std::fs::File::open(path).map_err(|e| ReplayError::IoError(e.to_string()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<Frame, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(ReplayError::IoError(e.to_string()))),
            }

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str(trimmed).map_err(|e| ReplayError::ParseError {
                line: self.line,
                message: e.to_string(),
            }));
        }
    }
}

/// Read a whole recording into memory.
pub fn read_frames(path: &Path) -> Result<Vec<Frame>, ReplayError> {
    FrameReader::open(path)?.collect()
}

/// Write frames as JSONL, creating parent directories as needed.
pub fn write_frames(path: &Path, frames: &[Frame]) -> Result<(), ReplayError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ReplayError::IoError(e.to_string()))?;
    }

    let file = std::fs::File::create(path).map_err(|e| ReplayError::IoError(e.to_string()))?;
    let mut out = std::io::BufWriter::new(file);
    for frame in frames {
        let line =
            serde_json::to_string(frame).map_err(|e| ReplayError::SerializeError(e.to_string()))?;
        writeln!(out, "{line}").map_err(|e| ReplayError::IoError(e.to_string()))?;
    }
    out.flush().map_err(|e| ReplayError::IoError(e.to_string()))
}
