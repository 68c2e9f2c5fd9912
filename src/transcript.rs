// Saved analysis results

use crate::error::Result;
use crate::types::Snapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// The last rendered prompt/answer pair, stamped with when it was saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub prompt: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl Transcript {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self::at(snapshot, Utc::now())
    }

    pub fn at(snapshot: &Snapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            prompt: snapshot.prompt.clone(),
            answer: snapshot.answer.clone(),
            timestamp,
        }
    }

    /// Plain-text body of the saved file
    pub fn render(&self) -> String {
        format!(
            "Analysis Result ({})\nPrompt: {}\n\nAnswer: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.prompt,
            self.answer
        )
    }

    pub fn file_name(&self) -> String {
        format!("analysis_result_{}.txt", self.timestamp.timestamp_millis())
    }

    /// Write the transcript into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render())?;
        tracing::info!("Saved analysis result to {}", path.display());
        Ok(path)
    }
}
