// Core types shared by the renderer, transport and session

use crate::error::{GlanceError, Result};
use crate::sentinel;
use std::path::{Path, PathBuf};

/// Shown when an analysis is triggered with neither a file nor a URL
pub const NO_IMAGE_MESSAGE: &str = "Please select an image or provide a URL.";

/// Placeholder shown in the prompt region while waiting for the first chunk
pub const ANALYZING_PLACEHOLDER: &str = "Analyzing...";

/// Where the image for an analysis comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local file uploaded as a binary attachment
    File(PathBuf),
    /// Remote image the server fetches itself
    Url(String),
}

impl ImageSource {
    /// Value of the `image_source` form field
    pub fn as_str(&self) -> &str {
        match self {
            ImageSource::File(_) => "file",
            ImageSource::Url(_) => "url",
        }
    }
}

/// The user's current image selection, before validation.
///
/// Mirrors the two inputs of the page: a selected file and a URL field.
/// Both may be filled in at once; the file takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInput {
    pub file: Option<PathBuf>,
    pub url: Option<String>,
}

impl ImageInput {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            file: None,
            url: Some(url.into()),
        }
    }

    /// Pick the image source to send, or fail the precondition
    pub fn resolve(&self) -> Result<ImageSource> {
        if let Some(file) = &self.file {
            return Ok(ImageSource::File(file.clone()));
        }

        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(ImageSource::Url(url.to_string())),
            _ => Err(GlanceError::Validation(NO_IMAGE_MESSAGE.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resolve().is_err()
    }

    /// Short label for the current selection, e.g. `Selected: cat.png`
    pub fn describe(&self) -> String {
        match self.resolve() {
            Ok(ImageSource::File(path)) => format!("Selected: {}", file_label(&path)),
            Ok(ImageSource::Url(url)) => format!("URL: {}", url),
            Err(_) => "No image selected".to_string(),
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A validated request ready to be sent to the analysis endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub prompt: String,
    pub source: ImageSource,
}

impl AnalyzeRequest {
    pub fn new(prompt: impl Into<String>, source: ImageSource) -> Self {
        Self {
            prompt: prompt.into(),
            source,
        }
    }
}

/// One republished display state: the two output regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub prompt: String,
    pub answer: String,
}

impl Snapshot {
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }
}

/// Text received so far by the active analysis
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    accumulated: String,
    finished: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text; marks the state finished once the sentinel shows up
    pub fn push(&mut self, text: &str, marker: &str) {
        self.accumulated.push_str(text);
        if sentinel::contains(&self.accumulated, marker) {
            self.finished = true;
        }
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Display form of the accumulated text
    pub fn answer(&self, marker: &str) -> String {
        sentinel::strip(&self.accumulated, marker)
    }
}

/// How a single `analyze` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Another analysis was active; nothing happened
    Busy,
    /// Precondition failed before any request was made
    Invalid(String),
    /// The stream ended, either at the sentinel or at end-of-stream
    Completed {
        snapshot: Snapshot,
        finished_by_sentinel: bool,
        chunks: usize,
    },
    /// The request or stream failed; the message was displayed
    Failed(String),
}

impl Outcome {
    /// The last snapshot published, if the analysis got that far
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Outcome::Completed { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}
