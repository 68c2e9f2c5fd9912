//! End-of-answer marker handling

/// Marker the analysis server appends once the answer is complete
pub const DEFAULT_SENTINEL: &str = "<eos>";

/// Whether `text` contains the marker. An empty marker never matches.
pub fn contains(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}

/// Remove every occurrence of the marker and trim surrounding whitespace
pub fn strip(text: &str, marker: &str) -> String {
    if marker.is_empty() {
        return text.trim().to_string();
    }
    text.replace(marker, "").trim().to_string()
}
