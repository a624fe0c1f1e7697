//! Source document representation.
//!
//! A [`Source`] records one ingested document: identity, detected format and
//! type, processing status, and content hash. One source owns all chunks
//! produced from it; re-ingestion of the same `source_id` supersedes prior
//! chunks atomically at the store level.

use serde::{Deserialize, Serialize};

/// Detected on-disk format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document.
    Docx,
    /// HyperText Markup Language.
    Html,
    /// Markdown text.
    Markdown,
    /// Plain UTF-8 text.
    Text,
    /// Format could not be determined.
    Unknown,
}

impl SourceFormat {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a canonical name; unknown names map to `Unknown`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "html" => Self::Html,
            "markdown" => Self::Markdown,
            "text" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

/// Detected document type, driving the processing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    /// Long-form manual or handbook.
    UserGuide,
    /// Condensed getting-started material.
    QuickStart,
    /// API or parameter reference.
    TechnicalSpec,
    /// Question/answer collections.
    Faq,
    /// Symptom/cause/resolution material.
    Troubleshooting,
    /// Type could not be determined with sufficient confidence.
    Unknown,
}

impl DocumentType {
    /// Canonical camel-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserGuide => "userGuide",
            Self::QuickStart => "quickStart",
            Self::TechnicalSpec => "technicalSpec",
            Self::Faq => "faq",
            Self::Troubleshooting => "troubleshooting",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a canonical name; unknown names map to `Unknown`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "userGuide" => Self::UserGuide,
            "quickStart" => Self::QuickStart,
            "technicalSpec" => Self::TechnicalSpec,
            "faq" => Self::Faq,
            "troubleshooting" => Self::Troubleshooting,
            _ => Self::Unknown,
        }
    }

    /// Whether documents of this type are primarily instructional.
    ///
    /// Used by the quality validator to penalise table-of-contents chunks
    /// inside instructional material.
    #[must_use]
    pub const fn is_instructional(self) -> bool {
        matches!(self, Self::UserGuide | Self::QuickStart | Self::Troubleshooting)
    }
}

/// Processing status of a source. `Completed`, `Failed` and `Cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Ingestion requested but not started.
    Pending,
    /// Ingestion in progress.
    Running,
    /// Ingestion committed.
    Completed,
    /// Ingestion aborted with an error.
    Failed,
    /// Ingestion aborted by explicit cancellation.
    Cancelled,
}

impl ProcessingStatus {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a canonical name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this status admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a transition to `next` is legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => matches!(next, Self::Completed | Self::Failed | Self::Cancelled),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }
}

/// One ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable caller-provided identifier.
    pub source_id: String,
    /// Logical version string; re-ingestion bumps or repeats it.
    pub version: String,
    /// Hex SHA-256 of the raw bytes.
    pub content_hash: String,
    /// Size of the raw document in bytes.
    pub size_bytes: u64,
    /// Original filename, if known.
    pub filename: Option<String>,
    /// Detected format.
    pub format: SourceFormat,
    /// Detected document type.
    pub doc_type: DocumentType,
    /// Processing status.
    pub status: ProcessingStatus,
    /// Unix timestamp of creation (seconds).
    pub created_at: i64,
    /// Unix timestamp of last update (seconds).
    pub updated_at: i64,
}

impl Source {
    /// Creates a new pending source record.
    #[must_use]
    pub fn new(source_id: impl Into<String>, version: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            source_id: source_id.into(),
            version: version.into(),
            content_hash: String::new(),
            size_bytes: 0,
            filename: None,
            format: SourceFormat::Unknown,
            doc_type: DocumentType::Unknown,
            status: ProcessingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the source to a new status if the transition is legal.
    ///
    /// Illegal transitions are ignored and return `false`.
    pub fn transition(&mut self, next: ProcessingStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            self.updated_at = current_timestamp();
            true
        } else {
            false
        }
    }
}

/// Returns the current Unix timestamp in seconds.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for format in [
            SourceFormat::Pdf,
            SourceFormat::Docx,
            SourceFormat::Html,
            SourceFormat::Markdown,
            SourceFormat::Text,
            SourceFormat::Unknown,
        ] {
            assert_eq!(SourceFormat::parse(format.as_str()), format);
        }
        assert_eq!(SourceFormat::parse("xlsx"), SourceFormat::Unknown);
    }

    #[test]
    fn test_doc_type_round_trip() {
        for doc_type in [
            DocumentType::UserGuide,
            DocumentType::QuickStart,
            DocumentType::TechnicalSpec,
            DocumentType::Faq,
            DocumentType::Troubleshooting,
            DocumentType::Unknown,
        ] {
            assert_eq!(DocumentType::parse(doc_type.as_str()), doc_type);
        }
    }

    #[test]
    fn test_instructional_types() {
        assert!(DocumentType::UserGuide.is_instructional());
        assert!(DocumentType::QuickStart.is_instructional());
        assert!(DocumentType::Troubleshooting.is_instructional());
        assert!(!DocumentType::Faq.is_instructional());
        assert!(!DocumentType::TechnicalSpec.is_instructional());
    }

    #[test]
    fn test_status_transitions() {
        assert!(ProcessingStatus::Pending.can_transition_to(ProcessingStatus::Running));
        assert!(ProcessingStatus::Running.can_transition_to(ProcessingStatus::Completed));
        assert!(ProcessingStatus::Running.can_transition_to(ProcessingStatus::Failed));
        assert!(ProcessingStatus::Running.can_transition_to(ProcessingStatus::Cancelled));
        assert!(!ProcessingStatus::Completed.can_transition_to(ProcessingStatus::Running));
        assert!(!ProcessingStatus::Failed.can_transition_to(ProcessingStatus::Pending));
        assert!(!ProcessingStatus::Pending.can_transition_to(ProcessingStatus::Completed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessingStatus::Completed.is_terminal());
        assert!(ProcessingStatus::Failed.is_terminal());
        assert!(ProcessingStatus::Cancelled.is_terminal());
        assert!(!ProcessingStatus::Pending.is_terminal());
        assert!(!ProcessingStatus::Running.is_terminal());
    }

    #[test]
    fn test_source_transition() {
        let mut source = Source::new("guide", "v1");
        assert_eq!(source.status, ProcessingStatus::Pending);

        assert!(source.transition(ProcessingStatus::Running));
        assert_eq!(source.status, ProcessingStatus::Running);

        // Illegal transition is rejected without mutating state
        assert!(!source.transition(ProcessingStatus::Pending));
        assert_eq!(source.status, ProcessingStatus::Running);

        assert!(source.transition(ProcessingStatus::Completed));
        assert!(source.status.is_terminal());
        assert!(!source.transition(ProcessingStatus::Running));
    }

    #[test]
    fn test_source_serialization() {
        let source = Source::new("guide", "v1");
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"pending\""));
        let back: Source = serde_json::from_str(&json).unwrap();
        assert_eq!(back, source);
    }
}
