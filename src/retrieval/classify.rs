//! Query classification.
//!
//! Maps a natural-language query to a query type and extracts the
//! stop-word-filtered, lightly stemmed keywords the retriever uses for
//! contextual relevance scoring.

use serde::{Deserialize, Serialize};

/// Query type driving content-type weighting and filtered retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// "how do I…", step-seeking queries.
    Procedure,
    /// "what is…", meaning-seeking queries.
    Definition,
    /// Enumeration queries.
    List,
    /// Error/fix queries.
    Troubleshoot,
    /// Everything else.
    General,
}

impl QueryType {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Procedure => "procedure",
            Self::Definition => "definition",
            Self::List => "list",
            Self::Troubleshoot => "troubleshoot",
            Self::General => "general",
        }
    }
}

/// Classified query: type plus extracted keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedQuery {
    /// Detected query type.
    pub query_type: QueryType,
    /// Stop-word-filtered, stemmed keywords in query order.
    pub keywords: Vec<String>,
}

/// Classifies a query string.
#[must_use]
pub fn classify_query(query: &str) -> ClassifiedQuery {
    let lower = query.to_lowercase();
    let trimmed = lower.trim();

    let query_type = if trimmed.starts_with("how")
        || contains_word(trimmed, "steps")
        || trimmed.contains("to create")
        || contains_word(trimmed, "procedure")
    {
        QueryType::Procedure
    } else if trimmed.starts_with("what is")
        || trimmed.starts_with("what's")
        || contains_word(trimmed, "means")
        || contains_word(trimmed, "definition")
    {
        QueryType::Definition
    } else if contains_word(trimmed, "list")
        || trimmed.contains("types of")
        || trimmed.contains("kinds of")
    {
        QueryType::List
    } else if contains_word(trimmed, "error")
        || contains_word(trimmed, "problem")
        || contains_word(trimmed, "fix")
        || contains_word(trimmed, "fails")
    {
        QueryType::Troubleshoot
    } else {
        QueryType::General
    };

    ClassifiedQuery { query_type, keywords: extract_keywords(trimmed) }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Extracts keywords: stop words removed, light suffix stemming, original
/// order preserved, duplicates dropped.
#[must_use]
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for token in query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
    {
        if crate::embedding::multiscale::STOP_WORDS.contains(&token) {
            continue;
        }
        let stemmed = stem(token);
        if !keywords.contains(&stemmed) {
            keywords.push(stemmed);
        }
    }
    keywords
}

/// Light suffix stripper; enough to line queries up with chunk text without
/// a full stemmer.
fn stem(word: &str) -> String {
    for suffix in ["ing", "ies", "ed", "es", "s"] {
        if let Some(root) = word.strip_suffix(suffix) {
            if root.len() >= 3 {
                return match suffix {
                    "ies" => format!("{root}y"),
                    _ => root.to_string(),
                };
            }
        }
    }
    word.to_string()
}
