//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::Source;
use crate::pipeline::IngestionReport;
use crate::quality::ValidationReport;
use crate::retrieval::RetrievalResponse;
use crate::storage::StoreStats;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Formats an ingestion report.
#[must_use]
pub fn format_ingestion(report: &IngestionReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Ingested {} ({})", report.source_id, report.version);
            let _ = writeln!(output, "  Status:    {}", report.status.as_str());
            let _ = writeln!(
                output,
                "  Chunks:    {} total, {} new, {} unchanged, {} removed, {} rejected",
                report.counts.total,
                report.counts.new,
                report.counts.unchanged,
                report.counts.removed,
                report.counts.rejected,
            );
            let _ = writeln!(output, "  Vectors:   {}", report.counts.vectors);
            if let Some(validation) = &report.validation {
                let _ = writeln!(
                    output,
                    "  Quality:   {:.1}/100 ({:?})",
                    validation.overall_score, validation.grade
                );
            }
            for error in &report.errors {
                let _ = writeln!(output, "  Error:     {error}");
            }
            for warning in &report.warnings {
                let _ = writeln!(output, "  Warning:   {warning}");
            }
            output
        }
    }
}

/// Formats a retrieval response.
#[must_use]
pub fn format_retrieval(response: &RetrievalResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Item<'a> {
                chunk_id: &'a str,
                score: f64,
                strategy: &'a str,
                heading: Option<&'a str>,
                section_path: &'a [String],
                page_number: Option<u32>,
                source_id: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Response<'a> {
                items: Vec<Item<'a>>,
                strategy_stats: &'a std::collections::BTreeMap<String, usize>,
                degraded: bool,
            }
            format_json(&Response {
                items: response
                    .items
                    .iter()
                    .map(|item| Item {
                        chunk_id: &item.chunk.chunk_id,
                        score: item.score,
                        strategy: item.strategy.as_str(),
                        heading: item.citation.heading.as_deref(),
                        section_path: &item.citation.section_path,
                        page_number: item.citation.page_number,
                        source_id: &item.citation.source_id,
                        content: &item.chunk.content,
                    })
                    .collect(),
                strategy_stats: &response.strategy_stats,
                degraded: response.degraded,
            })
        }
        OutputFormat::Text => {
            let mut output = String::new();
            if response.degraded {
                let _ = writeln!(output, "(degraded: some strategies were unavailable)");
            }
            if response.items.is_empty() {
                output.push_str("No results.\n");
                return output;
            }
            for (rank, item) in response.items.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{}. [{:.2}] {} ({})",
                    rank + 1,
                    item.score,
                    item.citation.heading.as_deref().unwrap_or("(no heading)"),
                    item.strategy.as_str(),
                );
                let _ = writeln!(
                    output,
                    "   {} / {}",
                    item.citation.source_id,
                    item.citation.section_path.join(" > "),
                );
                let preview = item.chunk.preview(160);
                let ellipsis = if preview.len() < item.chunk.content.len() { "..." } else { "" };
                let _ = writeln!(output, "   {preview}{ellipsis}");
            }
            output
        }
    }
}

/// Formats a source listing.
#[must_use]
pub fn format_sources(sources: &[Source], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(&sources),
        OutputFormat::Text => {
            if sources.is_empty() {
                return "No sources.\n".to_string();
            }
            let mut output = String::new();
            for source in sources {
                let _ = writeln!(
                    output,
                    "{}  {}  {}  {}  {} bytes",
                    source.source_id,
                    source.version,
                    source.format.as_str(),
                    source.status.as_str(),
                    source.size_bytes,
                );
            }
            output
        }
    }
}

/// Formats a validation report.
#[must_use]
pub fn format_validation(report: &ValidationReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(
                output,
                "Overall: {:.1}/100 ({:?}) over {} chunk(s)",
                report.overall_score, report.grade, report.chunk_count
            );
            let _ = writeln!(
                output,
                "  basic {:.1}  content {:.1}  structural {:.1}  duplicates {:.1}  embedding {:.1}",
                report.axes.basic,
                report.axes.content,
                report.axes.structural,
                report.axes.duplicates,
                report.axes.embedding,
            );
            for issue in &report.issues {
                let _ = writeln!(output, "  Issue:   {issue}");
            }
            for warning in &report.warnings {
                let _ = writeln!(output, "  Warning: {warning}");
            }
            for (category, items) in &report.recommendations {
                for item in items {
                    let _ = writeln!(output, "  [{category}] {item}");
                }
            }
            output
        }
    }
}

/// Formats store statistics.
#[must_use]
pub fn format_stats(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(stats),
        OutputFormat::Text => {
            let mut output = String::new();
            output.push_str("Store statistics\n");
            let _ = writeln!(output, "  Sources:     {}", stats.source_count);
            let _ = writeln!(output, "  Chunks:      {}", stats.chunk_count);
            for (scale, count) in &stats.chunks_per_scale {
                let _ = writeln!(output, "    {scale:<10} {count}");
            }
            let _ = writeln!(output, "  Embeddings:  {}", stats.embedding_count);
            if let Some(dimensions) = stats.dimensions {
                let _ = writeln!(output, "  Dimensions:  {dimensions}");
            }
            if let Some(size) = stats.db_size {
                let _ = writeln!(output, "  DB size:     {size} bytes");
            }
            output
        }
    }
}

/// Formats an error for the chosen output format.
#[must_use]
pub fn format_error(error: &crate::error::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            format!("{{\"error\": {}}}", serde_json::json!(error.to_string()))
        }
        OutputFormat::Text => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProcessingStatus;
    use crate::pipeline::IngestionCounts;

    fn sample_report() -> IngestionReport {
        IngestionReport {
            source_id: "guide".to_string(),
            version: "v1".to_string(),
            status: ProcessingStatus::Completed,
            counts: IngestionCounts { total: 5, new: 5, ..IngestionCounts::default() },
            errors: Vec::new(),
            warnings: vec!["one warning".to_string()],
            validation: None,
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_format_ingestion_text() {
        let text = format_ingestion(&sample_report(), OutputFormat::Text);
        assert!(text.contains("guide"));
        assert!(text.contains("completed"));
        assert!(text.contains("one warning"));
    }

    #[test]
    fn test_format_ingestion_json_parses() {
        let json = format_ingestion(&sample_report(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source_id"], "guide");
        assert_eq!(value["counts"]["total"], 5);
    }

    #[test]
    fn test_format_sources_empty() {
        let text = format_sources(&[], OutputFormat::Text);
        assert!(text.contains("No sources"));
    }

    #[test]
    fn test_format_error_json() {
        let err = crate::error::Error::validation("bad input");
        let json = format_error(&err, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["error"].as_str().unwrap().contains("bad input"));
    }
}
