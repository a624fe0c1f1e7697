//! Format readers: raw bytes in, UTF-8 text plus structural hints out.
//!
//! Heavy format parsing (PDF, DOCX layout) lives outside the engine; external
//! parsers plug in through [`FormatReader`]. Built-in readers cover plain
//! text, Markdown and tag-stripped HTML, with memory mapping for large files.

// Memory mapping requires unsafe but is read-only here
#![allow(unsafe_code)]

use crate::core::SourceFormat;
use crate::error::{ExtractionError, Result};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size to read into memory (1GB).
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Optional structural hints a reader can attach to extracted text.
///
/// All offsets are byte offsets into the extracted text. Readers that cannot
/// provide a hint leave the field empty; the structure analyzer then works
/// from the text alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderHints {
    /// Byte offsets where paragraphs begin.
    pub paragraph_offsets: Vec<usize>,
    /// Byte offsets of heading lines.
    pub heading_offsets: Vec<usize>,
    /// `(byte_offset, page_number)` pairs, 1-based pages, ascending offsets.
    pub page_breaks: Vec<(usize, u32)>,
}

impl ReaderHints {
    /// The 1-based page number covering a byte offset, if pages are known.
    #[must_use]
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let mut page = None;
        for &(break_offset, number) in &self.page_breaks {
            if break_offset <= offset {
                page = Some(number);
            } else {
                break;
            }
        }
        page
    }
}

/// Text extracted from a source document.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    /// UTF-8 text content.
    pub text: String,
    /// Structural hints, possibly empty.
    pub hints: ReaderHints,
}

/// Capability contract for format-specific text extraction.
pub trait FormatReader: Send + Sync {
    /// Extracts UTF-8 text and optional hints from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if the file cannot be read or decoded.
    fn read(&self, path: &Path) -> Result<Extracted>;

    /// Name of the reader, for logs and reports.
    fn name(&self) -> &'static str;
}

/// File reader with support for memory mapping.
///
/// Small files (< 1MB) are read directly; larger files are memory-mapped.
pub struct FileReader {
    file: File,
    size: u64,
    path: String,
}

impl FileReader {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, can't be opened, or
    /// exceeds the size ceiling.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(ExtractionError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| ExtractionError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let metadata = file.metadata().map_err(|e| ExtractionError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let size = metadata.len();
        if size > MAX_FILE_SIZE {
            return Err(ExtractionError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self { file, size, path: path_str })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Reads the file content as a string, memory-mapping large files.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or content is not valid UTF-8.
    pub fn read_to_string(&self) -> Result<String> {
        let bytes = self.read_to_bytes()?;
        String::from_utf8(bytes).map_err(|e| {
            ExtractionError::InvalidUtf8 { offset: e.utf8_error().valid_up_to() }.into()
        })
    }

    /// Reads the file content as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn read_to_bytes(&self) -> Result<Vec<u8>> {
        if self.size >= MMAP_THRESHOLD {
            // Safety: read-only mapping of a file we hold open
            let mmap = unsafe {
                Mmap::map(&self.file).map_err(|e| ExtractionError::MmapFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?
            };
            Ok(mmap.to_vec())
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let mut buffer = Vec::with_capacity(self.size as usize);
            let mut file = &self.file;
            file.read_to_end(&mut buffer).map_err(|e| ExtractionError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
            Ok(buffer)
        }
    }

    /// Reads the first `n` bytes of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn read_prefix(&self, n: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; n.min(usize::try_from(self.size).unwrap_or(usize::MAX))];
        let mut file = &self.file;
        let read = file.read(&mut buffer).map_err(|e| ExtractionError::ReadFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        buffer.truncate(read);
        Ok(buffer)
    }
}

/// Reader for plain UTF-8 text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl FormatReader for PlainTextReader {
    fn read(&self, path: &Path) -> Result<Extracted> {
        let text = FileReader::open(path)?.read_to_string()?;
        let hints = ReaderHints {
            paragraph_offsets: paragraph_offsets(&text),
            ..ReaderHints::default()
        };
        Ok(Extracted { text, hints })
    }

    fn name(&self) -> &'static str {
        "plain-text"
    }
}

/// Reader for Markdown files: passes text through and marks ATX headings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReader;

impl FormatReader for MarkdownReader {
    fn read(&self, path: &Path) -> Result<Extracted> {
        let text = FileReader::open(path)?.read_to_string()?;
        let mut heading_offsets = Vec::new();
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') && trimmed.trim_start_matches('#').starts_with(' ') {
                heading_offsets.push(offset);
            }
            offset += line.len();
        }
        let hints = ReaderHints {
            paragraph_offsets: paragraph_offsets(&text),
            heading_offsets,
            ..ReaderHints::default()
        };
        Ok(Extracted { text, hints })
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

/// Minimal HTML reader: strips tags, decodes a few common entities.
///
/// Serious HTML extraction should be registered externally; this keeps HTML
/// sources searchable rather than failing ingestion outright.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextReader;

impl FormatReader for HtmlTextReader {
    fn read(&self, path: &Path) -> Result<Extracted> {
        let raw = FileReader::open(path)?.read_to_string()?;
        let mut text = String::with_capacity(raw.len());
        let mut in_tag = false;
        for ch in raw.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    // Block-ish boundary; collapse handled below
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                c if !in_tag => text.push(c),
                _ => {}
            }
        }
        let text = text
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&nbsp;", " ");
        let hints = ReaderHints {
            paragraph_offsets: paragraph_offsets(&text),
            ..ReaderHints::default()
        };
        Ok(Extracted { text, hints })
    }

    fn name(&self) -> &'static str {
        "html-text"
    }
}

/// Registry mapping formats to readers.
///
/// Ships with text, markdown and HTML readers; PDF/DOCX extraction must be
/// registered by the embedding application.
pub struct ReaderRegistry {
    readers: HashMap<SourceFormat, Box<dyn FormatReader>>,
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        let mut readers: HashMap<SourceFormat, Box<dyn FormatReader>> = HashMap::new();
        readers.insert(SourceFormat::Text, Box::new(PlainTextReader));
        readers.insert(SourceFormat::Unknown, Box::new(PlainTextReader));
        readers.insert(SourceFormat::Markdown, Box::new(MarkdownReader));
        readers.insert(SourceFormat::Html, Box::new(HtmlTextReader));
        Self { readers }
    }
}

impl ReaderRegistry {
    /// Creates the default registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a reader for a format.
    pub fn register(&mut self, format: SourceFormat, reader: Box<dyn FormatReader>) {
        self.readers.insert(format, reader);
    }

    /// Looks up the reader for a format.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::UnsupportedFormat` if no reader is
    /// registered.
    pub fn reader_for(&self, format: SourceFormat) -> Result<&dyn FormatReader> {
        self.readers
            .get(&format)
            .map(AsRef::as_ref)
            .ok_or_else(|| {
                ExtractionError::UnsupportedFormat { format: format.as_str().to_string() }.into()
            })
    }
}

/// Computes byte offsets where paragraphs begin (after blank-line runs).
fn paragraph_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\n' && bytes[i + 1] == b'\n' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j] == b'\n' {
                j += 1;
            }
            if j < bytes.len() {
                offsets.push(j);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    offsets
}
