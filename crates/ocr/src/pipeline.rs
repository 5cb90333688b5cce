use std::path::Path;
use thiserror::Error;

use routebook_core::StopRecord;

use crate::hash;
use crate::parse::{ParseSummary, RouteParser};
use crate::preprocess::{self, PreprocessOptions};
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// One photographed route book page after recognition and parsing.
#[derive(Debug)]
pub struct PageScan {
    /// SHA-256 hex of the uploaded file.
    pub page_hash: String,
    pub ocr_text: String,
    pub stops: Vec<StopRecord>,
    pub summary: ParseSummary,
}

impl PageScan {
    /// The engine ran but no stop lines were found; ask for a better photo.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Runs: hash → preprocess → OCR → parse.
///
/// A page whose OCR fails yields an error and no stops at all.
pub struct RoutePipeline<R: OcrBackend> {
    recognizer: R,
    options: PreprocessOptions,
}

impl<R: OcrBackend> RoutePipeline<R> {
    pub fn new(recognizer: R, options: PreprocessOptions) -> Self {
        Self { recognizer, options }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub async fn process_file(&self, path: &Path) -> Result<PageScan, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        self.process_bytes(&bytes)
    }

    pub fn process_bytes(&self, data: &[u8]) -> Result<PageScan, PipelineError> {
        let page_hash = hash::page_hash(data);

        let image_bytes = preprocess::prepare_for_ocr_from_bytes(data, &self.options)?;
        let ocr_text = self.recognizer.recognize(&image_bytes)?;

        let (stops, summary) = RouteParser::parse_with_summary(&ocr_text);
        tracing::debug!(
            "Page {}: {} lines, {} headers, {} skipped, {} stops",
            &page_hash[..12],
            summary.lines,
            summary.headers,
            summary.skipped,
            summary.stops
        );

        Ok(PageScan { page_hash, ocr_text, stops, summary })
    }
}
