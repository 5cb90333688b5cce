use anyhow::{bail, Context};
use routebook_core::{RouteBook, StopRecord};
use routebook_export::CsvDialect;
use routebook_ocr::{OcrBackend, PageScan, PipelineError, RoutePipeline, RouteParser};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::{Args, Commands, EditArgs, OutputFormat, ScanArgs, ShowArgs};
use crate::config::{AppConfig, OcrConfig};

pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    match args.command {
        Commands::Scan(scan) => {
            let book = scan_pages(&scan, &config).await?;
            let stops = filtered(&book, scan.search.as_deref());
            let dialect = scan.dialect.unwrap_or(config.export.dialect);
            write_output(scan.output.as_deref(), &stops, scan.format, dialect)
        }
        Commands::Edit(edit) => {
            let dialect = edit.dialect.unwrap_or(config.export.dialect);
            edit_book(&edit, dialect)
        }
        Commands::Show(show) => show_book(&show, config.export.dialect),
    }
}

// ── scan ──────────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
fn build_recognizer(ocr: &OcrConfig) -> Box<dyn OcrBackend> {
    use routebook_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    Box::new(TesseractRecognizer::new(ocr.data_path.clone(), &ocr.lang))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(ocr: &OcrConfig) -> Box<dyn OcrBackend> {
    tracing::debug!(
        "No OCR engine compiled in (lang {}, data path {:?}); image pages will fail",
        ocr.lang,
        ocr.data_path
    );
    Box::new(routebook_ocr::UnavailableRecognizer)
}

fn text_page(page_hash: String, bytes: &[u8]) -> PageScan {
    let ocr_text = String::from_utf8_lossy(bytes).into_owned();
    let (stops, summary) = RouteParser::parse_with_summary(&ocr_text);
    PageScan { page_hash, ocr_text, stops, summary }
}

/// Scan every input in order and concatenate the stops.
///
/// A page that fails is reported and skipped. Only a run where every page
/// failed is an error.
pub async fn scan_pages(args: &ScanArgs, config: &AppConfig) -> anyhow::Result<RouteBook> {
    let pipeline = RoutePipeline::new(build_recognizer(&config.ocr), config.preprocess.clone());
    scan_with(args, &pipeline).await
}

async fn scan_with<R: OcrBackend>(
    args: &ScanArgs,
    pipeline: &RoutePipeline<R>,
) -> anyhow::Result<RouteBook> {
    let mut book = RouteBook::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut failed: Vec<PathBuf> = Vec::new();

    for path in &args.inputs {
        tracing::info!("Processing page: {}", path.display());
        let result = match tokio::fs::read(path).await {
            Ok(bytes) => {
                // Identical uploads are dropped before any OCR work.
                let page_hash = routebook_ocr::page_hash(&bytes);
                if !seen.insert(page_hash.clone()) {
                    tracing::warn!("Skipping {}: same page was already scanned", path.display());
                    continue;
                }
                if args.text {
                    Ok(text_page(page_hash, &bytes))
                } else {
                    pipeline.process_bytes(&bytes)
                }
            }
            Err(e) => Err(PipelineError::from(e)),
        };

        let scan = match result {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Could not process {}: {e}", path.display());
                failed.push(path.clone());
                continue;
            }
        };

        if scan.is_empty() {
            tracing::warn!(
                "No route data could be found in {}. Try another photo of this page.",
                path.display()
            );
            continue;
        }

        let summary = book.append_batch(scan.stops);
        tracing::info!("Added {} stops from {}", summary.added, path.display());
    }

    if !failed.is_empty() && failed.len() == args.inputs.len() {
        bail!("none of the {} page(s) could be processed", failed.len());
    }

    let dups = book.duplicate_sequences();
    if !dups.is_empty() {
        tracing::warn!("Sequence numbers used more than once: {}", dups.join(", "));
    }

    Ok(book)
}

fn filtered<'a>(book: &'a RouteBook, search: Option<&str>) -> Vec<&'a StopRecord> {
    match search {
        Some(term) => book.search(term),
        None => book.stops().iter().collect(),
    }
}

// ── edit / show ───────────────────────────────────────────────────────────────

fn load_book(path: &Path) -> anyhow::Result<RouteBook> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let stops = routebook_export::read_stops(file)
        .with_context(|| format!("reading stops from {}", path.display()))?;
    Ok(stops.into_iter().collect())
}

pub fn apply_edits(book: &mut RouteBook, args: &EditArgs) -> anyhow::Result<()> {
    for seq in &args.delete {
        let n = book.delete_stop(seq)?;
        tracing::info!("Deleted {n} stop(s) with sequence {seq}");
    }
    for edit in &args.set {
        book.update_stop_named(&edit.sequence, &edit.field, &edit.value)?;
        tracing::info!("Set {} on stop {}", edit.field, edit.sequence);
    }
    for _ in 0..args.add {
        let seq = book.add_stop().sequence.clone();
        tracing::info!("Added blank stop {seq}");
    }
    Ok(())
}

fn edit_book(args: &EditArgs, dialect: CsvDialect) -> anyhow::Result<()> {
    let mut book = load_book(&args.file)?;
    apply_edits(&mut book, args)?;
    let target = args.output.as_deref().unwrap_or(&args.file);
    let stops: Vec<&StopRecord> = book.stops().iter().collect();
    write_output(Some(target), &stops, OutputFormat::Csv, dialect)
}

fn show_book(args: &ShowArgs, dialect: CsvDialect) -> anyhow::Result<()> {
    let book = load_book(&args.file)?;
    let stops = filtered(&book, args.search.as_deref());
    write_output(None, &stops, args.format, dialect)
}

// ── output ────────────────────────────────────────────────────────────────────

fn write_output(
    path: Option<&Path>,
    stops: &[&StopRecord],
    format: OutputFormat,
    dialect: CsvDialect,
) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            // Rendered beside the target, then renamed over it. The old file
            // survives a failed write.
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(dir)
                .with_context(|| format!("creating temporary file in {}", dir.display()))?;
            render(&mut std::io::BufWriter::new(tmp.as_file_mut()), stops, format, dialect)?;
            tmp.persist(path)
                .map_err(|e| e.error)
                .with_context(|| format!("replacing {}", path.display()))?;
            tracing::info!("Wrote {} stops to {}", stops.len(), path.display());
            Ok(())
        }
        None => {
            let mut out = std::io::stdout().lock();
            render(&mut out, stops, format, dialect)?;
            // Legacy CSV has no final newline; keep the shell prompt on its own line.
            if format == OutputFormat::Csv && dialect == CsvDialect::Legacy {
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

pub fn render<W: Write>(
    w: &mut W,
    stops: &[&StopRecord],
    format: OutputFormat,
    dialect: CsvDialect,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => {
            let owned: Vec<StopRecord> = stops.iter().map(|s| (*s).clone()).collect();
            routebook_export::write_stops(&mut *w, &owned, dialect)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, stops)?;
            writeln!(w)?;
        }
        OutputFormat::Table => write_table(w, stops)?,
    }
    w.flush()?;
    Ok(())
}

const TABLE_HEADINGS: [&str; 7] =
    ["Seq #", "Address", "Street Name", "Unit", "Type", "Additional Info", "Notes"];

fn write_table<W: Write>(w: &mut W, stops: &[&StopRecord]) -> std::io::Result<()> {
    if stops.is_empty() {
        return writeln!(w, "No route data available.");
    }

    let rows: Vec<[&str; 7]> = stops
        .iter()
        .map(|s| {
            [
                s.sequence.as_str(),
                s.address.as_str(),
                s.street_name.as_str(),
                s.unit.as_str(),
                s.delivery_type.as_str(),
                s.additional_info.as_deref().unwrap_or(""),
                s.notes.as_str(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADINGS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = widths.map(|n| "-".repeat(n));
    writeln!(w, "{}", pad_row(&TABLE_HEADINGS, &widths))?;
    writeln!(w, "{}", pad_row(&rule.each_ref().map(String::as_str), &widths))?;
    for row in &rows {
        writeln!(w, "{}", pad_row(row, &widths))?;
    }
    Ok(())
}

fn pad_row(cells: &[&str; 7], widths: &[usize; 7]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, &width)| format!("{c:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
