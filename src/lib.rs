mod error;
mod images;
mod json_out;
mod merge;
mod model;
mod ocr;
mod options;
mod pdf_reader;
mod rag_view;
mod summary;
mod table_detect;
mod table_parse;
mod validate;
mod warning;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::images::{PdfImage, page_images};
use crate::model::{DetectedTable, PageText};
use crate::pdf_reader::{PdfPage, PdfSource, load_pdf, load_pdf_bytes, read_pdf_pages};
use crate::table_detect::{LOW_CONFIDENCE_THRESHOLD, detect_tables_in_page};
use crate::warning::WarningCode;

pub use error::ExtractError;
pub use images::{ColorMode, describe_image};
pub use json_out::{read_pages, to_json_string, validated_pages_json, write_json};
pub use merge::detect_merged_cells;
pub use model::{
    Grid, ImageContent, MergedCell, PageContent, TableContent, TableStructure, image_id, table_id,
};
pub use ocr::{
    NoOcr, OcrBackendKind, OcrConfig, OcrError, TesseractCli, TextRecognizer, available_backends,
    backend_available, build_recognizer,
};
#[cfg(feature = "leptess")]
pub use ocr::LeptessRecognizer;
pub use options::{ExtractOptions, PageSelection, QualityMode};
pub use rag_view::{RagTable, RagView, build_rag_view, rows_to_markdown};
pub use summary::{DocumentSummary, PageSummary, render_summary, summarize};
pub use table_parse::normalize_grid;
pub use validate::validate_output;
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub pages: Vec<PageContent>,
    pub warnings: Vec<ExtractWarning>,
}

impl ExtractionReport {
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|page| page.tables.len()).sum()
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|page| page.images.len()).sum()
    }
}

fn apply_quality_mode(
    tables: Vec<DetectedTable>,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<DetectedTable>, ExtractError> {
    let mut out = Vec::new();

    for (index, table) in tables.into_iter().enumerate() {
        if table.confidence >= LOW_CONFIDENCE_THRESHOLD {
            out.push(table);
            continue;
        }

        match options.quality_mode {
            QualityMode::BestEffort => {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::LowConfidence,
                        "table confidence is low; exported in best-effort mode",
                    )
                    .on_page(table.page)
                    .for_table(index + 1, table.confidence),
                );
                out.push(table);
            }
            QualityMode::Strict => {
                return Err(ExtractError::AmbiguousTable {
                    page: table.page,
                    confidence: table.confidence,
                });
            }
            QualityMode::SkipAmbiguous => {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::LowConfidence,
                        "skipping low-confidence table",
                    )
                    .on_page(table.page)
                    .for_table(index + 1, table.confidence),
                );
            }
        }
    }

    Ok(out)
}

fn extract_tables(
    page: &PageText,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<TableContent>, ExtractError> {
    let detected = detect_tables_in_page(page, options.min_cols);
    let kept = apply_quality_mode(detected, options, warnings)?;

    Ok(kept
        .iter()
        .enumerate()
        .map(|(index, table)| TableContent {
            table_id: table_id(page.page_number, index + 1),
            structure: TableStructure {
                rows: normalize_grid(&table.grid),
                merged_cells: detect_merged_cells(&table.grid),
            },
        })
        .collect())
}

fn recognize_image_text(
    image: &PdfImage,
    ocr: &dyn TextRecognizer,
    page: u32,
    number: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> Option<String> {
    if ocr.backend() == OcrBackendKind::None {
        return None;
    }

    let result = image
        .decode()
        .map_err(|error| error.to_string())
        .and_then(|decoded| ocr.recognize(&decoded).map_err(|error| error.to_string()));
    match result {
        Ok(text) => text,
        Err(message) => {
            warn!("OCR failed for image {number} on page {page}: {message}");
            warnings.push(
                ExtractWarning::new(WarningCode::OcrFailed, message)
                    .on_page(page)
                    .for_image(number),
            );
            None
        }
    }
}

fn extract_images(
    source: &PdfSource,
    page: &PdfPage,
    ocr: &dyn TextRecognizer,
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<ImageContent> {
    let page_number = page.text.page_number;

    page_images(&source.document, page.page_id)
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let number = index + 1;
            let image_id = image_id(page_number, number);
            match image {
                Ok(image) => ImageContent {
                    image_id,
                    description: describe_image(&image, number),
                    ocr_text: recognize_image_text(&image, ocr, page_number, number, warnings),
                },
                Err(error) => {
                    warn!("error processing image {number} on page {page_number}: {error}");
                    warnings.push(
                        ExtractWarning::new(WarningCode::ImageExtractionFailed, error.to_string())
                            .on_page(page_number)
                            .for_image(number),
                    );
                    ImageContent {
                        image_id,
                        description: format!("Image {number} (extraction failed)"),
                        ocr_text: None,
                    }
                }
            }
        })
        .collect()
}

fn extract_from_source(
    source: &PdfSource,
    options: &ExtractOptions,
    ocr: &dyn TextRecognizer,
) -> Result<ExtractionReport, ExtractError> {
    options.validate()?;

    let pdf_pages = read_pdf_pages(source, options.pages.as_ref())?;
    let total_pages = pdf_pages.len();
    let mut warnings = Vec::new();
    let mut pages = Vec::with_capacity(total_pages);

    for (index, pdf_page) in pdf_pages.iter().enumerate() {
        let page_number = pdf_page.text.page_number;
        info!("Processing page {}/{total_pages}...", index + 1);

        let text = Some(pdf_page.text.text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let tables = extract_tables(&pdf_page.text, options, &mut warnings)?;
        let images = extract_images(source, pdf_page, ocr, &mut warnings);
        debug!(
            "page {page_number}: {} table(s), {} image(s)",
            tables.len(),
            images.len()
        );

        pages.push(PageContent {
            page_number,
            text,
            tables,
            images,
        });
    }

    if pages.iter().all(|page| page.tables.is_empty()) {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no table rows were detected in the selected pages",
        ));
    }

    Ok(ExtractionReport { pages, warnings })
}

/// Extracts text, tables and images from every selected page of a PDF file.
pub fn extract_pdf_content(
    input_pdf: &Path,
    options: &ExtractOptions,
    ocr: &dyn TextRecognizer,
) -> Result<ExtractionReport, ExtractError> {
    let source = load_pdf(input_pdf)?;
    extract_from_source(&source, options, ocr)
}

pub fn extract_pdf_bytes(
    input_pdf: &[u8],
    options: &ExtractOptions,
    ocr: &dyn TextRecognizer,
) -> Result<ExtractionReport, ExtractError> {
    let source = load_pdf_bytes(input_pdf)?;
    extract_from_source(&source, options, ocr)
}

/// Writes up to `limit` decodable images of `page` into `out_dir`.
///
/// Files are named `diagram_{n}_{width}x{height}.{ext}`; images that cannot be
/// re-encoded as a standalone file are skipped.
pub fn dump_images(
    input_pdf: &Path,
    page: u32,
    limit: usize,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractError> {
    let source = load_pdf(input_pdf)?;
    let page_id = source
        .document
        .get_pages()
        .get(&page)
        .copied()
        .ok_or_else(|| ExtractError::InvalidPageSelection(format!("page {page} does not exist")))?;

    fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    for (index, image) in page_images(&source.document, page_id)
        .into_iter()
        .take(limit)
        .enumerate()
    {
        let number = index + 1;
        let image = match image {
            Ok(image) => image,
            Err(error) => {
                warn!("skipping image {number} on page {page}: {error}");
                continue;
            }
        };
        let Some(data) = image.data.as_deref() else {
            warn!(
                "skipping image {number} on page {page}: {} stream cannot be re-encoded",
                image.format
            );
            continue;
        };

        let path = out_dir.join(format!(
            "diagram_{number}_{}x{}.{}",
            image.width, image.height, image.format
        ));
        fs::write(&path, data)?;
        info!(
            "extracted image {number}: {}x{} {} ({})",
            image.width,
            image.height,
            image.format.to_ascii_uppercase(),
            image.mode.label()
        );
        written.push(path);
    }

    Ok(written)
}
