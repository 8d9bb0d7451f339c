use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::{BIG5, Encoding, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::error::ExtractError;
use crate::model::PageText;
use crate::options::PageSelection;
use crate::table_parse::{soft_split_line_into_cells, split_line_into_cells};

const FORM_FEED: char = '\u{000C}';

/// pdf-extract separates pages with form feeds, with one trailing after the last page.
fn split_form_feed_pages(raw_text: &str) -> Vec<&str> {
    raw_text
        .strip_suffix(FORM_FEED)
        .unwrap_or(raw_text)
        .split(FORM_FEED)
        .collect()
}

#[derive(Debug, Default)]
struct CharStats {
    total: usize,
    replacement: usize,
    control: usize,
    cjk: usize,
    cjk_ext_a: usize,
}

impl CharStats {
    fn of(text: &str) -> Self {
        text.chars().fold(Self::default(), |mut stats, ch| {
            stats.total += 1;
            match ch {
                '\u{FFFD}' => stats.replacement += 1,
                '\n' | '\r' | '\t' => {}
                ch if ch.is_control() => stats.control += 1,
                '\u{3400}'..='\u{4DBF}' => {
                    stats.cjk += 1;
                    stats.cjk_ext_a += 1;
                }
                '\u{4E00}'..='\u{9FFF}' => stats.cjk += 1,
                _ => {}
            }
            stats
        })
    }

    /// Mojibake from a wrong CMap shows up as replacement characters, stray
    /// control codes, or an implausible share of rare CJK extension-A glyphs.
    fn looks_garbled(&self) -> bool {
        self.replacement * 8 > self.total
            || self.control * 5 > self.total
            || (self.cjk > 20 && self.cjk_ext_a * 4 > self.cjk)
    }
}

fn looks_decoding_broken(text: &str) -> bool {
    text.contains("?Identity-H Unimplemented?") || CharStats::of(text).looks_garbled()
}

fn fallback_encoding(font_encoding: &str) -> Option<&'static Encoding> {
    let name = font_encoding.to_ascii_lowercase();
    if ["utf16", "ucs2", "identity-h", "unicode"]
        .iter()
        .any(|hint| name.contains(hint))
    {
        Some(UTF_16BE)
    } else if ["big5", "b5", "eten", "cns"]
        .iter()
        .any(|hint| name.contains(hint))
    {
        Some(BIG5)
    } else {
        None
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .filter(|text| !text.is_empty())
        .map(|text| text.into_owned())
}

fn decode_pdf_bytes(font_encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(font_encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let with_bom = bytes
        .strip_prefix(&[0xFE, 0xFF])
        .or_else(|| bytes.strip_prefix(&[0xFF, 0xFE]));
    with_bom
        .and_then(|payload| decode_strict(UTF_16BE, payload))
        .or_else(|| {
            font_encoding
                .and_then(fallback_encoding)
                .and_then(|encoding| decode_strict(encoding, bytes))
        })
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let (lines, tabular, numeric) = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold((0_i64, 0_i64, 0_i64), |(lines, tabular, numeric), line| {
            let is_tabular = split_line_into_cells(line).len() >= 2
                || soft_split_line_into_cells(line).len() >= 3;
            let has_digit = line.chars().any(|ch| ch.is_ascii_digit());
            (
                lines + 1,
                tabular + i64::from(is_tabular),
                numeric + i64::from(has_digit),
            )
        });

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    tabular * 50 + numeric * 15 + lines - broken_penalty
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSource {
    PdfExtract,
    ContentStream,
    Lopdf,
}

impl TextSource {
    const fn label(self) -> &'static str {
        match self {
            Self::PdfExtract => "pdf-extract",
            Self::ContentStream => "content stream",
            Self::Lopdf => "lopdf",
        }
    }
}

#[derive(Debug)]
struct TextCandidate {
    source: TextSource,
    text: String,
    score: i64,
}

impl TextCandidate {
    fn new(source: TextSource, text: String) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let score = extraction_quality_score(&text);
        Some(Self {
            source,
            text,
            score,
        })
    }
}

/// Highest score wins; on a tie the earliest candidate is kept.
fn choose_best_text(candidates: Vec<TextCandidate>) -> Option<TextCandidate> {
    candidates
        .into_iter()
        .reduce(|best, next| if next.score > best.score { next } else { best })
}

fn push_operand_text(line: &mut String, font_encoding: Option<&str>, operand: &Object) {
    match operand {
        Object::String(bytes, _) => line.push_str(&decode_pdf_bytes(font_encoding, bytes)),
        Object::Array(items) => {
            for item in items {
                push_operand_text(line, font_encoding, item);
            }
            line.push(' ');
        }
        // Large negative TJ kerning is a visual word gap.
        Object::Integer(adjustment) if *adjustment < -100 => line.push(' '),
        _ => {}
    }
}

/// Text-showing operators joined into lines, breaking wherever the text matrix moves.
fn content_stream_text(document: &Document, page_id: ObjectId) -> Option<String> {
    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let font_encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut font_encoding = None;
    let mut break_line = |line: &mut String| {
        if !line.trim().is_empty() {
            lines.push(std::mem::take(line));
        }
        line.clear();
    };

    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                font_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|name| font_encodings.get(name).copied());
            }
            "Tj" | "TJ" => {
                for operand in &operation.operands {
                    push_operand_text(&mut line, font_encoding, operand);
                }
            }
            // `'` and `"` move to the next line before showing their string.
            "'" | "\"" => {
                break_line(&mut line);
                if let Some(operand) = operation.operands.last() {
                    push_operand_text(&mut line, font_encoding, operand);
                }
            }
            "T*" | "Td" | "TD" | "ET" => break_line(&mut line),
            _ => {}
        }
    }
    break_line(&mut line);

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// A loaded PDF together with the text pdf-extract produced for the whole file.
pub(crate) struct PdfSource {
    pub document: Document,
    extracted_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PdfPage {
    pub text: PageText,
    pub page_id: ObjectId,
}

fn pdf_extract_text(
    result: Result<String, pdf_extract::OutputError>,
    origin: &str,
) -> Option<String> {
    result
        .map_err(|error| debug!("pdf-extract failed for {origin}: {error}"))
        .ok()
}

pub(crate) fn load_pdf(input_pdf: &Path) -> Result<PdfSource, ExtractError> {
    if !input_pdf.exists() {
        return Err(ExtractError::FileNotFound(input_pdf.to_path_buf()));
    }

    let document = Document::load(input_pdf)?;
    let extracted_text = pdf_extract_text(
        pdf_extract::extract_text(input_pdf),
        &input_pdf.display().to_string(),
    );
    Ok(PdfSource {
        document,
        extracted_text,
    })
}

pub(crate) fn load_pdf_bytes(input_pdf: &[u8]) -> Result<PdfSource, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    let extracted_text = pdf_extract_text(
        pdf_extract::extract_text_from_mem(input_pdf),
        "in-memory PDF",
    );
    Ok(PdfSource {
        document,
        extracted_text,
    })
}

pub(crate) fn read_pdf_pages(
    source: &PdfSource,
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PdfPage>, ExtractError> {
    let document = &source.document;
    let page_ids = document.get_pages();

    // Per-page pdf-extract text is only trustworthy when the form-feed split
    // agrees with the page tree. A single-page document can use it whole.
    let extracted_pages = source
        .extracted_text
        .as_deref()
        .map(split_form_feed_pages)
        .filter(|pages| pages.len() == page_ids.len() || page_ids.len() == 1);

    let mut pages = Vec::new();
    for (index, (&page_number, &page_id)) in page_ids.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(page_number)) {
            continue;
        }

        let pdf_extract_page = extracted_pages.as_ref().and_then(|extracted| {
            if extracted.len() == page_ids.len() {
                extracted.get(index).map(|text| (*text).to_string())
            } else {
                source.extracted_text.clone()
            }
        });

        let candidates = [
            content_stream_text(document, page_id)
                .and_then(|text| TextCandidate::new(TextSource::ContentStream, text)),
            pdf_extract_page.and_then(|text| TextCandidate::new(TextSource::PdfExtract, text)),
            document
                .extract_text(&[page_number])
                .ok()
                .and_then(|text| TextCandidate::new(TextSource::Lopdf, text)),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
        let candidate_count = candidates.len();

        let text = match choose_best_text(candidates) {
            Some(best) => {
                trace!(
                    "page {page_number}: using {} text (score {}, {candidate_count} candidate(s))",
                    best.source.label(),
                    best.score
                );
                best.text
            }
            None => {
                trace!("page {page_number}: no text layer");
                String::new()
            }
        };

        pages.push(PdfPage {
            text: PageText { page_number, text },
            page_id,
        });
    }

    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::{
        CharStats, TextCandidate, TextSource, choose_best_text, decode_pdf_bytes,
        fallback_encoding, looks_decoding_broken, split_form_feed_pages,
    };

    fn candidate(source: TextSource, text: &str) -> TextCandidate {
        TextCandidate::new(source, text.to_string()).expect("candidate has text")
    }

    #[test]
    fn splits_form_feed_delimited_pages() {
        assert_eq!(split_form_feed_pages("p1\u{000C}p2\u{000C}"), vec!["p1", "p2"]);
        assert_eq!(split_form_feed_pages("only"), vec!["only"]);
    }

    #[test]
    fn decodes_big5_when_encoding_hint_is_present() {
        let (bytes, _, had_errors) = encoding_rs::BIG5.encode("測試");
        assert!(!had_errors);
        let decoded = decode_pdf_bytes(Some("ETen-B5-H"), &bytes);
        assert_eq!(decoded, "測試");
    }

    #[test]
    fn maps_font_encodings_to_fallbacks() {
        assert_eq!(fallback_encoding("Identity-H"), Some(encoding_rs::UTF_16BE));
        assert_eq!(fallback_encoding("UniCNS-UCS2-H"), Some(encoding_rs::UTF_16BE));
        assert_eq!(fallback_encoding("ETen-B5-H"), Some(encoding_rs::BIG5));
        assert_eq!(fallback_encoding("WinAnsiEncoding"), None);
    }

    #[test]
    fn flags_unimplemented_identity_h_output() {
        assert!(looks_decoding_broken("?Identity-H Unimplemented?"));
        assert!(!looks_decoding_broken("Quarterly revenue by region"));
    }

    #[test]
    fn counts_replacement_and_control_characters() {
        let stats = CharStats::of("a\u{FFFD}\u{0001}\n");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.replacement, 1);
        assert_eq!(stats.control, 1);
        assert!(stats.looks_garbled());
    }

    #[test]
    fn prefers_tabular_text_candidates() {
        let best = choose_best_text(vec![
            candidate(TextSource::PdfExtract, "Revenue by region"),
            candidate(
                TextSource::ContentStream,
                "Region  Q1  Q2\nNorth  10  20\nSouth  30  40",
            ),
        ])
        .expect("one candidate wins");
        assert_eq!(best.source, TextSource::ContentStream);
        assert!(best.text.starts_with("Region"));
    }

    #[test]
    fn ties_keep_the_earliest_candidate() {
        let best = choose_best_text(vec![
            candidate(TextSource::ContentStream, "Name  Age"),
            candidate(TextSource::PdfExtract, "Name  Age"),
        ])
        .expect("one candidate wins");
        assert_eq!(best.source, TextSource::ContentStream);
    }

    #[test]
    fn blank_text_is_not_a_candidate() {
        assert!(TextCandidate::new(TextSource::Lopdf, " \n ".to_string()).is_none());
        assert!(choose_best_text(Vec::new()).is_none());
    }
}
