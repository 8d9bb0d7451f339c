//! Pluggable text recognition for embedded images.
//!
//! A recognizer is built once from [`OcrConfig`] and handed to the extraction
//! pipeline as `&dyn TextRecognizer`. Backends:
//!
//! - `none`: never recognizes anything; `ocr_text` stays `null`
//! - `tesseract`: runs the system `tesseract` binary on a temporary PNG
//! - `leptess`: links Tesseract in process (cargo feature `leptess`)

use std::fmt::{Display, Formatter};
use std::io;
use std::process::Command;
use std::str::FromStr;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend '{0}' is not available: {1}")]
    Unavailable(OcrBackendKind, String),

    #[error("failed to prepare image for OCR: {0}")]
    Image(#[from] image::ImageError),

    #[error("OCR I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("OCR recognition failed: {0}")]
    Recognition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendKind {
    None,
    Tesseract,
    Leptess,
}

impl OcrBackendKind {
    pub const ALL: [Self; 3] = [Self::None, Self::Tesseract, Self::Leptess];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tesseract => "tesseract",
            Self::Leptess => "leptess",
        }
    }
}

impl Display for OcrBackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "tesseract" => Ok(Self::Tesseract),
            "leptess" => Ok(Self::Leptess),
            other => Err(format!(
                "unknown OCR backend '{other}' (expected none, tesseract or leptess)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    /// Tesseract language codes, e.g. `eng` or `eng+deu`.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::None,
            language: "eng".to_string(),
        }
    }
}

/// Recognizes text in a single image.
pub trait TextRecognizer: Send + Sync {
    fn backend(&self) -> OcrBackendKind;

    /// Returns the recognized text, or `None` when the image holds no text.
    fn recognize(&self, image: &DynamicImage) -> Result<Option<String>, OcrError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl TextRecognizer for NoOcr {
    fn backend(&self) -> OcrBackendKind {
        OcrBackendKind::None
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Option<String>, OcrError> {
        Ok(None)
    }
}

fn non_empty(text: &str) -> Option<String> {
    let cleaned = text.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Tesseract only accepts grayscale or RGB input reliably.
fn ocr_ready(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

#[derive(Debug, Clone)]
pub struct TesseractCli {
    language: String,
}

impl TesseractCli {
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let version = tesseract_version().ok_or_else(|| {
            OcrError::Unavailable(
                OcrBackendKind::Tesseract,
                "install it with: sudo apt-get install tesseract-ocr".to_string(),
            )
        })?;
        info!("using {version}");

        Ok(Self {
            language: language.to_string(),
        })
    }
}

fn tesseract_version() -> Option<String> {
    let output = Command::new("tesseract").arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    // Older releases print the banner on stderr.
    let banner = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    String::from_utf8_lossy(&banner)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

impl TextRecognizer for TesseractCli {
    fn backend(&self) -> OcrBackendKind {
        OcrBackendKind::Tesseract
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Option<String>, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("pdf-extract-ocr-")
            .suffix(".png")
            .tempfile()?;
        ocr_ready(image).save_with_format(input.path(), ImageFormat::Png)?;

        let output = Command::new("tesseract")
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()?;

        if !output.status.success() {
            return Err(OcrError::Recognition(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(non_empty(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(feature = "leptess")]
mod leptess_backend {
    use std::io::Cursor;
    use std::sync::Mutex;

    use image::{DynamicImage, ImageFormat};
    use leptess::LepTess;

    use super::{OcrBackendKind, OcrError, TextRecognizer, non_empty, ocr_ready};

    /// In-process Tesseract. The engine handle is not thread-safe, so calls are serialised.
    pub struct LeptessRecognizer {
        engine: Mutex<LepTess>,
    }

    impl LeptessRecognizer {
        pub fn new(language: &str) -> Result<Self, OcrError> {
            let engine = LepTess::new(None, language).map_err(|error| {
                OcrError::Unavailable(OcrBackendKind::Leptess, error.to_string())
            })?;
            Ok(Self {
                engine: Mutex::new(engine),
            })
        }
    }

    impl TextRecognizer for LeptessRecognizer {
        fn backend(&self) -> OcrBackendKind {
            OcrBackendKind::Leptess
        }

        fn recognize(&self, image: &DynamicImage) -> Result<Option<String>, OcrError> {
            let mut png = Cursor::new(Vec::new());
            ocr_ready(image).write_to(&mut png, ImageFormat::Png)?;

            let mut engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("tesseract engine lock poisoned".to_string()))?;
            engine
                .set_image_from_mem(png.get_ref())
                .map_err(|error| OcrError::Recognition(error.to_string()))?;
            let text = engine
                .get_utf8_text()
                .map_err(|error| OcrError::Recognition(error.to_string()))?;
            Ok(non_empty(&text))
        }
    }
}

#[cfg(feature = "leptess")]
pub use leptess_backend::LeptessRecognizer;

fn try_build(config: &OcrConfig) -> Result<Box<dyn TextRecognizer>, OcrError> {
    match config.backend {
        OcrBackendKind::None => Ok(Box::new(NoOcr)),
        OcrBackendKind::Tesseract => Ok(Box::new(TesseractCli::new(&config.language)?)),
        #[cfg(feature = "leptess")]
        OcrBackendKind::Leptess => Ok(Box::new(LeptessRecognizer::new(&config.language)?)),
        #[cfg(not(feature = "leptess"))]
        OcrBackendKind::Leptess => Err(OcrError::Unavailable(
            OcrBackendKind::Leptess,
            "rebuild with `--features leptess`".to_string(),
        )),
    }
}

/// Builds the recognizer for `config`, falling back to [`NoOcr`] when the
/// backend cannot be initialised. The fallback is reported through the
/// returned error so callers can surface it.
#[must_use]
pub fn build_recognizer(config: &OcrConfig) -> (Box<dyn TextRecognizer>, Option<OcrError>) {
    match try_build(config) {
        Ok(recognizer) => {
            debug!("OCR backend: {}", recognizer.backend());
            (recognizer, None)
        }
        Err(error) => {
            warn!("{error}; skipping OCR");
            (Box::new(NoOcr), Some(error))
        }
    }
}

/// Whether `kind` can be constructed in this build on this machine.
#[must_use]
pub fn backend_available(kind: OcrBackendKind) -> bool {
    match kind {
        OcrBackendKind::None => true,
        OcrBackendKind::Tesseract => tesseract_version().is_some(),
        OcrBackendKind::Leptess => cfg!(feature = "leptess"),
    }
}

#[must_use]
pub fn available_backends() -> Vec<(OcrBackendKind, bool)> {
    OcrBackendKind::ALL
        .into_iter()
        .map(|kind| (kind, backend_available(kind)))
        .collect()
}
