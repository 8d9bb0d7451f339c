use std::fmt::{Display, Formatter};

/// Non-fatal conditions collected while extracting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    LowConfidence,
    NoTablesDetected,
    ImageExtractionFailed,
    OcrFailed,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::NoTablesDetected => "no_tables_detected",
            Self::ImageExtractionFailed => "image_extraction_failed",
            Self::OcrFailed => "ocr_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    /// 1-based position of the table among those detected on the page.
    pub table_index: Option<usize>,
    /// 1-based position of the image on the page.
    pub image_index: Option<usize>,
    pub confidence: Option<f32>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            table_index: None,
            image_index: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn for_table(mut self, index: usize, confidence: f32) -> Self {
        self.table_index = Some(index);
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn for_image(mut self, index: usize) -> Self {
        self.image_index = Some(index);
        self
    }
}

impl Display for ExtractWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code.as_str())?;
        if let Some(page) = self.page {
            write!(f, " page {page}")?;
        }
        if let Some(table) = self.table_index {
            write!(f, " table {table}")?;
        }
        if let Some(image) = self.image_index {
            write!(f, " image {image}")?;
        }
        if let Some(confidence) = self.confidence {
            write!(f, " (confidence {confidence:.2})")?;
        }
        write!(f, ": {}", self.message)
    }
}
