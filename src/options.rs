use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::ExtractError;

/// What to do with a detected table whose layout confidence is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    BestEffort,
    Strict,
    SkipAmbiguous,
}

impl QualityMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BestEffort => "best-effort",
            Self::Strict => "strict",
            Self::SkipAmbiguous => "skip-ambiguous",
        }
    }
}

impl Display for QualityMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            "skip-ambiguous" | "skip_ambiguous" => Ok(Self::SkipAmbiguous),
            other => Err(format!("unknown quality mode '{other}'")),
        }
    }
}

/// 1-based pages to process, written as `1-3,5` or `4-` (page 4 to the end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<RangeInclusive<u32>>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(&page))
    }
}

fn parse_page_number(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("pages are 1-based".to_string()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("invalid page number: '{}'", raw.trim())),
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let ranges = spec
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.split_once('-') {
                Some((first, "")) => Ok(parse_page_number(first)?..=u32::MAX),
                Some((first, last)) => {
                    let (first, last) = (parse_page_number(first)?, parse_page_number(last)?);
                    if last < first {
                        return Err(format!("invalid range '{token}': end is smaller than start"));
                    }
                    Ok(first..=last)
                }
                None => parse_page_number(token).map(|page| page..=page),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ranges.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }
        Ok(Self { ranges })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub quality_mode: QualityMode,
    /// Minimum cells a text line needs to count as a table row.
    pub min_cols: usize,
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min_cols < 2 {
            return Err(ExtractError::InvalidOption(format!(
                "min_cols must be at least 2, got {}",
                self.min_cols
            )));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            quality_mode: QualityMode::BestEffort,
            min_cols: 2,
        }
    }
}
