use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::ExtractError;
use crate::model::PageContent;
use crate::validate::validate_output;

/// Serializes pages and checks the result against the output schema.
pub fn validated_pages_json(pages: &[PageContent]) -> Result<Value, ExtractError> {
    let value = serde_json::to_value(pages)?;
    validate_output(&value)?;
    Ok(value)
}

pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, ExtractError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExtractError> {
    let json = to_json_string(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Loads a previously written extraction result, validating it first.
pub fn read_pages(path: &Path) -> Result<Vec<PageContent>, ExtractError> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    validate_output(&value)?;
    Ok(serde_json::from_value(value)?)
}
