use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ExtractError;

const PAGE_FIELDS: [&str; 4] = ["page_number", "text", "tables", "images"];

static TABLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^table_p\d+_t\d+$").expect("hardcoded table id regex is valid"));
static IMAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image_p\d+_i\d+$").expect("hardcoded image id regex is valid"));

fn invalid(context: &str, message: &str) -> ExtractError {
    ExtractError::Validation(format!("{context}: {message}"))
}

fn is_string(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_string)
}

fn matches_id(value: Option<&Value>, pattern: &Regex) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|id| pattern.is_match(id))
}

fn is_array(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_array)
}

fn validate_table(table: &Value, context: &str) -> Result<(), ExtractError> {
    if !matches_id(table.get("table_id"), &TABLE_ID_RE) {
        return Err(invalid(context, "invalid table_id"));
    }
    let Some(structure) = table.get("structure") else {
        return Err(invalid(context, "missing structure"));
    };
    if !is_array(structure.get("rows")) {
        return Err(invalid(context, "invalid rows"));
    }
    if !is_array(structure.get("merged_cells")) {
        return Err(invalid(context, "invalid merged_cells"));
    }
    Ok(())
}

fn validate_image(image: &Value, context: &str) -> Result<(), ExtractError> {
    if !matches_id(image.get("image_id"), &IMAGE_ID_RE) {
        return Err(invalid(context, "invalid image_id"));
    }
    if !is_string(image.get("description")) {
        return Err(invalid(context, "invalid description"));
    }
    match image.get("ocr_text") {
        None => Err(invalid(context, "missing ocr_text")),
        Some(Value::Null | Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(context, "ocr_text must be string or null")),
    }
}

fn validate_page(page: &Value, page_number: usize) -> Result<(), ExtractError> {
    let context = format!("Page {page_number}");
    let Some(fields) = page.as_object() else {
        return Err(invalid(&context, "page must be an object"));
    };

    let keys = fields.keys().map(String::as_str).collect::<Vec<_>>();
    if keys != PAGE_FIELDS {
        return Err(invalid(
            &context,
            &format!("Field order mismatch. Expected {PAGE_FIELDS:?}, got {keys:?}"),
        ));
    }

    if !fields["page_number"].is_u64() {
        return Err(invalid(&context, "page_number must be an integer"));
    }
    if !matches!(fields["text"], Value::Null | Value::String(_)) {
        return Err(invalid(&context, "text must be string or null"));
    }

    let Some(tables) = fields["tables"].as_array() else {
        return Err(invalid(&context, "tables must be an array"));
    };
    for (index, table) in tables.iter().enumerate() {
        validate_table(table, &format!("{context}, Table {}", index + 1))?;
    }

    let Some(images) = fields["images"].as_array() else {
        return Err(invalid(&context, "images must be an array"));
    };
    for (index, image) in images.iter().enumerate() {
        validate_image(image, &format!("{context}, Image {}", index + 1))?;
    }

    Ok(())
}

/// Checks serialized extraction output against the page schema, including field order.
pub fn validate_output(pages: &Value) -> Result<(), ExtractError> {
    let Some(pages) = pages.as_array() else {
        return Err(ExtractError::Validation(
            "output must be an array of pages".to_string(),
        ));
    };

    for (index, page) in pages.iter().enumerate() {
        validate_page(page, index + 1)?;
    }
    Ok(())
}
