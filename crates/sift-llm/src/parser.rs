// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sift_grid::{CellValue, ColumnFilter, FilterOperator, SortDirection, SortSpec};
use thiserror::Error;

use crate::schema::{ColumnSchema, find_schema};

/// What a natural-language query resolved to. Failures carry `error`, a zero
/// confidence, and the raw reply when there was one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiQueryResult {
    pub filters: Vec<ColumnFilter>,
    pub sorting: Vec<SortSpec>,
    pub query: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AiQueryResult {
    pub fn failure(query: &str, error: impl Into<String>, raw_response: Option<String>) -> Self {
        Self {
            filters: Vec::new(),
            sorting: Vec::new(),
            query: query.to_owned(),
            confidence: 0.0,
            error: Some(error.into()),
            raw_response,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.is_success() && self.confidence >= threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("No JSON found in response")]
    NoJson,

    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),

    #[error("Invalid response format: {path}: {reason}")]
    InvalidFormat { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFilter {
    pub id: String,
    pub operator: FilterOperator,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSort {
    pub id: String,
    pub desc: bool,
}

/// A reply that passed validation, still in the model's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub filters: Vec<ParsedFilter>,
    pub sorting: Vec<ParsedSort>,
    pub confidence: f64,
}

impl ParsedResponse {
    /// Maps onto grid filters and sorts, dropping entries whose column is not
    /// in `schema`.
    pub fn into_result(self, schema: &[ColumnSchema], query: &str) -> AiQueryResult {
        let filters = self
            .filters
            .into_iter()
            .filter(|filter| known_column(schema, &filter.id, "filter"))
            .map(|filter| ColumnFilter::new(filter.id, filter.operator, filter.value))
            .collect();
        let sorting = self
            .sorting
            .into_iter()
            .filter(|sort| known_column(schema, &sort.id, "sort"))
            .map(|sort| SortSpec::new(sort.id, SortDirection::from_descending(sort.desc)))
            .collect();

        AiQueryResult {
            filters,
            sorting,
            query: query.to_owned(),
            confidence: self.confidence,
            error: None,
            raw_response: None,
        }
    }
}

fn known_column(schema: &[ColumnSchema], column_id: &str, what: &str) -> bool {
    let known = find_schema(schema, column_id).is_some();
    if !known {
        tracing::debug!(column_id, what, "dropping entry for column outside the schema");
    }
    known
}

/// Never fails: problems become a zero-confidence result carrying the raw text.
pub fn parse_response(raw: &str, schema: &[ColumnSchema], query: &str) -> AiQueryResult {
    match parse_structured(raw) {
        Ok(parsed) => parsed.into_result(schema, query),
        Err(error) => {
            tracing::debug!(%error, "rejecting model response");
            AiQueryResult::failure(query, error.to_string(), Some(raw.to_owned()))
        }
    }
}

/// Tries the whole reply as JSON first, then the first `{...}` span inside it.
pub fn parse_structured(raw: &str) -> Result<ParsedResponse, ResponseError> {
    let value = match serde_json::from_str::<JsonValue>(raw.trim()) {
        Ok(value @ JsonValue::Object(_)) => value,
        _ => {
            let span = extract_json_object(raw).ok_or(ResponseError::NoJson)?;
            serde_json::from_str(span)
                .map_err(|error| ResponseError::InvalidJson(error.to_string()))?
        }
    };
    validate(&value)
}

/// Returns the first balanced `{...}` span, skipping braces inside strings.
/// Unbalanced input falls back to the first `{` through the last `}`.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn validate(value: &JsonValue) -> Result<ParsedResponse, ResponseError> {
    let Some(root) = value.as_object() else {
        return Err(invalid("(root)", "expected an object"));
    };

    let mut filters = Vec::new();
    for (index, item) in required_array(root, "filters")?.iter().enumerate() {
        let path = format!("filters[{index}]");
        let Some(item) = item.as_object() else {
            return Err(invalid(&path, "expected an object"));
        };
        let id = required_id(item, &path)?;
        let operator_name = required_str(item, "operator", &path)?;
        let operator = FilterOperator::parse(operator_name).ok_or_else(|| {
            invalid(
                format!("{path}.operator"),
                format!("unknown operator {operator_name:?}"),
            )
        })?;
        let value = item
            .get("value")
            .map(CellValue::from_json)
            .unwrap_or_default();
        filters.push(ParsedFilter {
            id,
            operator,
            value,
        });
    }

    let mut sorting = Vec::new();
    for (index, item) in required_array(root, "sorting")?.iter().enumerate() {
        let path = format!("sorting[{index}]");
        let Some(item) = item.as_object() else {
            return Err(invalid(&path, "expected an object"));
        };
        let id = required_id(item, &path)?;
        let desc = match item.get("desc") {
            Some(JsonValue::Bool(desc)) => *desc,
            Some(_) => return Err(invalid(format!("{path}.desc"), "expected a boolean")),
            None => return Err(invalid(format!("{path}.desc"), "required")),
        };
        sorting.push(ParsedSort { id, desc });
    }

    let confidence = match root.get("confidence") {
        Some(JsonValue::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(_) => return Err(invalid("confidence", "expected a number")),
        None => return Err(invalid("confidence", "required")),
    };
    if !(0.0..=1.0).contains(&confidence) {
        return Err(invalid("confidence", "must be between 0 and 1"));
    }

    Ok(ParsedResponse {
        filters,
        sorting,
        confidence,
    })
}

fn required_array<'a>(
    root: &'a Map<String, JsonValue>,
    key: &str,
) -> Result<&'a Vec<JsonValue>, ResponseError> {
    match root.get(key) {
        Some(JsonValue::Array(items)) => Ok(items),
        Some(_) => Err(invalid(key, "expected an array")),
        None => Err(invalid(key, "required")),
    }
}

fn required_str<'a>(
    item: &'a Map<String, JsonValue>,
    key: &str,
    path: &str,
) -> Result<&'a str, ResponseError> {
    match item.get(key) {
        Some(JsonValue::String(value)) => Ok(value),
        Some(_) => Err(invalid(format!("{path}.{key}"), "expected a string")),
        None => Err(invalid(format!("{path}.{key}"), "required")),
    }
}

fn required_id(item: &Map<String, JsonValue>, path: &str) -> Result<String, ResponseError> {
    let id = required_str(item, "id", path)?.trim();
    if id.is_empty() {
        return Err(invalid(format!("{path}.id"), "must not be empty"));
    }
    Ok(id.to_owned())
}

fn invalid(path: impl Into<String>, reason: impl Into<String>) -> ResponseError {
    ResponseError::InvalidFormat {
        path: path.into(),
        reason: reason.into(),
    }
}
