// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use sift_grid::{Column, DataType, Record};

pub const MAX_EXAMPLES: usize = 3;

/// The compact view of a column the model sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnSchema {
    pub fn from_column<T>(column: &Column<T>) -> Self {
        Self {
            id: column.id.clone(),
            name: column.header.clone(),
            data_type: column.data_type,
            examples: Vec::new(),
            description: Some(column.header.clone()),
        }
    }
}

pub fn column_schema<T>(columns: &[Column<T>]) -> Vec<ColumnSchema> {
    columns.iter().map(ColumnSchema::from_column).collect()
}

/// Like [`column_schema`], with up to `limit` distinct non-empty sample values
/// per column taken from `rows` in order.
pub fn schema_with_examples<T: Record>(
    columns: &[Column<T>],
    rows: &[T],
    limit: usize,
) -> Vec<ColumnSchema> {
    columns
        .iter()
        .map(|column| {
            let mut schema = ColumnSchema::from_column(column);
            for row in rows {
                if schema.examples.len() >= limit {
                    break;
                }
                let value = column.value(row);
                if value.is_empty() {
                    continue;
                }
                let rendered = value.display();
                if !schema.examples.contains(&rendered) {
                    schema.examples.push(rendered);
                }
            }
            schema
        })
        .collect()
}

pub fn find_schema<'a>(schema: &'a [ColumnSchema], column_id: &str) -> Option<&'a ColumnSchema> {
    schema.iter().find(|column| column.id == column_id)
}
