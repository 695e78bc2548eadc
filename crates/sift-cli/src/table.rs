// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use sift_grid::{Column, DataType, GridEngine, Record};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
struct ColumnSpec {
    id: String,
    header: Option<String>,
    #[serde(rename = "type", default)]
    data_type: DataType,
    accessor_key: Option<String>,
    width: Option<u32>,
    min_width: Option<u32>,
    max_width: Option<u32>,
    sortable: Option<bool>,
    filterable: Option<bool>,
    resizable: Option<bool>,
}

impl ColumnSpec {
    fn into_column(self) -> Column<Value> {
        let header = self.header.unwrap_or_else(|| self.id.clone());
        let key = self.accessor_key.unwrap_or_else(|| self.id.clone());
        let mut column = Column::new(self.id, header, self.data_type)
            .with_accessor_key(key)
            .with_width_bounds(self.min_width, self.max_width)
            .sortable(self.sortable.unwrap_or(true))
            .filterable(self.filterable.unwrap_or(true))
            .resizable(self.resizable.unwrap_or(true));
        if let Some(width) = self.width {
            column = column.with_width(width);
        }
        column
    }
}

#[derive(Debug, Deserialize)]
struct TableFile {
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    rows: Vec<Value>,
}

#[derive(Debug)]
pub struct Table {
    pub columns: Vec<Column<Value>>,
    pub rows: Vec<Value>,
}

pub fn load_table(path: &Path) -> Result<Table> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read table {}", path.display()))?;
    parse_table(&raw).with_context(|| format!("load table {}", path.display()))
}

pub fn parse_table(raw: &str) -> Result<Table> {
    let file: TableFile = serde_json::from_str(raw)
        .context("decode table JSON; expected {\"columns\": [...], \"rows\": [...]}")?;
    if file.columns.is_empty() {
        bail!("table declares no columns; add at least one {{\"id\": ..., \"type\": ...}} entry");
    }

    let mut seen = BTreeSet::new();
    for spec in &file.columns {
        if spec.id.trim().is_empty() {
            bail!("column ids must not be empty");
        }
        if !seen.insert(spec.id.as_str()) {
            bail!("duplicate column id {:?}", spec.id);
        }
    }
    if let Some(index) = file.rows.iter().position(|row| !row.is_object()) {
        bail!("rows[{index}] is not a JSON object");
    }

    tracing::debug!(
        columns = file.columns.len(),
        rows = file.rows.len(),
        "loaded table"
    );
    Ok(Table {
        columns: file.columns.into_iter().map(ColumnSpec::into_column).collect(),
        rows: file.rows,
    })
}

/// Uses a string or integer `id` field when the row has one.
pub fn row_id(row: &Value, index: usize) -> String {
    match row.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => index.to_string(),
    }
}

/// The current page as a `col | col` table with a one-line footer.
pub fn render_text<T: Record>(engine: &GridEngine<T>) -> String {
    let columns = engine.columns();
    let page = engine.get_paginated_rows();

    let headers: Vec<String> = columns.iter().map(|column| column.header.clone()).collect();
    let cells: Vec<Vec<String>> = page
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| column.value(row.row).display())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format_line(&headers, &widths));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row, &widths));
        out.push('\n');
    }

    let info = engine.get_pagination_info();
    if info.total_rows == 0 {
        out.push_str("no matching rows\n");
    } else {
        out.push_str(&format!(
            "page {} of {} ({} rows)\n",
            info.page_index + 1,
            info.page_count,
            info.total_rows
        ));
    }
    out
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    padded.join(" | ").trim_end().to_owned()
}

/// The current page plus pagination info and the active state.
pub fn render_json(engine: &GridEngine<Value>) -> Value {
    let rows: Vec<Value> = engine
        .get_paginated_rows()
        .iter()
        .map(|row| row.row.clone())
        .collect();
    json!({
        "pagination": engine.get_pagination_info(),
        "state": engine.get_state(),
        "rows": rows,
    })
}
