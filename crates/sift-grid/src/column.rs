// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use std::sync::Arc;

use crate::{CellValue, DataType, Record};

pub const DEFAULT_COLUMN_WIDTH: u32 = 150;
pub const DEFAULT_MIN_COLUMN_WIDTH: u32 = 50;
pub const DEFAULT_MAX_COLUMN_WIDTH: u32 = 500;

pub type AccessorFn<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;

/// How a column reads its value out of a row.
pub enum Accessor<T> {
    Key(String),
    Fn(AccessorFn<T>),
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Key(key) => Self::Key(key.clone()),
            Self::Fn(accessor) => Self::Fn(Arc::clone(accessor)),
        }
    }
}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

pub struct Column<T> {
    pub id: String,
    pub header: String,
    pub accessor: Option<Accessor<T>>,
    pub data_type: DataType,
    pub enable_sorting: Option<bool>,
    pub enable_filtering: Option<bool>,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub enable_resizing: Option<bool>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            header: self.header.clone(),
            accessor: self.accessor.clone(),
            data_type: self.data_type,
            enable_sorting: self.enable_sorting,
            enable_filtering: self.enable_filtering,
            width: self.width,
            min_width: self.min_width,
            max_width: self.max_width,
            enable_resizing: self.enable_resizing,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("accessor", &self.accessor)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

impl<T> Column<T> {
    /// A column without an accessor; every value resolves to `Null`.
    pub fn new(id: impl Into<String>, header: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            header: header.into(),
            accessor: None,
            data_type,
            enable_sorting: None,
            enable_filtering: None,
            width: None,
            min_width: None,
            max_width: None,
            enable_resizing: None,
        }
    }

    /// A column whose accessor key is its id.
    pub fn keyed(id: impl Into<String>, header: impl Into<String>, data_type: DataType) -> Self {
        let id = id.into();
        let key = id.clone();
        Self::new(id, header, data_type).with_accessor_key(key)
    }

    pub fn with_accessor_key(mut self, key: impl Into<String>) -> Self {
        self.accessor = Some(Accessor::Key(key.into()));
        self
    }

    pub fn with_accessor_fn<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        self.accessor = Some(Accessor::Fn(Arc::new(accessor)));
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_width_bounds(mut self, min_width: Option<u32>, max_width: Option<u32>) -> Self {
        self.min_width = min_width;
        self.max_width = max_width;
        self
    }

    pub fn sortable(mut self, enabled: bool) -> Self {
        self.enable_sorting = Some(enabled);
        self
    }

    pub fn filterable(mut self, enabled: bool) -> Self {
        self.enable_filtering = Some(enabled);
        self
    }

    pub fn resizable(mut self, enabled: bool) -> Self {
        self.enable_resizing = Some(enabled);
        self
    }

    pub fn can_sort(&self) -> bool {
        self.enable_sorting.unwrap_or(true)
    }

    pub fn can_filter(&self) -> bool {
        self.enable_filtering.unwrap_or(true)
    }

    pub fn can_resize(&self) -> bool {
        self.enable_resizing.unwrap_or(true)
    }

    pub fn min_width(&self) -> u32 {
        self.min_width.unwrap_or(DEFAULT_MIN_COLUMN_WIDTH)
    }

    pub fn max_width(&self) -> u32 {
        self.max_width.unwrap_or(DEFAULT_MAX_COLUMN_WIDTH)
    }

    pub fn default_width(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    pub fn accessor_key(&self) -> Option<&str> {
        match &self.accessor {
            Some(Accessor::Key(key)) => Some(key),
            _ => None,
        }
    }
}

impl<T: Record> Column<T> {
    pub fn value(&self, row: &T) -> CellValue {
        match &self.accessor {
            Some(Accessor::Key(key)) => row.field(key),
            Some(Accessor::Fn(accessor)) => accessor(row),
            None => CellValue::Null,
        }
    }
}

pub fn find_column<'a, T>(columns: &'a [Column<T>], column_id: &str) -> Option<&'a Column<T>> {
    columns.iter().find(|column| column.id == column_id)
}

/// A row in a derived view: its position in the source rows, its id, and a
/// borrow of the row itself.
pub struct RowRef<'a, T> {
    pub index: usize,
    pub id: String,
    pub row: &'a T,
}

impl<T> Clone for RowRef<'_, T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            id: self.id.clone(),
            row: self.row,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RowRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowRef")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("row", self.row)
            .finish()
    }
}
