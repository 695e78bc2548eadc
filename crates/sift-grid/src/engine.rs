// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;

use crate::filter::filter_rows;
use crate::pagination::{clamp_page_index, page_count, paginate, pagination_info};
use crate::sort::sort_rows;
use crate::{
    Accessor, CellValue, Column, ColumnFilter, DataType, FilterOperator, GridAction, GridEvent,
    GridFeatures, GridState, PaginationInfo, Record, ReduceContext, ReferenceError, RowRef,
    RowSelection, SortDirection, SortSpec, find_column,
};

pub type RowIdFn<T> = Arc<dyn Fn(&T, usize) -> String + Send + Sync>;

pub struct GridOptions<T> {
    pub features: GridFeatures,
    pub initial_state: GridState,
    /// Defaults to the row's position in the source rows.
    pub get_row_id: Option<RowIdFn<T>>,
}

impl<T> Default for GridOptions<T> {
    fn default() -> Self {
        Self {
            features: GridFeatures::default(),
            initial_state: GridState::default(),
            get_row_id: None,
        }
    }
}

impl<T> GridOptions<T> {
    pub fn with_row_id<F>(mut self, get_row_id: F) -> Self
    where
        F: Fn(&T, usize) -> String + Send + Sync + 'static,
    {
        self.get_row_id = Some(Arc::new(get_row_id));
        self
    }
}

/// A row as rendered on the current page.
#[derive(Debug)]
pub struct RowModel<'a, T> {
    pub id: String,
    pub index: usize,
    pub row: &'a T,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub id: String,
    pub header: String,
    pub data_type: DataType,
    pub width: u32,
    pub sort_direction: Option<SortDirection>,
    /// Position in the multi-column sort, 0 being the primary key.
    pub sort_index: Option<usize>,
    pub filter: Option<ColumnFilter>,
    pub can_sort: bool,
    pub can_filter: bool,
    pub can_resize: bool,
}

pub struct GridEngine<T> {
    rows: Vec<T>,
    row_ids: Vec<String>,
    columns: Vec<Column<T>>,
    state: GridState,
    features: GridFeatures,
    get_row_id: Option<RowIdFn<T>>,
}

impl<T: Record> GridEngine<T> {
    pub fn new(rows: Vec<T>, columns: Vec<Column<T>>) -> Self {
        Self::with_options(rows, columns, GridOptions::default())
    }

    pub fn with_options(rows: Vec<T>, columns: Vec<Column<T>>, options: GridOptions<T>) -> Self {
        let mut state = options.initial_state;
        state.pagination.page_size = state.pagination.page_size.max(1);
        state
            .row_selection
            .normalize(options.features.selection_mode());

        let mut engine = Self {
            rows,
            row_ids: Vec::new(),
            columns,
            state,
            features: options.features,
            get_row_id: options.get_row_id,
        };
        engine.refresh_row_ids();
        engine
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn get_state(&self) -> &GridState {
        &self.state
    }

    pub fn features(&self) -> GridFeatures {
        self.features
    }

    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    pub fn row_refs(&self) -> Vec<RowRef<'_, T>> {
        self.rows
            .iter()
            .zip(&self.row_ids)
            .enumerate()
            .map(|(index, (row, id))| RowRef {
                index,
                id: id.clone(),
                row,
            })
            .collect()
    }

    pub fn get_filtered_rows(&self) -> Vec<RowRef<'_, T>> {
        let rows = self.row_refs();
        if !self.features.enable_filtering {
            return rows;
        }
        filter_rows(
            rows,
            &self.columns,
            &self.state.column_filters,
            &self.state.global_filter,
        )
    }

    pub fn get_sorted_rows(&self) -> Vec<RowRef<'_, T>> {
        let rows = self.get_filtered_rows();
        if !self.features.enable_sorting {
            return rows;
        }
        sort_rows(rows, &self.state.sorting, &self.columns)
    }

    pub fn get_paginated_rows(&self) -> Vec<RowRef<'_, T>> {
        let rows = self.get_sorted_rows();
        if !self.features.enable_pagination {
            return rows;
        }
        paginate(rows, &self.state.pagination)
    }

    pub fn get_pagination_info(&self) -> PaginationInfo {
        pagination_info(self.get_sorted_rows().len(), &self.state.pagination)
    }

    pub fn dispatch(&mut self, action: GridAction) -> Result<Vec<GridEvent>, ReferenceError> {
        let visible = if needs_visible_rows(&action) {
            self.visible_row_ids()
        } else {
            Vec::new()
        };
        let context = ReduceContext {
            columns: &self.columns,
            row_ids: &self.row_ids,
            visible_row_ids: &visible,
            features: self.features,
        };
        let events = self.state.dispatch(action, &context)?;
        if !events.is_empty() {
            tracing::debug!(?events, "grid state changed");
        }
        Ok(events)
    }

    pub fn set_sorting(&mut self, sorting: Vec<SortSpec>) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetSorting(sorting)).map(drop)
    }

    pub fn toggle_sort(&mut self, column_id: &str, multi: bool) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ToggleSort {
            column_id: column_id.to_owned(),
            multi,
        })
        .map(drop)
    }

    pub fn clear_sorting(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ClearSorting).map(drop)
    }

    /// Upserts a `contains` filter; a null or empty value removes it.
    pub fn set_column_filter(
        &mut self,
        column_id: &str,
        value: impl Into<CellValue>,
    ) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetColumnFilter {
            column_id: column_id.to_owned(),
            value: value.into(),
        })
        .map(drop)
    }

    pub fn set_column_filter_with(
        &mut self,
        column_id: &str,
        operator: FilterOperator,
        value: impl Into<CellValue>,
    ) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetColumnFilterWith(ColumnFilter::new(
            column_id, operator, value,
        )))
        .map(drop)
    }

    pub fn remove_column_filter(&mut self, column_id: &str) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::RemoveColumnFilter(column_id.to_owned()))
            .map(drop)
    }

    pub fn set_column_filters(&mut self, filters: Vec<ColumnFilter>) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetColumnFilters(filters)).map(drop)
    }

    pub fn set_global_filter(&mut self, term: impl Into<String>) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetGlobalFilter(term.into()))
            .map(drop)
    }

    pub fn clear_filters(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ClearFilters).map(drop)
    }

    pub fn set_page_index(&mut self, page_index: usize) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetPageIndex(page_index)).map(drop)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetPageSize(page_size)).map(drop)
    }

    pub fn next_page(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::NextPage).map(drop)
    }

    pub fn previous_page(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::PreviousPage).map(drop)
    }

    pub fn first_page(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::FirstPage).map(drop)
    }

    pub fn last_page(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::LastPage).map(drop)
    }

    pub fn toggle_row_selection(&mut self, row_id: &str) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ToggleRowSelection(row_id.to_owned()))
            .map(drop)
    }

    pub fn set_row_selection(&mut self, selection: RowSelection) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetRowSelection(selection))
            .map(drop)
    }

    pub fn toggle_all_rows_selection(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ToggleAllRowsSelection).map(drop)
    }

    pub fn clear_selection(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ClearSelection).map(drop)
    }

    pub fn set_column_size(&mut self, column_id: &str, width: i64) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::SetColumnSize {
            column_id: column_id.to_owned(),
            width,
        })
        .map(drop)
    }

    pub fn reset_column_size(&mut self, column_id: &str) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ResetColumnSize(column_id.to_owned()))
            .map(drop)
    }

    pub fn reset_all_column_sizes(&mut self) -> Result<(), ReferenceError> {
        self.dispatch(GridAction::ResetColumnSizes).map(drop)
    }

    pub fn get_row_by_id(&self, row_id: &str) -> Option<&T> {
        self.position_of(row_id).map(|index| &self.rows[index])
    }

    /// Indexes into the filtered and sorted view, not the source rows.
    pub fn get_row_by_index(&self, index: usize) -> Option<&T> {
        self.get_sorted_rows().get(index).map(|row| row.row)
    }

    pub fn get_cell_value(&self, row_id: &str, column_id: &str) -> Option<CellValue> {
        let row = self.get_row_by_id(row_id)?;
        let column = find_column(&self.columns, column_id)?;
        Some(column.value(row))
    }

    /// Writes through the column's key accessor. Returns `Ok(false)` when the
    /// column has a computed accessor or the row type refuses the write.
    pub fn set_cell_value(
        &mut self,
        row_id: &str,
        column_id: &str,
        value: impl Into<CellValue>,
    ) -> Result<bool, ReferenceError> {
        let Some(index) = self.position_of(row_id) else {
            return self.missing(ReferenceError::UnknownRow(row_id.to_owned()));
        };
        let Some(column) = find_column(&self.columns, column_id) else {
            return self.missing(ReferenceError::UnknownColumn(column_id.to_owned()));
        };
        let Some(Accessor::Key(key)) = &column.accessor else {
            return Ok(false);
        };
        let key = key.clone();
        let written = self.rows[index].set_field(&key, value.into());
        if written {
            self.rows_changed();
        }
        Ok(written)
    }

    /// Replaces the row whose id matches `row_id`.
    pub fn update_row(&mut self, row_id: &str, row: T) -> Result<(), ReferenceError> {
        let Some(index) = self.position_of(row_id) else {
            return self.missing(ReferenceError::UnknownRow(row_id.to_owned()));
        };
        self.rows[index] = row;
        self.rows_changed();
        Ok(())
    }

    /// Appends a row and returns its id.
    pub fn add_row(&mut self, row: T) -> String {
        self.rows.push(row);
        self.rows_changed();
        self.row_ids.last().cloned().unwrap_or_default()
    }

    pub fn remove_row(&mut self, row_id: &str) -> Result<Option<T>, ReferenceError> {
        let Some(index) = self.position_of(row_id) else {
            return self.missing(ReferenceError::UnknownRow(row_id.to_owned()));
        };
        // Positional ids shift after removal, so selection follows rows, not ids.
        let selected: Vec<usize> = self
            .row_ids
            .iter()
            .enumerate()
            .filter(|&(position, id)| {
                position != index && self.state.row_selection.is_selected(id)
            })
            .map(|(position, _)| if position > index { position - 1 } else { position })
            .collect();
        let removed = self.rows.remove(index);
        self.rows_changed();
        self.state.row_selection = RowSelection::from_ids(
            selected
                .into_iter()
                .filter_map(|position| self.row_ids.get(position).cloned()),
        );
        Ok(Some(removed))
    }

    /// Swaps the whole data set. Selection entries for ids that no longer
    /// exist are dropped.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.rows_changed();
        let stale: Vec<String> = self
            .state
            .row_selection
            .selected_ids()
            .filter(|id| !self.row_ids.iter().any(|row_id| row_id == id))
            .map(str::to_owned)
            .collect();
        for id in stale {
            self.state.row_selection.remove(&id);
        }
    }

    pub fn get_row_models(&self) -> Vec<RowModel<'_, T>> {
        self.get_paginated_rows()
            .into_iter()
            .map(|row| RowModel {
                selected: self.state.row_selection.is_selected(&row.id),
                id: row.id,
                index: row.index,
                row: row.row,
            })
            .collect()
    }

    pub fn get_column_models(&self) -> Vec<ColumnModel> {
        self.columns
            .iter()
            .map(|column| {
                let sort_index = self
                    .state
                    .sorting
                    .iter()
                    .position(|spec| spec.column_id == column.id);
                ColumnModel {
                    id: column.id.clone(),
                    header: column.header.clone(),
                    data_type: column.data_type,
                    width: self.column_width(column),
                    sort_direction: sort_index.map(|index| self.state.sorting[index].direction),
                    sort_index,
                    filter: self
                        .state
                        .column_filters
                        .iter()
                        .find(|filter| filter.column_id == column.id)
                        .cloned(),
                    can_sort: self.features.enable_sorting && column.can_sort(),
                    can_filter: self.features.enable_filtering && column.can_filter(),
                    can_resize: column.can_resize(),
                }
            })
            .collect()
    }

    /// Selected rows in source order.
    pub fn get_selected_rows(&self) -> Vec<&T> {
        self.rows
            .iter()
            .zip(&self.row_ids)
            .filter(|(_, id)| self.state.row_selection.is_selected(id))
            .map(|(row, _)| row)
            .collect()
    }

    pub fn get_selected_count(&self) -> usize {
        self.get_selected_rows().len()
    }

    pub fn get_is_all_rows_selected(&self) -> bool {
        self.state
            .row_selection
            .is_all_selected(&self.visible_row_ids())
    }

    pub fn get_is_some_rows_selected(&self) -> bool {
        self.state
            .row_selection
            .is_some_selected(&self.visible_row_ids())
    }

    pub fn get_column_size(&self, column_id: &str) -> Option<u32> {
        find_column(&self.columns, column_id).map(|column| self.column_width(column))
    }

    fn column_width(&self, column: &Column<T>) -> u32 {
        self.state
            .column_sizing
            .get(&column.id)
            .unwrap_or_else(|| column.default_width())
    }

    fn visible_row_ids(&self) -> Vec<String> {
        self.get_sorted_rows()
            .into_iter()
            .map(|row| row.id)
            .collect()
    }

    fn position_of(&self, row_id: &str) -> Option<usize> {
        self.row_ids.iter().position(|id| id == row_id)
    }

    fn refresh_row_ids(&mut self) {
        self.row_ids = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| match &self.get_row_id {
                Some(get_row_id) => get_row_id(row, index),
                None => index.to_string(),
            })
            .collect();
    }

    fn rows_changed(&mut self) {
        self.refresh_row_ids();
        let pages = page_count(
            self.get_sorted_rows().len(),
            self.state.pagination.page_size,
        );
        self.state.pagination.page_index =
            clamp_page_index(self.state.pagination.page_index, pages);
        tracing::debug!(rows = self.rows.len(), "grid rows changed");
    }

    fn missing<R: Default>(&self, error: ReferenceError) -> Result<R, ReferenceError> {
        if self.features.strict_references {
            return Err(error);
        }
        tracing::debug!(%error, "ignoring unknown reference");
        Ok(R::default())
    }
}

fn needs_visible_rows(action: &GridAction) -> bool {
    matches!(
        action,
        GridAction::SetPageIndex(_)
            | GridAction::NextPage
            | GridAction::PreviousPage
            | GridAction::FirstPage
            | GridAction::LastPage
            | GridAction::ToggleAllRowsSelection
    )
}
