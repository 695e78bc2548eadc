// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::pagination::{clamp_page_index, page_count};
use crate::{
    CellValue, Column, ColumnFilter, ColumnSizing, FilterOperator, PaginationState,
    ReferenceError, RowSelection, SelectionMode, SortDirection, SortSpec, find_column,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridFeatures {
    pub enable_sorting: bool,
    pub enable_filtering: bool,
    pub enable_pagination: bool,
    pub enable_row_selection: bool,
    pub enable_multi_row_selection: bool,
    pub strict_references: bool,
}

impl Default for GridFeatures {
    fn default() -> Self {
        Self {
            enable_sorting: true,
            enable_filtering: true,
            enable_pagination: true,
            enable_row_selection: true,
            enable_multi_row_selection: true,
            strict_references: false,
        }
    }
}

impl GridFeatures {
    pub const fn selection_mode(self) -> SelectionMode {
        if self.enable_multi_row_selection {
            SelectionMode::Multi
        } else {
            SelectionMode::Single
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridState {
    pub sorting: Vec<SortSpec>,
    pub column_filters: Vec<ColumnFilter>,
    pub global_filter: String,
    pub pagination: PaginationState,
    pub row_selection: RowSelection,
    pub column_sizing: ColumnSizing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridAction {
    SetSorting(Vec<SortSpec>),
    ToggleSort { column_id: String, multi: bool },
    ClearSorting,
    SetColumnFilter { column_id: String, value: CellValue },
    SetColumnFilterWith(ColumnFilter),
    RemoveColumnFilter(String),
    SetColumnFilters(Vec<ColumnFilter>),
    SetGlobalFilter(String),
    ClearFilters,
    SetPageIndex(usize),
    SetPageSize(usize),
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    ToggleRowSelection(String),
    SetRowSelection(RowSelection),
    ToggleAllRowsSelection,
    ClearSelection,
    SetColumnSize { column_id: String, width: i64 },
    ResetColumnSize(String),
    ResetColumnSizes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    SortingChanged(Vec<SortSpec>),
    ColumnFiltersChanged(Vec<ColumnFilter>),
    GlobalFilterChanged(String),
    PaginationChanged(PaginationState),
    RowSelectionChanged(RowSelection),
    ColumnSizeChanged { column_id: String, width: u32 },
    ColumnSizingReset,
    RowsChanged,
}

/// What a reducer needs to know about the grid besides its own state: the
/// column set, every row id, and the ids of the filtered+sorted view.
pub struct ReduceContext<'a, T> {
    pub columns: &'a [Column<T>],
    pub row_ids: &'a [String],
    pub visible_row_ids: &'a [String],
    pub features: GridFeatures,
}

pub type DispatchResult = Result<Vec<GridEvent>, ReferenceError>;

/// Applies `action` to a copy of `state`, leaving the original untouched.
pub fn reduce<T>(
    state: &GridState,
    action: GridAction,
    context: &ReduceContext<'_, T>,
) -> Result<(GridState, Vec<GridEvent>), ReferenceError> {
    let mut next = state.clone();
    let events = next.dispatch(action, context)?;
    Ok((next, events))
}

impl GridState {
    pub fn dispatch<T>(
        &mut self,
        action: GridAction,
        context: &ReduceContext<'_, T>,
    ) -> DispatchResult {
        match action {
            GridAction::SetSorting(sorting) => self.set_sorting(sorting, context),
            GridAction::ToggleSort { column_id, multi } => {
                self.toggle_sort(column_id, multi, context)
            }
            GridAction::ClearSorting => {
                self.sorting.clear();
                Ok(vec![GridEvent::SortingChanged(Vec::new())])
            }
            GridAction::SetColumnFilter { column_id, value } => {
                if find_column(context.columns, &column_id).is_none() {
                    return unknown_column(column_id, context);
                }
                if is_blank(&value) {
                    self.column_filters.retain(|filter| filter.column_id != column_id);
                } else {
                    self.upsert_filter(ColumnFilter {
                        column_id,
                        operator: FilterOperator::Contains,
                        value,
                    });
                }
                Ok(self.filters_changed())
            }
            GridAction::SetColumnFilterWith(filter) => {
                if find_column(context.columns, &filter.column_id).is_none() {
                    return unknown_column(filter.column_id, context);
                }
                self.upsert_filter(filter);
                Ok(self.filters_changed())
            }
            GridAction::RemoveColumnFilter(column_id) => {
                if find_column(context.columns, &column_id).is_none() {
                    return unknown_column(column_id, context);
                }
                self.column_filters.retain(|filter| filter.column_id != column_id);
                Ok(self.filters_changed())
            }
            GridAction::SetColumnFilters(filters) => {
                self.column_filters.clear();
                for filter in filters {
                    if find_column(context.columns, &filter.column_id).is_none() {
                        if context.features.strict_references {
                            return Err(ReferenceError::UnknownColumn(filter.column_id));
                        }
                        tracing::debug!(
                            column_id = %filter.column_id,
                            "dropping filter on unknown column"
                        );
                        continue;
                    }
                    self.upsert_filter(filter);
                }
                Ok(self.filters_changed())
            }
            GridAction::SetGlobalFilter(term) => {
                self.global_filter = term;
                let mut events = vec![GridEvent::GlobalFilterChanged(self.global_filter.clone())];
                events.extend(self.reset_page());
                Ok(events)
            }
            GridAction::ClearFilters => {
                self.column_filters.clear();
                self.global_filter.clear();
                let mut events = vec![
                    GridEvent::ColumnFiltersChanged(Vec::new()),
                    GridEvent::GlobalFilterChanged(String::new()),
                ];
                events.extend(self.reset_page());
                Ok(events)
            }
            GridAction::SetPageIndex(page_index) => Ok(self.go_to_page(page_index, context)),
            GridAction::SetPageSize(page_size) => {
                self.pagination = PaginationState {
                    page_index: 0,
                    page_size: page_size.max(1),
                };
                Ok(vec![GridEvent::PaginationChanged(self.pagination)])
            }
            GridAction::NextPage => {
                let next = self.pagination.page_index.saturating_add(1);
                Ok(self.go_to_page(next, context))
            }
            GridAction::PreviousPage => {
                let previous = self.pagination.page_index.saturating_sub(1);
                Ok(self.go_to_page(previous, context))
            }
            GridAction::FirstPage => Ok(self.go_to_page(0, context)),
            GridAction::LastPage => Ok(self.go_to_page(usize::MAX, context)),
            GridAction::ToggleRowSelection(row_id) => {
                if !context.row_ids.contains(&row_id) {
                    return unknown_row(row_id, context);
                }
                if !context.features.enable_row_selection {
                    return Ok(Vec::new());
                }
                self.row_selection
                    .toggle(&row_id, context.features.selection_mode());
                Ok(vec![self.selection_changed()])
            }
            GridAction::SetRowSelection(mut selection) => {
                if !context.features.enable_row_selection {
                    return Ok(Vec::new());
                }
                selection.normalize(context.features.selection_mode());
                self.row_selection = selection;
                Ok(vec![self.selection_changed()])
            }
            GridAction::ToggleAllRowsSelection => {
                if !context.features.enable_row_selection
                    || context.features.selection_mode() == SelectionMode::Single
                {
                    return Ok(Vec::new());
                }
                self.row_selection.toggle_all(context.visible_row_ids);
                Ok(vec![self.selection_changed()])
            }
            GridAction::ClearSelection => {
                self.row_selection.clear();
                Ok(vec![self.selection_changed()])
            }
            GridAction::SetColumnSize { column_id, width } => {
                let Some(column) = find_column(context.columns, &column_id) else {
                    return unknown_column(column_id, context);
                };
                if !column.can_resize() {
                    return Ok(Vec::new());
                }
                let stored =
                    self.column_sizing
                        .set(&column_id, width, column.min_width(), column.max_width());
                Ok(vec![GridEvent::ColumnSizeChanged {
                    column_id,
                    width: stored,
                }])
            }
            GridAction::ResetColumnSize(column_id) => {
                let Some(column) = find_column(context.columns, &column_id) else {
                    return unknown_column(column_id, context);
                };
                let width = column.default_width();
                self.column_sizing.reset(&column_id);
                Ok(vec![GridEvent::ColumnSizeChanged { column_id, width }])
            }
            GridAction::ResetColumnSizes => {
                self.column_sizing.clear();
                Ok(vec![GridEvent::ColumnSizingReset])
            }
        }
    }

    fn set_sorting<T>(
        &mut self,
        sorting: Vec<SortSpec>,
        context: &ReduceContext<'_, T>,
    ) -> DispatchResult {
        let mut next: Vec<SortSpec> = Vec::with_capacity(sorting.len());
        for spec in sorting {
            if find_column(context.columns, &spec.column_id).is_none() {
                if context.features.strict_references {
                    return Err(ReferenceError::UnknownColumn(spec.column_id));
                }
                tracing::debug!(column_id = %spec.column_id, "dropping sort on unknown column");
                continue;
            }
            if next.iter().any(|existing| existing.column_id == spec.column_id) {
                continue;
            }
            next.push(spec);
        }
        self.sorting = next;
        Ok(vec![GridEvent::SortingChanged(self.sorting.clone())])
    }

    /// Cycles unsorted -> asc -> desc -> unsorted. Without `multi` the result
    /// replaces the whole sort.
    fn toggle_sort<T>(
        &mut self,
        column_id: String,
        multi: bool,
        context: &ReduceContext<'_, T>,
    ) -> DispatchResult {
        let Some(column) = find_column(context.columns, &column_id) else {
            return unknown_column(column_id, context);
        };
        if !context.features.enable_sorting || !column.can_sort() {
            return Ok(Vec::new());
        }

        let position = self
            .sorting
            .iter()
            .position(|spec| spec.column_id == column_id);
        let next = match position.map(|index| self.sorting[index].direction) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };

        if multi {
            match (position, next) {
                (Some(index), Some(direction)) => self.sorting[index].direction = direction,
                (Some(index), None) => {
                    self.sorting.remove(index);
                }
                (None, Some(direction)) => self.sorting.push(SortSpec::new(column_id, direction)),
                (None, None) => {}
            }
        } else {
            self.sorting = next
                .map(|direction| vec![SortSpec::new(column_id, direction)])
                .unwrap_or_default();
        }

        Ok(vec![GridEvent::SortingChanged(self.sorting.clone())])
    }

    fn upsert_filter(&mut self, filter: ColumnFilter) {
        match self
            .column_filters
            .iter_mut()
            .find(|existing| existing.column_id == filter.column_id)
        {
            Some(existing) => *existing = filter,
            None => self.column_filters.push(filter),
        }
    }

    fn filters_changed(&mut self) -> Vec<GridEvent> {
        let mut events = vec![GridEvent::ColumnFiltersChanged(self.column_filters.clone())];
        events.extend(self.reset_page());
        events
    }

    fn reset_page(&mut self) -> Option<GridEvent> {
        if self.pagination.page_index == 0 {
            return None;
        }
        self.pagination.page_index = 0;
        Some(GridEvent::PaginationChanged(self.pagination))
    }

    fn go_to_page<T>(
        &mut self,
        page_index: usize,
        context: &ReduceContext<'_, T>,
    ) -> Vec<GridEvent> {
        let pages = page_count(context.visible_row_ids.len(), self.pagination.page_size);
        self.pagination.page_index = clamp_page_index(page_index, pages);
        vec![GridEvent::PaginationChanged(self.pagination)]
    }

    fn selection_changed(&self) -> GridEvent {
        GridEvent::RowSelectionChanged(self.row_selection.clone())
    }
}

fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::Text(text) => text.is_empty(),
        _ => false,
    }
}

fn unknown_column<T>(column_id: String, context: &ReduceContext<'_, T>) -> DispatchResult {
    ignore(ReferenceError::UnknownColumn(column_id), context.features)
}

fn unknown_row<T>(row_id: String, context: &ReduceContext<'_, T>) -> DispatchResult {
    ignore(ReferenceError::UnknownRow(row_id), context.features)
}

fn ignore(error: ReferenceError, features: GridFeatures) -> DispatchResult {
    if features.strict_references {
        return Err(error);
    }
    tracing::debug!(%error, "ignoring action with unknown reference");
    Ok(Vec::new())
}
