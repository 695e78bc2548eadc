// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::{CellValue, Column, ColumnFilter, DataType, FilterOperator, Record, RowRef, find_column};

/// Keeps rows that match the global term on any filterable column and every
/// column filter. Filters naming unknown columns are skipped.
pub fn filter_rows<'a, T: Record>(
    rows: Vec<RowRef<'a, T>>,
    columns: &[Column<T>],
    column_filters: &[ColumnFilter],
    global_filter: &str,
) -> Vec<RowRef<'a, T>> {
    let needle = global_filter.trim().to_lowercase();
    let searchable: Vec<&Column<T>> = columns.iter().filter(|column| column.can_filter()).collect();
    let active: Vec<(&Column<T>, &ColumnFilter)> = column_filters
        .iter()
        .filter_map(|filter| find_column(columns, &filter.column_id).map(|c| (c, filter)))
        .collect();

    if needle.is_empty() && active.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            (needle.is_empty() || matches_global(row.row, &searchable, &needle))
                && active.iter().all(|(column, filter)| {
                    matches_filter(&column.value(row.row), filter, column.data_type)
                })
        })
        .collect()
}

/// `needle` must already be lowercased.
pub fn matches_global<T: Record>(row: &T, columns: &[&Column<T>], needle: &str) -> bool {
    columns
        .iter()
        .any(|column| column.value(row).display().to_lowercase().contains(needle))
}

pub fn matches_filter(value: &CellValue, filter: &ColumnFilter, data_type: DataType) -> bool {
    let expected = &filter.value;
    match filter.operator {
        FilterOperator::IsEmpty => value.is_empty(),
        FilterOperator::IsNotEmpty => !value.is_empty(),
        FilterOperator::Equals => values_equal(value, expected, data_type),
        FilterOperator::NotEquals => !values_equal(value, expected, data_type),
        FilterOperator::Contains => folded(value).contains(&folded(expected)),
        FilterOperator::NotContains => !folded(value).contains(&folded(expected)),
        FilterOperator::StartsWith => folded(value).starts_with(&folded(expected)),
        FilterOperator::EndsWith => folded(value).ends_with(&folded(expected)),
        FilterOperator::Gt => {
            compare_ordered(value, expected, data_type) == Some(Ordering::Greater)
        }
        FilterOperator::Gte => matches!(
            compare_ordered(value, expected, data_type),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Lt => compare_ordered(value, expected, data_type) == Some(Ordering::Less),
        FilterOperator::Lte => matches!(
            compare_ordered(value, expected, data_type),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::Between => match expected {
            CellValue::List(bounds) if bounds.len() == 2 => {
                matches!(
                    compare_ordered(value, &bounds[0], data_type),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare_ordered(value, &bounds[1], data_type),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            _ => false,
        },
        FilterOperator::InList => match expected {
            CellValue::List(items) => items.iter().any(|item| folded(value) == folded(item)),
            single => folded(value) == folded(single),
        },
    }
}

fn values_equal(value: &CellValue, expected: &CellValue, data_type: DataType) -> bool {
    match data_type {
        DataType::Number | DataType::Currency => value.to_number() == expected.to_number(),
        DataType::Boolean => match (value.to_bool(), expected.to_bool()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
        DataType::Date => match (value.to_date(), expected.to_date()) {
            (Some(left), Some(right)) => {
                left.to_offset(time::UtcOffset::UTC).date()
                    == right.to_offset(time::UtcOffset::UTC).date()
            }
            _ => false,
        },
        DataType::String => folded(value) == folded(expected),
    }
}

/// Dates order by instant; everything else goes through numeric coercion and
/// yields `None` when either side is NaN.
fn compare_ordered(
    value: &CellValue,
    expected: &CellValue,
    data_type: DataType,
) -> Option<Ordering> {
    match data_type {
        DataType::Date => value.date_millis()?.partial_cmp(&expected.date_millis()?),
        _ => value.to_number().partial_cmp(&expected.to_number()),
    }
}

fn folded(value: &CellValue) -> String {
    value.display().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{filter_rows, matches_filter};
    use crate::{CellValue, Column, ColumnFilter, DataType, FilterOperator, RowRef};
    use serde_json::{Value, json};

    fn refs(rows: &[Value]) -> Vec<RowRef<'_, Value>> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| RowRef {
                index,
                id: index.to_string(),
                row,
            })
            .collect()
    }

    fn indexes(rows: &[RowRef<'_, Value>]) -> Vec<usize> {
        rows.iter().map(|row| row.index).collect()
    }

    fn check(
        value: impl Into<CellValue>,
        operator: FilterOperator,
        expected: impl Into<CellValue>,
        data_type: DataType,
    ) -> bool {
        let filter = ColumnFilter::new("c", operator, expected);
        matches_filter(&value.into(), &filter, data_type)
    }

    #[test]
    fn gt_keeps_only_larger_numbers() {
        let rows = vec![json!({"age": 30}), json!({"age": 20})];
        let columns = vec![Column::keyed("age", "Age", DataType::Number)];
        let filters = vec![ColumnFilter::new("age", FilterOperator::Gt, 25)];
        let filtered = filter_rows(refs(&rows), &columns, &filters, "");
        assert_eq!(indexes(&filtered), vec![0]);
    }

    #[test]
    fn global_filter_matches_any_filterable_column() {
        let rows = vec![
            json!({"name": "Ada", "city": "Boise"}),
            json!({"name": "Grace", "city": "Adelaide"}),
            json!({"name": "Linus", "city": "Helsinki"}),
        ];
        let columns = vec![
            Column::keyed("name", "Name", DataType::String),
            Column::keyed("city", "City", DataType::String),
        ];
        let filtered = filter_rows(refs(&rows), &columns, &[], "AD");
        assert_eq!(indexes(&filtered), vec![0, 1]);
    }

    #[test]
    fn global_filter_skips_non_filterable_columns() {
        let rows = vec![json!({"name": "Ada", "secret": "needle"})];
        let columns = vec![
            Column::keyed("name", "Name", DataType::String),
            Column::keyed("secret", "Secret", DataType::String).filterable(false),
        ];
        assert!(filter_rows(refs(&rows), &columns, &[], "needle").is_empty());
    }

    #[test]
    fn column_filters_compose_with_and() {
        let rows = vec![
            json!({"state": "CA", "age": 40}),
            json!({"state": "CA", "age": 20}),
            json!({"state": "NY", "age": 50}),
        ];
        let columns = vec![
            Column::keyed("state", "State", DataType::String),
            Column::keyed("age", "Age", DataType::Number),
        ];
        let filters = vec![
            ColumnFilter::new("state", FilterOperator::Equals, "ca"),
            ColumnFilter::new("age", FilterOperator::Gte, 30),
        ];
        assert_eq!(indexes(&filter_rows(refs(&rows), &columns, &filters, "")), vec![0]);
    }

    #[test]
    fn filters_on_unknown_columns_are_skipped() {
        let rows = vec![json!({"a": 1}), json!({"a": 2})];
        let columns = vec![Column::keyed("a", "A", DataType::Number)];
        let filters = vec![ColumnFilter::new("ghost", FilterOperator::Equals, "x")];
        assert_eq!(indexes(&filter_rows(refs(&rows), &columns, &filters, "")), vec![0, 1]);
    }

    #[test]
    fn string_operators_are_case_insensitive() {
        assert!(check("Hello World", FilterOperator::Contains, "WORLD", DataType::String));
        assert!(check("Hello World", FilterOperator::NotContains, "moon", DataType::String));
        assert!(check("Hello World", FilterOperator::StartsWith, "hello", DataType::String));
        assert!(check("Hello World", FilterOperator::EndsWith, "LD", DataType::String));
        assert!(check("Hello", FilterOperator::Equals, "hello", DataType::String));
        assert!(check("Hello", FilterOperator::NotEquals, "help", DataType::String));
    }

    #[test]
    fn empty_operators_ignore_data_type() {
        assert!(check(CellValue::Null, FilterOperator::IsEmpty, CellValue::Null, DataType::Number));
        assert!(check("", FilterOperator::IsEmpty, CellValue::Null, DataType::Date));
        assert!(check(
            CellValue::List(Vec::new()),
            FilterOperator::IsEmpty,
            CellValue::Null,
            DataType::String
        ));
        assert!(check(0, FilterOperator::IsNotEmpty, CellValue::Null, DataType::Number));
    }

    #[test]
    fn equals_is_type_dispatched() {
        assert!(check("42", FilterOperator::Equals, 42, DataType::Currency));
        assert!(check(true, FilterOperator::Equals, true, DataType::Boolean));
        assert!(!check(true, FilterOperator::Equals, false, DataType::Boolean));
        assert!(check(
            "2024-05-01T18:45:00Z",
            FilterOperator::Equals,
            "2024-05-01",
            DataType::Date
        ));
        assert!(!check("2024-05-02", FilterOperator::Equals, "2024-05-01", DataType::Date));
    }

    #[test]
    fn relational_operators_order_dates() {
        assert!(check("2024-06-01", FilterOperator::Gt, "2024-01-01", DataType::Date));
        assert!(check("2024-01-01", FilterOperator::Lte, "2024-01-01", DataType::Date));
        assert!(!check("never", FilterOperator::Lt, "2024-01-01", DataType::Date));
    }

    #[test]
    fn relational_operators_on_text_columns_degrade_to_nan() {
        assert!(!check("abc", FilterOperator::Gt, 1, DataType::String));
        assert!(!check("abc", FilterOperator::Lte, 1, DataType::String));
        assert!(check("12", FilterOperator::Gt, 3, DataType::String));
    }

    #[test]
    fn between_is_inclusive_and_requires_two_bounds() {
        let bounds = CellValue::List(vec![CellValue::from(10), CellValue::from(20)]);
        assert!(check(10, FilterOperator::Between, bounds.clone(), DataType::Number));
        assert!(check(20, FilterOperator::Between, bounds.clone(), DataType::Number));
        assert!(!check(21, FilterOperator::Between, bounds, DataType::Number));
        assert!(!check(15, FilterOperator::Between, 10, DataType::Number));

        let dates = CellValue::List(vec![
            CellValue::from("2024-01-01"),
            CellValue::from("2024-12-31"),
        ]);
        assert!(check("2024-07-04", FilterOperator::Between, dates, DataType::Date));
    }

    #[test]
    fn in_list_matches_any_member_case_insensitively() {
        let list = CellValue::List(vec![CellValue::from("ca"), CellValue::from("NY")]);
        assert!(check("CA", FilterOperator::InList, list.clone(), DataType::String));
        assert!(check("ny", FilterOperator::InList, list.clone(), DataType::String));
        assert!(!check("TX", FilterOperator::InList, list, DataType::String));
        let listed = CellValue::List(vec![CellValue::from("5")]);
        assert!(check(5, FilterOperator::InList, listed, DataType::Number));
    }
}
