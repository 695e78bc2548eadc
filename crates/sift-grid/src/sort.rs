// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::{
    CellValue, Column, DataType, Record, RowRef, SortDirection, SortSpec, find_column, natural_cmp,
};

/// Orders rows by `sorting`, first entry first. Null cells, and cells that do
/// not coerce to the column's type, always land after the rest, whichever way
/// the column is sorted. Entries naming unknown
/// columns are skipped. The sort is stable.
pub fn sort_rows<'a, T: Record>(
    rows: Vec<RowRef<'a, T>>,
    sorting: &[SortSpec],
    columns: &[Column<T>],
) -> Vec<RowRef<'a, T>> {
    let rules: Vec<(&Column<T>, SortDirection)> = sorting
        .iter()
        .filter_map(|spec| find_column(columns, &spec.column_id).map(|c| (c, spec.direction)))
        .collect();
    if rules.is_empty() {
        return rows;
    }

    let mut keyed: Vec<(Vec<CellValue>, RowRef<'a, T>)> = rows
        .into_iter()
        .map(|row| {
            let keys = rules.iter().map(|(column, _)| column.value(row.row)).collect();
            (keys, row)
        })
        .collect();

    keyed.sort_by(|(left, _), (right, _)| {
        for (position, (column, direction)) in rules.iter().enumerate() {
            let left_value = &left[position];
            let right_value = &right[position];
            let left_null = is_unordered(left_value, column.data_type);
            let right_null = is_unordered(right_value, column.data_type);
            if left_null && right_null {
                continue;
            }
            if left_null {
                return Ordering::Greater;
            }
            if right_null {
                return Ordering::Less;
            }
            let order = match direction {
                SortDirection::Asc => compare_values(left_value, right_value, column.data_type),
                SortDirection::Desc => {
                    compare_values(left_value, right_value, column.data_type).reverse()
                }
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });

    keyed.into_iter().map(|(_, row)| row).collect()
}

fn is_unordered(value: &CellValue, data_type: DataType) -> bool {
    value.is_null()
        || match data_type {
            DataType::Number | DataType::Currency => value.to_number().is_nan(),
            DataType::Date => value.date_millis().is_none(),
            DataType::Boolean | DataType::String => false,
        }
}

/// Type-aware comparison of two defined values. Coercions that produce NaN
/// compare equal instead of failing.
pub fn compare_values(left: &CellValue, right: &CellValue, data_type: DataType) -> Ordering {
    match data_type {
        DataType::Number | DataType::Currency => left
            .to_number()
            .partial_cmp(&right.to_number())
            .unwrap_or(Ordering::Equal),
        DataType::Date => match (left.date_millis(), right.date_millis()) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        DataType::Boolean => left.is_truthy().cmp(&right.is_truthy()),
        DataType::String => natural_cmp(&left.display(), &right.display()),
    }
}
