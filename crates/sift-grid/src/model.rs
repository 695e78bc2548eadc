// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
    Currency,
}

impl DataType {
    pub const ALL: [Self; 5] = [
        Self::String,
        Self::Number,
        Self::Date,
        Self::Boolean,
        Self::Currency,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Currency => "currency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "boolean" => Some(Self::Boolean),
            "currency" => Some(Self::Currency),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    InList,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    pub const ALL: [Self; 14] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Between,
        Self::InList,
        Self::IsEmpty,
        Self::IsNotEmpty,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Between => "between",
            Self::InList => "inList",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
        }
    }

    /// Unknown names are rejected rather than treated as a match-everything
    /// filter.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "equals" => Some(Self::Equals),
            "notEquals" => Some(Self::NotEquals),
            "contains" => Some(Self::Contains),
            "notContains" => Some(Self::NotContains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "between" => Some(Self::Between),
            "inList" => Some(Self::InList),
            "isEmpty" => Some(Self::IsEmpty),
            "isNotEmpty" => Some(Self::IsNotEmpty),
            _ => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Equals => "exact match (case-insensitive for text, same day for dates)",
            Self::NotEquals => "anything except an exact match",
            Self::Contains => "text contains the value",
            Self::NotContains => "text does not contain the value",
            Self::StartsWith => "text starts with the value",
            Self::EndsWith => "text ends with the value",
            Self::Gt => "greater than (numbers and dates)",
            Self::Gte => "greater than or equal to (numbers and dates)",
            Self::Lt => "less than (numbers and dates)",
            Self::Lte => "less than or equal to (numbers and dates)",
            Self::Between => "inclusive range; value is [min, max]",
            Self::InList => "matches any entry; value is an array",
            Self::IsEmpty => "cell is blank; value is ignored",
            Self::IsNotEmpty => "cell has a value; value is ignored",
        }
    }

    pub const fn takes_value(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn from_descending(descending: bool) -> Self {
        if descending { Self::Desc } else { Self::Asc }
    }

    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column_id: column_id.into(),
            direction,
        }
    }

    pub fn asc(column_id: impl Into<String>) -> Self {
        Self::new(column_id, SortDirection::Asc)
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        Self::new(column_id, SortDirection::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column_id: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: CellValue,
}

impl ColumnFilter {
    pub fn new(
        column_id: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            column_id: column_id.into(),
            operator,
            value: value.into(),
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_rows: usize,
    pub can_previous_page: bool,
    pub can_next_page: bool,
}

#[cfg(test)]
mod tests {
    use super::{DataType, FilterOperator, SortDirection};

    #[test]
    fn filter_operator_names_round_trip_through_parse() {
        for operator in FilterOperator::ALL {
            assert_eq!(FilterOperator::parse(operator.as_str()), Some(operator));
        }
        assert_eq!(FilterOperator::parse("fuzzy"), None);
        assert_eq!(FilterOperator::parse("Equals"), None);
    }

    #[test]
    fn filter_operator_serializes_with_wire_names() -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&FilterOperator::IsNotEmpty)?;
        assert_eq!(encoded, "\"isNotEmpty\"");
        let decoded: FilterOperator = serde_json::from_str("\"inList\"")?;
        assert_eq!(decoded, FilterOperator::InList);
        Ok(())
    }

    #[test]
    fn data_type_parse_rejects_unknown_names() {
        assert_eq!(DataType::parse("currency"), Some(DataType::Currency));
        assert_eq!(DataType::parse("money"), None);
        assert!(DataType::Currency.is_numeric());
        assert!(!DataType::Date.is_numeric());
    }

    #[test]
    fn sort_direction_maps_descending_flag() {
        assert_eq!(SortDirection::from_descending(true), SortDirection::Desc);
        assert!(!SortDirection::from_descending(false).is_descending());
    }
}
