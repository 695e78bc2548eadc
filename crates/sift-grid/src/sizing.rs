// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column id to current pixel width. Only columns that were resized have an
/// entry; everything else falls back to its declared width.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSizing {
    widths: BTreeMap<String, u32>,
}

impl ColumnSizing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column_id: &str) -> Option<u32> {
        self.widths.get(column_id).copied()
    }

    /// Stores `width` clamped into `[min_width, max_width]` and returns the
    /// stored value.
    pub fn set(&mut self, column_id: &str, width: i64, min_width: u32, max_width: u32) -> u32 {
        let clamped = clamp_width(width, min_width, max_width);
        self.widths.insert(column_id.to_owned(), clamped);
        clamped
    }

    pub fn reset(&mut self, column_id: &str) -> bool {
        self.widths.remove(column_id).is_some()
    }

    pub fn clear(&mut self) {
        self.widths.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.widths.iter().map(|(id, width)| (id.as_str(), *width))
    }
}

pub fn clamp_width(width: i64, min_width: u32, max_width: u32) -> u32 {
    let upper = i64::from(max_width.max(min_width));
    let clamped = width.max(i64::from(min_width)).min(upper);
    u32::try_from(clamped).unwrap_or(min_width)
}

#[cfg(test)]
mod tests {
    use super::{ColumnSizing, clamp_width};

    #[test]
    fn widths_outside_bounds_land_on_nearest_bound() {
        assert_eq!(clamp_width(10, 50, 500), 50);
        assert_eq!(clamp_width(-300, 50, 500), 50);
        assert_eq!(clamp_width(9_000, 50, 500), 500);
        assert_eq!(clamp_width(220, 50, 500), 220);
    }

    #[test]
    fn inverted_bounds_collapse_to_min() {
        assert_eq!(clamp_width(700, 300, 100), 300);
    }

    #[test]
    fn set_and_reset_round_trip() {
        let mut sizing = ColumnSizing::new();
        assert_eq!(sizing.set("name", 1_000, 80, 400), 400);
        assert_eq!(sizing.get("name"), Some(400));
        assert!(sizing.reset("name"));
        assert_eq!(sizing.get("name"), None);
        assert!(!sizing.reset("name"));
    }
}
