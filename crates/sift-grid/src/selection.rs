// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Single,
    Multi,
}

/// Row id to selected flag. Absent ids are unselected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSelection {
    entries: BTreeMap<String, bool>,
}

impl RowSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: ids.into_iter().map(|id| (id.into(), true)).collect(),
        }
    }

    pub fn is_selected(&self, row_id: &str) -> bool {
        self.entries.get(row_id).copied().unwrap_or(false)
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.as_str())
    }

    pub fn selected_count(&self) -> usize {
        self.selected_ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_count() == 0
    }

    /// Flips one row. In single mode selecting a row drops every other entry.
    /// Returns the row's new state.
    pub fn toggle(&mut self, row_id: &str, mode: SelectionMode) -> bool {
        if self.is_selected(row_id) {
            self.entries.remove(row_id);
            return false;
        }
        if mode == SelectionMode::Single {
            self.entries.clear();
        }
        self.entries.insert(row_id.to_owned(), true);
        true
    }

    /// Selects every visible row unless all of them already are, in which
    /// case only the visible rows are cleared. Hidden rows keep their state.
    pub fn toggle_all(&mut self, visible_ids: &[String]) {
        if self.is_all_selected(visible_ids) {
            for id in visible_ids {
                self.entries.remove(id);
            }
        } else {
            for id in visible_ids {
                self.entries.insert(id.clone(), true);
            }
        }
    }

    pub fn is_all_selected(&self, visible_ids: &[String]) -> bool {
        !visible_ids.is_empty() && visible_ids.iter().all(|id| self.is_selected(id))
    }

    pub fn is_some_selected(&self, visible_ids: &[String]) -> bool {
        visible_ids.iter().any(|id| self.is_selected(id)) && !self.is_all_selected(visible_ids)
    }

    /// Single mode keeps only the first selected id.
    pub fn normalize(&mut self, mode: SelectionMode) {
        self.entries.retain(|_, selected| *selected);
        if mode == SelectionMode::Single
            && let Some(first) = self.entries.keys().next().cloned()
        {
            self.entries.retain(|id, _| *id == first);
        }
    }

    pub fn remove(&mut self, row_id: &str) -> bool {
        self.entries.remove(row_id).unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
