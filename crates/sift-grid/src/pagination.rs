// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{PaginationInfo, PaginationState};

pub fn paginate<R>(rows: Vec<R>, state: &PaginationState) -> Vec<R> {
    let size = state.page_size.max(1);
    rows.into_iter()
        .skip(state.page_index.saturating_mul(size))
        .take(size)
        .collect()
}

pub fn page_count(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size.max(1))
}

/// Largest valid page index for `page_count`; zero when there are no pages.
pub fn clamp_page_index(page_index: usize, page_count: usize) -> usize {
    page_index.min(page_count.saturating_sub(1))
}

pub fn pagination_info(total_rows: usize, state: &PaginationState) -> PaginationInfo {
    let page_count = page_count(total_rows, state.page_size);
    PaginationInfo {
        page_index: state.page_index,
        page_size: state.page_size.max(1),
        page_count,
        total_rows,
        can_previous_page: state.page_index > 0,
        can_next_page: state.page_index + 1 < page_count,
    }
}
