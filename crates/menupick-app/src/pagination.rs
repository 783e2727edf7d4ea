// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Index arithmetic between the paged view and the full list.
//!
//! Pages are 1-based, rows within a page are 0-based. A page number of 0 is
//! treated as page 1. Page sizes below 1 are treated as 1.

use std::num::NonZeroUsize;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(size) => size,
    None => unreachable!(),
};

pub const fn to_absolute(page: usize, page_size: usize, row: usize) -> usize {
    page.saturating_sub(1)
        .saturating_mul(page_size)
        .saturating_add(row)
}

/// Inverse of [`to_absolute`]: the `(page, row)` that shows `absolute`.
pub const fn to_visible(absolute: usize, page_size: usize) -> (usize, usize) {
    let size = if page_size == 0 { 1 } else { page_size };
    (absolute / size + 1, absolute % size)
}

pub fn visible_slice<T>(list: &[T], page: usize, page_size: usize) -> &[T] {
    let start = to_absolute(page, page_size, 0).min(list.len());
    let end = start.saturating_add(page_size).min(list.len());
    &list[start..end]
}

/// Number of pages for `len` rows. An empty list still has one (empty) page.
pub const fn page_count(len: usize, page_size: usize) -> usize {
    let size = if page_size == 0 { 1 } else { page_size };
    if len == 0 { 1 } else { len.div_ceil(size) }
}

pub const fn clamp_page(page: usize, len: usize, page_size: usize) -> usize {
    let last = page_count(len, page_size);
    if page == 0 {
        1
    } else if page > last {
        last
    } else {
        page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    page_size: NonZeroUsize,
    current_page: usize,
}

impl Default for PageView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageView {
    pub const fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            current_page: 1,
        }
    }

    pub const fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    pub const fn page_count(&self, len: usize) -> usize {
        page_count(len, self.page_size())
    }

    pub const fn absolute(&self, row: usize) -> usize {
        to_absolute(self.current_page, self.page_size(), row)
    }

    /// Row on the current page that shows `absolute`, if any.
    pub const fn row_of(&self, absolute: usize) -> Option<usize> {
        let (page, row) = to_visible(absolute, self.page_size());
        if page == self.current_page {
            Some(row)
        } else {
            None
        }
    }

    pub fn visible<'a, T>(&self, list: &'a [T]) -> &'a [T] {
        visible_slice(list, self.current_page, self.page_size())
    }

    /// Moves to `page`, clamped to the pages that exist for `len` rows.
    /// Returns whether the current page changed.
    pub fn set_page(&mut self, page: usize, len: usize) -> bool {
        let next = clamp_page(page, len, self.page_size());
        let changed = next != self.current_page;
        self.current_page = next;
        changed
    }

    pub fn next_page(&mut self, len: usize) -> bool {
        self.set_page(self.current_page.saturating_add(1), len)
    }

    pub fn prev_page(&mut self, len: usize) -> bool {
        self.set_page(self.current_page.saturating_sub(1), len)
    }

    pub fn clamp_to(&mut self, len: usize) -> bool {
        self.set_page(self.current_page, len)
    }
}
