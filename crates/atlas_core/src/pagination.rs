//! Page-based listing on top of `Repository::find_range`.
//!
//! # Invariants
//! - `offset = page * size`, saturating at `i64::MAX`.
//! - `size = 0` returns no items but still reports the total count.
//! - No I/O beyond one `count` and at most one `find_range` call.

use crate::model::entity::Entity;
use crate::repo::{RepoResult, Repository};
use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page).saturating_mul(i64::from(self.size))
    }
}

/// One page of items plus the metadata needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    /// Number of pages of `size` needed for `total_count`; 0 when `size == 0`.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0 && self.total_pages() > 0
    }

    /// Following page; `None` on the last page or when the page number
    /// cannot be represented.
    pub fn next_request(&self) -> Option<PageRequest> {
        if !self.has_next() {
            return None;
        }
        self.page
            .checked_add(1)
            .map(|page| PageRequest::new(page, self.size))
    }

    /// Previous page, clamped to the last existing page when `page` is past
    /// the end.
    pub fn previous_request(&self) -> Option<PageRequest> {
        if !self.has_previous() {
            return None;
        }
        let last = u32::try_from(self.total_pages() - 1).unwrap_or(u32::MAX);
        Some(PageRequest::new((self.page - 1).min(last), self.size))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            size: self.size,
        }
    }
}

/// Loads one page of entities from `repo`.
pub fn fetch_page<E, R>(repo: &R, request: PageRequest) -> RepoResult<Page<E>>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    let total_count = repo.count()?;
    let items = if request.size == 0 {
        Vec::new()
    } else {
        repo.find_range(request.offset(), i64::from(request.size))?
    };

    Ok(Page {
        items,
        total_count,
        page: request.page,
        size: request.size,
    })
}
