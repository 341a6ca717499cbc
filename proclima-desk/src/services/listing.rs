//! Filter, sort and paginate for list views
//!
//! Every list view shares the same pipeline: a normalized substring filter
//! over the row's haystack, a sort on one column (Romanian collation for
//! text, numeric for quantities and money) with the display name as
//! ascending tie-break, then a page slice.

use crate::config::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
use crate::error::{AppError, Result};
use crate::text::{compare_ro, normalize, sort_number};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Value of one row in the sorted column
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    /// `None` for missing or unparseable numbers; sorts lowest
    Number(Option<f64>),
}

impl SortValue {
    pub fn text(s: impl Into<String>) -> Self {
        SortValue::Text(s.into())
    }

    pub fn optional_text(s: Option<&str>) -> Self {
        SortValue::Text(s.unwrap_or_default().to_string())
    }

    pub fn flag(b: bool) -> Self {
        SortValue::Number(Some(if b { 1.0 } else { 0.0 }))
    }

    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => compare_ro(a, b),
            (SortValue::Number(a), SortValue::Number(b)) => {
                sort_number(*a).total_cmp(&sort_number(*b))
            }
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// A row that can be shown in a list view
pub trait Listable {
    /// Sortable columns
    type Key: Copy + PartialEq + Debug;

    /// Text fields the filter matches against
    fn haystack(&self) -> Vec<String>;

    fn sort_value(&self, key: Self::Key) -> SortValue;

    /// Used for the tie-break
    fn display_name(&self) -> String;

    /// Field by field by default. Views that filter on the joined row
    /// override this with [`matches_joined`].
    fn matches_query(&self, normalized_query: &str) -> bool {
        self.haystack()
            .iter()
            .any(|field| normalize(field).contains(normalized_query))
    }
}

/// Match against every haystack field joined by spaces
pub fn matches_joined<T: Listable + ?Sized>(item: &T, normalized_query: &str) -> bool {
    normalize(&item.haystack().join(" ")).contains(normalized_query)
}

/// Whether a row matches an already-normalized query
pub fn matches<T: Listable>(item: &T, normalized_query: &str) -> bool {
    normalized_query.is_empty() || item.matches_query(normalized_query)
}

/// Filter then sort. Ties fall back to the display name ascending, whatever
/// the direction, then to the input order.
pub fn filter_sort<'a, T: Listable>(
    items: &'a [T],
    query: &str,
    key: T::Key,
    direction: SortDirection,
) -> Vec<&'a T> {
    let q = normalize(query);
    let mut rows: Vec<(SortValue, String, &'a T)> = items
        .iter()
        .filter(|item| matches(*item, &q))
        .map(|item| (item.sort_value(key), item.display_name(), item))
        .collect();

    rows.sort_by(|(va, na, _), (vb, nb, _)| {
        let primary = va.compare(vb);
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| compare_ro(na, nb))
    });

    rows.into_iter().map(|(_, _, item)| item).collect()
}

/// `max(1, ceil(total / page_size))`
pub fn page_count(total: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    total.div_ceil(size).max(1)
}

/// Clamp a 1-based page into `[1, page_count]`
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(total, page_size))
}

/// One page of a list view
#[derive(Debug, Clone, Serialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    /// 1-based, already clamped
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    /// Rows after filtering, across all pages
    pub total: usize,
}

impl<T> PageView<T> {
    /// 1-based index of the first row shown, 0 when empty
    pub fn start_index(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    /// 1-based index of the last row shown
    pub fn end_index(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.start_index() + self.items.len() - 1
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Slice `rows` to the requested (clamped) page
pub fn paginate<T>(rows: Vec<T>, page: usize, page_size: usize) -> PageView<T> {
    let page_size = page_size.max(1);
    let total = rows.len();
    let page_count = page_count(total, page_size);
    let page = page.clamp(1, page_count);

    let items = rows
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    PageView {
        items,
        page,
        page_count,
        page_size,
        total,
    }
}

/// Query, sort and page state of a list view
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<K> {
    pub query: String,
    pub sort_key: K,
    pub direction: SortDirection,
    pub page_size: usize,
    pub page: usize,
}

impl<K: Copy + PartialEq + Debug> ListState<K> {
    pub fn new(sort_key: K) -> Self {
        Self {
            query: String::new(),
            sort_key,
            direction: SortDirection::Asc,
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    /// Same key flips the direction; a new key starts ascending
    pub fn toggle_sort(&mut self, key: K) {
        if self.sort_key == key {
            self.direction = self.direction.flipped();
        } else {
            self.sort_key = key;
            self.direction = SortDirection::Asc;
        }
        self.page = 1;
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.direction = direction;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            return Err(AppError::Validation(format!(
                "Page size must be one of {:?}",
                PAGE_SIZE_OPTIONS
            )));
        }
        self.page_size = page_size;
        self.page = 1;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filtered and sorted rows across all pages (what an export sees)
    pub fn rows<'a, T: Listable<Key = K>>(&self, items: &'a [T]) -> Vec<&'a T> {
        filter_sort(items, &self.query, self.sort_key, self.direction)
    }

    /// The current page; the stored page is clamped to what exists
    pub fn view<'a, T: Listable<Key = K>>(&mut self, items: &'a [T]) -> PageView<&'a T> {
        let rows = self.rows(items);
        self.page = clamp_page(self.page, rows.len(), self.page_size);
        paginate(rows, self.page, self.page_size)
    }
}
