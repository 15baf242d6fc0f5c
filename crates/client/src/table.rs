//! Sorting and pagination of the job table.
//!
//! Pure presentation state: it never touches the network and never alters the
//! job list it renders.

use core::cmp::Ordering;

use serde::Serialize;
use telexport_core::ViewRow;

use crate::config::DEFAULT_PAGE_SIZE;

/// Page buttons shown at most before collapsing into ellipses.
const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    JobId,
    Tenant,
    CreatedAt,
    Status,
    DateFrom,
    DateTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// One entry of the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageMarker {
    Page(usize),
    Ellipsis,
}

/// A rendered page of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub rows: Vec<ViewRow>,
    /// 1-based, clamped to `1..=total_pages`.
    pub page: usize,
    pub total_pages: usize,
    /// 1-based index of the first row shown; 0 when there are no rows.
    pub first_index: usize,
    pub last_index: usize,
    pub total: usize,
    pub markers: Vec<PageMarker>,
}

impl TablePage {
    /// `Showing X to Y of Z entries`.
    pub fn summary(&self) -> String {
        format!(
            "Showing {} to {} of {} entries",
            self.first_index, self.last_index, self.total
        )
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    sort: Option<Sort>,
    page: usize,
    page_size: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl TableState {
    pub fn new(page_size: usize) -> Self {
        Self {
            sort: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn sort(&self) -> Option<Sort> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Header click: same column flips direction, another column starts
    /// ascending. Either way the table goes back to page 1.
    pub fn toggle_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some(current) if current.key == key => current.direction.flipped(),
            _ => SortDirection::Asc,
        };
        self.sort = Some(Sort { key, direction });
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    pub fn total_pages(&self, row_count: usize) -> usize {
        row_count.div_ceil(self.page_size)
    }

    /// Jump to `page`; out-of-range requests are ignored.
    pub fn go_to(&mut self, page: usize, row_count: usize) -> bool {
        if page == 0 || page > self.total_pages(row_count) {
            return false;
        }
        self.page = page;
        true
    }

    /// Pull the current page back into range after the list shrank.
    pub fn clamp(&mut self, row_count: usize) {
        self.page = self.page.clamp(1, self.total_pages(row_count).max(1));
    }

    pub fn next_page(&mut self, row_count: usize) -> bool {
        self.clamp(row_count);
        self.go_to(self.page + 1, row_count)
    }

    pub fn previous_page(&mut self, row_count: usize) -> bool {
        self.clamp(row_count);
        self.go_to(self.page.saturating_sub(1), row_count)
    }

    /// Sort `rows` (a copy) and cut out the current page.
    ///
    /// If the list shrank under the current page, the last existing page is
    /// shown instead.
    pub fn view(&self, rows: &[ViewRow]) -> TablePage {
        let mut sorted = rows.to_vec();
        if let Some(sort) = self.sort {
            sort_rows(&mut sorted, sort);
        }

        let total = sorted.len();
        let total_pages = self.total_pages(total);
        let page = self.page.clamp(1, total_pages.max(1));

        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(total);
        let rows = if start < end {
            sorted.drain(start..end).collect()
        } else {
            Vec::new()
        };

        TablePage {
            rows,
            page,
            total_pages,
            first_index: if total == 0 { 0 } else { start + 1 },
            last_index: end,
            total,
            markers: page_markers(page, total_pages),
        }
    }
}

/// Stable sort. Missing values order before present ones ascending, so they
/// end up last when descending.
pub fn sort_rows(rows: &mut [ViewRow], sort: Sort) {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sort.key);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn compare(a: &ViewRow, b: &ViewRow, key: SortKey) -> Ordering {
    match key {
        SortKey::JobId => a.job_id.cmp(&b.job_id),
        SortKey::Tenant => a.tenant_id.cmp(&b.tenant_id),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Status => a.status_label.cmp(&b.status_label),
        SortKey::DateFrom => a.date_from.cmp(&b.date_from),
        SortKey::DateTo => a.date_to.cmp(&b.date_to),
    }
}

/// Page selector for `current` of `total` pages.
///
/// Up to five pages are listed in full. Beyond that the first and last page
/// are always shown, with an ellipsis standing in for each hidden stretch.
pub fn page_markers(current: usize, total: usize) -> Vec<PageMarker> {
    use PageMarker::{Ellipsis, Page};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Page).collect();
    }

    let mut markers = Vec::with_capacity(MAX_VISIBLE_PAGES + 2);
    if current <= 3 {
        markers.extend((1..=4).map(Page));
        markers.extend([Ellipsis, Page(total)]);
    } else if current >= total - 2 {
        markers.extend([Page(1), Ellipsis]);
        markers.extend((total - 3..=total).map(Page));
    } else {
        markers.extend([Page(1), Ellipsis]);
        markers.extend((current - 1..=current + 1).map(Page));
        markers.extend([Ellipsis, Page(total)]);
    }
    markers
}
