//! Page window over the cached todo list.

use std::sync::Arc;

/// Rows per page offered by the list view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSize {
  Five,
  #[default]
  Ten,
  TwentyFive,
}

impl PageSize {
  pub const ALL: [PageSize; 3] = [PageSize::Five, PageSize::Ten, PageSize::TwentyFive];

  pub fn rows(self) -> usize {
    match self {
      Self::Five => 5,
      Self::Ten => 10,
      Self::TwentyFive => 25,
    }
  }

  pub fn from_rows(rows: usize) -> Option<Self> {
    Self::ALL.into_iter().find(|size| size.rows() == rows)
  }

  /// Next option, wrapping around
  pub fn cycle(self) -> Self {
    match self {
      Self::Five => Self::Ten,
      Self::Ten => Self::TwentyFive,
      Self::TwentyFive => Self::Five,
    }
  }
}

/// Items of page `page_index`, clamped to the list bounds.
pub fn slice<T>(full: &[T], page_index: usize, page_size: PageSize) -> &[T] {
  let start = page_index.saturating_mul(page_size.rows());
  if start >= full.len() {
    return &[];
  }
  let end = start.saturating_add(page_size.rows()).min(full.len());
  &full[start..end]
}

/// Number of pages needed for `len` items (at least one)
pub fn page_count(len: usize, page_size: PageSize) -> usize {
  len.div_ceil(page_size.rows()).max(1)
}

/// Page index and page size for one list view.
///
/// The page resets to the first one whenever the observed list changes
/// identity or the page size changes. A refetch that returns the same
/// content keeps the same `Arc`, so it does not move the user.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
  page_index: usize,
  page_size: PageSize,
  list_identity: Option<usize>,
}

impl Pagination {
  pub fn new(page_size: PageSize) -> Self {
    Self {
      page_size,
      ..Self::default()
    }
  }

  pub fn page_index(&self) -> usize {
    self.page_index
  }

  pub fn page_size(&self) -> PageSize {
    self.page_size
  }

  /// Record the list being displayed; returns `true` if the page was reset.
  pub fn observe<T>(&mut self, list: &Arc<Vec<T>>) -> bool {
    let identity = Arc::as_ptr(list) as usize;
    let changed = self.list_identity.is_some_and(|seen| seen != identity);
    self.list_identity = Some(identity);
    if changed {
      self.page_index = 0;
    }
    changed
  }

  pub fn set_page_size(&mut self, page_size: PageSize) {
    if page_size != self.page_size {
      self.page_size = page_size;
      self.page_index = 0;
    }
  }

  pub fn cycle_page_size(&mut self) {
    self.set_page_size(self.page_size.cycle());
  }

  pub fn next_page(&mut self, len: usize) {
    if self.page_index + 1 < page_count(len, self.page_size) {
      self.page_index += 1;
    }
  }

  pub fn previous_page(&mut self) {
    self.page_index = self.page_index.saturating_sub(1);
  }

  /// Current window of `full`
  pub fn window<'a, T>(&self, full: &'a [T]) -> &'a [T] {
    slice(full, self.page_index, self.page_size)
  }

  /// Position label like "11-20 of 200"
  pub fn range_label(&self, len: usize) -> String {
    let start = self.page_index.saturating_mul(self.page_size.rows());
    if start >= len {
      return format!("0 of {}", len);
    }
    let end = (start + self.page_size.rows()).min(len);
    format!("{}-{} of {}", start + 1, end, len)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn items(n: usize) -> Vec<usize> {
    (0..n).collect()
  }

  #[test]
  fn test_slice_length_law() {
    for len in [0, 1, 4, 5, 9, 10, 23, 25, 26, 60] {
      let full = items(len);
      for size in PageSize::ALL {
        for page in 0..8 {
          let expected = size
            .rows()
            .min(len.saturating_sub(page * size.rows()));
          assert_eq!(
            slice(&full, page, size).len(),
            expected,
            "len={} size={} page={}",
            len,
            size.rows(),
            page
          );
        }
      }
    }
  }

  #[test]
  fn test_twenty_three_items_by_ten() {
    let full = items(23);
    assert_eq!(slice(&full, 0, PageSize::Ten).len(), 10);
    assert_eq!(slice(&full, 2, PageSize::Ten), &[20, 21, 22]);
    assert!(slice(&full, 3, PageSize::Ten).is_empty());
    assert_eq!(page_count(23, PageSize::Ten), 3);
  }

  #[test]
  fn test_huge_page_index_is_empty() {
    let full = items(3);
    assert!(slice(&full, usize::MAX, PageSize::TwentyFive).is_empty());
  }

  #[test]
  fn test_page_size_from_rows() {
    assert_eq!(PageSize::from_rows(25), Some(PageSize::TwentyFive));
    assert_eq!(PageSize::from_rows(7), None);
    assert_eq!(PageSize::Five.cycle().cycle().cycle(), PageSize::Five);
  }

  #[test]
  fn test_identity_change_resets_page() {
    let mut pagination = Pagination::new(PageSize::Ten);
    let list = Arc::new(items(40));
    assert!(!pagination.observe(&list));
    pagination.next_page(40);
    pagination.next_page(40);
    assert_eq!(pagination.page_index(), 2);

    // Same allocation: background refresh with unchanged content
    assert!(!pagination.observe(&list.clone()));
    assert_eq!(pagination.page_index(), 2);

    // New allocation after a mutation-driven refetch
    let refetched = Arc::new(items(41));
    assert!(pagination.observe(&refetched));
    assert_eq!(pagination.page_index(), 0);
  }

  #[test]
  fn test_page_size_change_resets_page() {
    let mut pagination = Pagination::new(PageSize::Five);
    pagination.next_page(30);
    pagination.set_page_size(PageSize::Five);
    assert_eq!(pagination.page_index(), 1);

    pagination.cycle_page_size();
    assert_eq!(pagination.page_size(), PageSize::Ten);
    assert_eq!(pagination.page_index(), 0);
  }

  #[test]
  fn test_navigation_is_clamped() {
    let mut pagination = Pagination::new(PageSize::Ten);
    pagination.previous_page();
    assert_eq!(pagination.page_index(), 0);
    for _ in 0..10 {
      pagination.next_page(23);
    }
    assert_eq!(pagination.page_index(), 2);
    pagination.next_page(0);
    assert_eq!(pagination.page_index(), 2);
  }

  #[test]
  fn test_range_label() {
    let mut pagination = Pagination::new(PageSize::Ten);
    assert_eq!(pagination.range_label(200), "1-10 of 200");
    pagination.next_page(200);
    assert_eq!(pagination.range_label(200), "11-20 of 200");
    assert_eq!(pagination.range_label(0), "0 of 0");

    let mut last = Pagination::new(PageSize::Ten);
    last.next_page(23);
    last.next_page(23);
    assert_eq!(last.range_label(23), "21-23 of 23");
  }
}
