//! Page-number pagination for list operations.

use serde::Serialize;

use crate::{Error, Result};

/// A validated `page`/`limit` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl PageRequest {
  /// Validate caller-supplied paging, falling back to `default_limit` and
  /// capping at `max_limit`.
  pub fn new(
    page: Option<u32>,
    limit: Option<u32>,
    default_limit: u32,
    max_limit: u32,
  ) -> Result<Self> {
    let page = page.unwrap_or(1);
    if page < 1 {
      return Err(Error::invalid("page", "Page must be a positive integer"));
    }
    let limit = limit.unwrap_or(default_limit);
    if limit < 1 || limit > max_limit {
      return Err(Error::invalid(
        "limit",
        &format!("Limit must be between 1 and {max_limit}"),
      ));
    }
    Ok(Self { page, limit })
  }

  /// A fixed page size; only the page number comes from the caller.
  pub fn fixed(page: Option<u32>, limit: u32) -> Result<Self> {
    Self::new(page, None, limit, limit)
  }

  pub fn offset(&self) -> u32 { (self.page - 1).saturating_mul(self.limit) }

  pub fn into_page<T>(self, items: Vec<T>, total: u64) -> Page<T> {
    Page {
      items,
      pagination: Pagination {
        current: self.page,
        pages: total.div_ceil(u64::from(self.limit)),
        total,
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub current: u32,
  pub pages:   u64,
  pub total:   u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items:      Vec<T>,
  pub pagination: Pagination,
}
