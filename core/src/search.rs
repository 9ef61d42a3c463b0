//! Fluent search over app items and the concurrent full-set fetch.
//!
//! # Design
//! `Search` is a value: every builder call returns a fresh copy with one
//! field changed, so a partially configured search can be branched into
//! several terminal calls without the branches seeing each other. Builder
//! calls never fail; out-of-range sizes and offsets are clamped.
//!
//! Terminal calls map onto single-page fetches:
//! - [`Search::first`] reads one item at the configured offset,
//! - [`Search::count`] asks for a zero-size page and keeps only the total,
//! - [`Search::all`] reads one page with the configured offset and size,
//! - [`Search::all_at_once`] counts first, then reads every page of
//!   [`PAGE_UNIT`] items on a bounded pool of worker threads.
//!
//! In a full fetch the first genuine failure cancels the task group: pages
//! not yet started are skipped, pages in flight are discarded when their
//! response arrives, and the call returns that one error. An empty page is
//! not a failure; it only means the count overshot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::error::ApiError;
use crate::filter::SearchFilter;

/// Items requested per page in a full fetch; the platform's page maximum.
pub const PAGE_UNIT: usize = 100;

/// Page size used when none (or a non-positive one) is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Body of one search request: `{from, size, active, filter, ...}`.
///
/// `size == 0` asks only for the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRequest {
    pub from: usize,
    pub size: usize,
    /// False when deleted items should be included.
    pub active: bool,
    #[serde(flatten)]
    pub filter: SearchFilter,
}

/// One page of items and the total reported for the whole query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// `result` part of a search response: `{result: [...], total}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResult<T> {
    pub result: Option<Vec<T>>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListBody<T> {
    pub result: ListResult<T>,
}

/// Accumulated search configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub filter: SearchFilter,
    pub include_deleted: bool,
    pub size: usize,
    pub from: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filter: SearchFilter::default(),
            include_deleted: false,
            size: DEFAULT_PAGE_SIZE,
            from: 0,
        }
    }
}

impl QuerySpec {
    /// Page request sharing this query's filter and active flag.
    pub fn page(&self, from: usize, size: usize) -> PageRequest {
        PageRequest {
            from,
            size,
            active: !self.include_deleted,
            filter: self.filter.clone(),
        }
    }
}

/// Number of [`PAGE_UNIT`] pages a full fetch launches for `total` items.
pub fn page_count(total: usize) -> usize {
    1 + total / PAGE_UNIT
}

/// Search over the items of one app. Created by [`App::search`].
pub struct Search<'a, T> {
    app: &'a App<T>,
    spec: QuerySpec,
}

impl<T> Clone for Search<'_, T> {
    fn clone(&self) -> Self {
        Self {
            app: self.app,
            spec: self.spec.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Search<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("app", &self.app.url())
            .field("spec", &self.spec)
            .finish()
    }
}

impl<'a, T> Search<'a, T> {
    pub(crate) fn new(app: &'a App<T>) -> Self {
        Self {
            app,
            spec: QuerySpec::default(),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    fn with(&self, change: impl FnOnce(&mut QuerySpec)) -> Self {
        let mut next = self.clone();
        change(&mut next.spec);
        next
    }

    /// Replace the filter. The filter is copied into the search.
    pub fn filter(&self, filter: &SearchFilter) -> Self {
        self.with(|spec| spec.filter = filter.clone())
    }

    /// Page size for `all`. Values below 1 fall back to the default of 10.
    pub fn size(&self, size: i64) -> Self {
        let size = usize::try_from(size)
            .ok()
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        self.with(|spec| spec.size = size)
    }

    /// Offset for `all` and `first`. Negative values clamp to 0.
    pub fn from(&self, from: i64) -> Self {
        let from = usize::try_from(from).unwrap_or(0);
        self.with(|spec| spec.from = from)
    }

    pub fn include_deleted(&self) -> Self {
        self.with(|spec| spec.include_deleted = true)
    }
}

impl<T: Serialize + DeserializeOwned> Search<'_, T> {
    /// First item at the configured offset, or `T::default()` when nothing
    /// matches.
    pub fn first(&self, ctx: &CancellationToken) -> Result<T, ApiError>
    where
        T: Default,
    {
        let page = self.app.find(ctx, &self.spec.page(self.spec.from, 1))?;
        Ok(page.items.into_iter().next().unwrap_or_default())
    }

    /// Total number of matching items.
    pub fn count(&self, ctx: &CancellationToken) -> Result<usize, ApiError> {
        let page = self.app.find(ctx, &self.spec.page(0, 0))?;
        Ok(page.total)
    }

    /// One page at the configured offset and size.
    pub fn all(&self, ctx: &CancellationToken) -> Result<Vec<T>, ApiError> {
        let page = self.app.find(ctx, &self.spec.page(self.spec.from, self.spec.size))?;
        Ok(page.items)
    }

    /// Every matching item, fetched [`PAGE_UNIT`] at a time on at most
    /// `limit` threads (at least one).
    ///
    /// Starts from offset 0 regardless of `from` and `size`. Item order
    /// across pages is unspecified; order within a page is kept.
    /// Cancelling `ctx` before every page is in stops the fetch and fails it
    /// with a cancelled `SendFailure`.
    pub fn all_at_once(&self, ctx: &CancellationToken, limit: usize) -> Result<Vec<T>, ApiError>
    where
        T: Send,
    {
        let total = self.count(ctx)?;
        let pages = page_count(total);
        let workers = limit.max(1).min(pages);
        info!(app = %self.app.url(), total, pages, workers, "fetching full result set");

        let group = ctx.child_token();
        let next_page = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let items: Mutex<Vec<T>> = Mutex::new(Vec::new());
        let first_error: OnceLock<ApiError> = OnceLock::new();

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    self.run_page_worker(&group, &next_page, &completed, pages, &items, &first_error)
                });
            }
        });

        finish(first_error.into_inner(), completed.into_inner(), pages, items.into_inner())
    }

    fn run_page_worker(
        &self,
        group: &CancellationToken,
        next_page: &AtomicUsize,
        completed: &AtomicUsize,
        pages: usize,
        items: &Mutex<Vec<T>>,
        first_error: &OnceLock<ApiError>,
    ) {
        while !group.is_cancelled() {
            let index = next_page.fetch_add(1, Ordering::Relaxed);
            if index >= pages {
                return;
            }

            let request = self.spec.page(index * PAGE_UNIT, PAGE_UNIT);
            match self.app.find(group, &request) {
                Ok(page) if page.items.is_empty() => {
                    debug!(from = request.from, "empty page, count overshot");
                    completed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(page) => {
                    if group.is_cancelled() {
                        return;
                    }
                    items.lock().extend(page.items);
                    completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    // Failures caused by an earlier cancellation are not reported.
                    if group.is_cancelled() {
                        return;
                    }
                    warn!(from = request.from, error = %err, "page fetch failed, cancelling full fetch");
                    let _ = first_error.set(err);
                    group.cancel();
                    return;
                }
            }
        }
    }
}

/// Outcome of a full fetch once every worker has stopped.
///
/// A recorded failure wins. Without one, pages left unfinished mean the
/// caller's context was cancelled mid-fetch; a fetch that completed every
/// page is returned even if the context was cancelled afterwards.
fn finish<T>(
    first_error: Option<ApiError>,
    completed: usize,
    pages: usize,
    items: Vec<T>,
) -> Result<Vec<T>, ApiError> {
    if let Some(err) = first_error {
        return Err(err);
    }
    if completed < pages {
        return Err(ApiError::cancelled());
    }
    Ok(items)
}
