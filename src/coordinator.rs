//! Concurrent paginated fetch-and-merge
//!
//! One probe request discovers the paging metadata; the full page range is
//! then split into contiguous chunks, one scoped worker thread per chunk.
//! Workers send each page's normalized records over a channel and the
//! coordinator merges them into a single [`DataTable`] after the join.
//!
//! Failure policy is abort: the first page error cancels the remaining
//! workers at their next page boundary and is returned once every worker
//! has stopped. No partial table is produced. A panicking worker cancels
//! the others the same way and surfaces as [`FetchError::WorkerPanicked`].

use crate::api_client::PageSource;
use crate::data::datatable::DataTable;
use crate::error::{FetchError, Result};
use crate::query::{EntityKind, Query};
use crate::record::{normalize, NormalizedRecord};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::OnceLock;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of worker threads to use when none is configured
pub fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `min(total_pages, parallelism)`, never below 1
pub fn worker_count(total_pages: u32, parallelism: usize) -> usize {
    (total_pages as usize).min(parallelism).max(1)
}

/// Split `1..=total_pages` into `workers` contiguous chunks.
///
/// Chunk sizes differ by at most one; the first `total_pages % workers`
/// chunks take the extra page. Asking for more chunks than pages yields one
/// chunk per page.
pub fn partition_pages(total_pages: u32, workers: usize) -> Vec<RangeInclusive<u32>> {
    if total_pages == 0 {
        return Vec::new();
    }

    // u64 so the last chunk ending at u32::MAX doesn't overflow
    let total = u64::from(total_pages);
    let workers = workers.clamp(1, total_pages as usize) as u64;
    let base = total / workers;
    let extra = total % workers;

    let mut chunks = Vec::with_capacity(workers as usize);
    let mut start = 1u64;
    for i in 0..workers {
        let end = start + base + u64::from(i < extra) - 1;
        chunks.push(start as u32..=end as u32);
        start = end + 1;
    }
    chunks
}

/// Records from one fetched page
struct PageBatch {
    page: u32,
    sample_fields: Option<Vec<String>>,
    records: Vec<NormalizedRecord>,
}

/// Shared between workers: set once on the first failure
#[derive(Default)]
struct AbortSignal {
    cancelled: AtomicBool,
    first_error: OnceLock<FetchError>,
}

impl AbortSignal {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn fail(&self, error: FetchError) {
        // Later errors are dropped; only the first is reported.
        let _ = self.first_error.set(error);
        self.cancelled.store(true, Ordering::Release);
    }

    fn into_error(self) -> Option<FetchError> {
        self.first_error.into_inner()
    }
}

/// Cancels sibling workers if the owning worker unwinds
struct CancelOnPanic<'a>(&'a AbortSignal);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancelled.store(true, Ordering::Release);
        }
    }
}

/// Runs paginated fetches against a [`PageSource`] with a bounded worker pool.
pub struct FetchCoordinator<'a, S: PageSource> {
    source: &'a S,
    max_workers: usize,
}

impl<'a, S: PageSource> FetchCoordinator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_workers: default_parallelism(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Fetch every page matching `query` and merge them into one table.
    ///
    /// Returns `Ok(None)` when the API reports zero matching items.
    pub fn fetch(&self, kind: EntityKind, query: &Query) -> Result<Option<DataTable>> {
        let start = Instant::now();
        let query = &query.with_resolved_since();

        let probe = self.source.fetch_page(kind, query)?;
        let paging = probe.paging().clone();
        info!(
            "{} query matched {} items over {} pages",
            kind, paging.total_items, paging.number_of_pages
        );

        if paging.total_items == 0 {
            return Ok(None);
        }

        let probe_columns: Option<Vec<String>> = probe
            .items()
            .first()
            .map(|item| item.properties.keys().cloned().collect());
        drop(probe);

        let total_pages = paging.number_of_pages;
        let workers = worker_count(total_pages, self.max_workers);
        let chunks = partition_pages(total_pages, workers);

        let abort = AbortSignal::default();
        let (tx, rx) = mpsc::channel::<PageBatch>();

        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .cloned()
                .enumerate()
                .map(|(worker_id, pages)| {
                    let tx = tx.clone();
                    let abort = &abort;
                    let source = self.source;
                    scope.spawn(move || run_worker(worker_id, source, kind, query, pages, tx, abort))
                })
                .collect();
            drop(tx);

            handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count()
        });

        if panicked > 0 {
            warn!("{} fetch worker(s) panicked", panicked);
            return Err(FetchError::WorkerPanicked);
        }
        if let Some(error) = abort.into_error() {
            return Err(error);
        }

        let mut batches: Vec<PageBatch> = rx.into_iter().collect();
        batches.sort_by_key(|batch| batch.page);

        let columns = probe_columns
            .or_else(|| batches.iter().find_map(|b| b.sample_fields.clone()))
            .unwrap_or_default();

        let fetched_pages = batches.len();
        let records: Vec<NormalizedRecord> =
            batches.into_iter().flat_map(|batch| batch.records).collect();

        let mut table = DataTable::from_records(kind.endpoint(), &columns, records);
        table
            .metadata
            .insert("entity".to_string(), kind.endpoint().to_string());
        table
            .metadata
            .insert("total_items".to_string(), paging.total_items.to_string());
        table
            .metadata
            .insert("total_pages".to_string(), total_pages.to_string());
        table
            .metadata
            .insert("fetched_pages".to_string(), fetched_pages.to_string());
        table
            .metadata
            .insert("workers".to_string(), workers.to_string());

        info!(
            "Fetched {} {} rows from {} pages with {} workers in {}ms",
            table.row_count(),
            kind,
            fetched_pages,
            workers,
            start.elapsed().as_millis()
        );

        Ok(Some(table))
    }
}

fn run_worker<S: PageSource>(
    worker_id: usize,
    source: &S,
    kind: EntityKind,
    query: &Query,
    pages: RangeInclusive<u32>,
    tx: Sender<PageBatch>,
    abort: &AbortSignal,
) {
    let _guard = CancelOnPanic(abort);
    debug!(
        "Worker {} fetching pages {}..={}",
        worker_id,
        pages.start(),
        pages.end()
    );

    for page in pages {
        if abort.is_cancelled() {
            debug!("Worker {} cancelled before page {}", worker_id, page);
            return;
        }

        match source.fetch_page(kind, &query.at_page(page)) {
            Ok(response) => {
                let items = response.into_items();
                let sample_fields = items
                    .first()
                    .map(|item| item.properties.keys().cloned().collect());
                let records = items
                    .into_iter()
                    .map(|item| normalize(kind, item))
                    .collect();

                let batch = PageBatch {
                    page,
                    sample_fields,
                    records,
                };
                if tx.send(batch).is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!("Worker {} failed on page {}: {}", worker_id, page, error);
                abort.fail(error);
                return;
            }
        }
    }

    debug!("Worker {} finished", worker_id);
}

/// Fetch and merge every page for `query`, with at most `max_workers` threads.
pub fn fetch_all<S: PageSource>(
    source: &S,
    kind: EntityKind,
    query: &Query,
    max_workers: usize,
) -> Result<Option<DataTable>> {
    FetchCoordinator::new(source)
        .with_max_workers(max_workers)
        .fetch(kind, query)
}
