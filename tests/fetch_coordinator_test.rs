use cbapi::api_client::{PageData, PageResponse, PageSource, Paging, RawItem};
use cbapi::coordinator::{partition_pages, worker_count};
use cbapi::error::Result;
use cbapi::{fetch_all, get_people, EntityKind, Query};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Slow source that records how many fetches overlap
struct SlowApi {
    pages: u32,
    per_page: u32,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    threads: Mutex<HashSet<thread::ThreadId>>,
}

impl SlowApi {
    fn new(pages: u32, per_page: u32) -> Self {
        Self {
            pages,
            per_page,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            threads: Mutex::new(HashSet::new()),
        }
    }
}

impl PageSource for SlowApi {
    fn fetch_page(&self, _kind: EntityKind, query: &Query) -> Result<PageResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.threads.lock().unwrap().insert(thread::current().id());

        thread::sleep(Duration::from_millis(2));

        let page = query.page_number();
        let items = (0..self.per_page)
            .map(|i| RawItem {
                properties: json!({
                    "first_name": format!("p{}", page),
                    "last_name": format!("i{}", i),
                    "rank": i,
                })
                .as_object()
                .cloned()
                .unwrap(),
            })
            .collect();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(PageResponse {
            data: PageData {
                items,
                paging: Paging {
                    total_items: (self.pages * self.per_page) as u64,
                    number_of_pages: self.pages,
                    current_page: page,
                },
            },
        })
    }
}

#[test]
fn test_pages_fetched_concurrently() {
    let api = SlowApi::new(50, 10);

    let table = fetch_all(&api, EntityKind::Person, &Query::new(), 8)
        .unwrap()
        .unwrap();

    assert_eq!(table.row_count(), 500);
    let labels: HashSet<&str> = table.labels().into_iter().collect();
    assert_eq!(labels.len(), 500);
    let peak = api.peak.load(Ordering::SeqCst);
    assert!((2..=8).contains(&peak), "peak concurrency {}", peak);

    // probe runs on this thread; the rest are workers
    let mut threads = api.threads.lock().unwrap().clone();
    assert!(threads.remove(&thread::current().id()));
    assert!(
        (2..=8).contains(&threads.len()),
        "{} worker threads",
        threads.len()
    );
}

#[test]
fn test_single_worker_is_sequential() {
    let api = SlowApi::new(6, 2);

    let table = fetch_all(&api, EntityKind::Person, &Query::new(), 1)
        .unwrap()
        .unwrap();

    assert_eq!(table.row_count(), 12);
    assert_eq!(api.peak.load(Ordering::SeqCst), 1);
    let mut threads = api.threads.lock().unwrap().clone();
    assert!(threads.remove(&thread::current().id()));
    assert_eq!(threads.len(), 1);
}

#[test]
fn test_repeated_runs_are_stable() {
    for _ in 0..5 {
        let api = SlowApi::new(60, 7);
        let table = get_people(&api, &Query::new()).unwrap().unwrap();
        assert_eq!(table.row_count(), 420);
        assert_eq!(table.column_names().len(), 3);
    }
}

#[test]
fn test_partition_exposed_helpers() {
    let workers = worker_count(50, 8);
    assert_eq!(workers, 8);

    let chunks = partition_pages(50, workers);
    let sizes: Vec<usize> = chunks.iter().map(|c| c.clone().count()).collect();
    assert_eq!(sizes, vec![7, 7, 6, 6, 6, 6, 6, 6]);
    assert_eq!(*chunks[0].start(), 1);
    assert_eq!(*chunks[7].end(), 50);
}
