//! Merges adapter output into storage.
//!
//! Adapters are queried concurrently, one scoped thread each. Dedup and
//! insertion then run serially over the results in adapter order, so the
//! first adapter to report a posting owns it.

use anyhow::Result;
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{SourceError, SourceErrorKind};
use crate::models::NewSearchRun;
use crate::sources::{RawPosting, SourceAdapter};

#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub found: usize,
    pub new: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub deactivated: usize,
    pub errors: Vec<(String, SourceError)>,
}

/// What one adapter returned over all query pairs.
struct Harvest {
    source: String,
    postings: Vec<RawPosting>,
    errors: Vec<SourceError>,
    queries: usize,
    elapsed: Duration,
}

#[derive(Debug, Default)]
struct AdapterCounts {
    found: usize,
    new: usize,
    duplicates: usize,
    invalid: usize,
}

pub struct Aggregator<'a> {
    adapters: &'a [Box<dyn SourceAdapter>],
    pairs: &'a [(String, String)],
    stale_after_days: Option<u32>,
}

fn harvest(adapter: &dyn SourceAdapter, pairs: &[(String, String)]) -> Harvest {
    let start = Instant::now();
    let mut postings = Vec::new();
    let mut errors = Vec::new();
    for (query, location) in pairs {
        match adapter.search(query, location) {
            Ok(found) => {
                debug!(source = adapter.name(), query = %query, count = found.len(), "Search returned");
                postings.extend(found);
            }
            Err(e) if e.kind == SourceErrorKind::Empty => {
                debug!(source = adapter.name(), query = %query, "No results");
                errors.push(e);
            }
            Err(e) => {
                warn!(source = adapter.name(), query = %query, error = %e, "Search failed");
                errors.push(e);
            }
        }
    }
    Harvest {
        source: adapter.name().to_string(),
        postings,
        errors,
        queries: pairs.len(),
        elapsed: start.elapsed(),
    }
}

/// Error recorded on the adapter's search run. Empty answers only count when
/// the adapter found nothing at all.
fn run_error(harvest: &Harvest) -> Option<(String, String)> {
    let mut failures = harvest.errors.iter().filter(|e| e.kind != SourceErrorKind::Empty).peekable();
    let relevant: Vec<&SourceError> = if failures.peek().is_some() {
        failures.collect()
    } else if harvest.postings.is_empty() && !harvest.errors.is_empty() {
        harvest.errors.iter().collect()
    } else {
        return None;
    };

    let kind = relevant[0].kind.as_str().to_string();
    let mut details: Vec<String> = Vec::new();
    for e in &relevant {
        let text = e.to_string();
        if !details.contains(&text) {
            details.push(text);
        }
    }
    Some((kind, details.join("; ")))
}

impl<'a> Aggregator<'a> {
    pub fn new(
        adapters: &'a [Box<dyn SourceAdapter>],
        pairs: &'a [(String, String)],
        stale_after_days: Option<u32>,
    ) -> Self {
        Self { adapters, pairs, stale_after_days }
    }

    /// Run every adapter for every pair and store what is new. Only storage
    /// failures are returned as errors.
    pub fn run(&self, db: &Database) -> Result<SearchStats> {
        info!(adapters = self.adapters.len(), queries = self.pairs.len(), "Starting search");
        let pairs = self.pairs;

        let harvests: Vec<Harvest> = thread::scope(|s| {
            let handles: Vec<_> = self
                .adapters
                .iter()
                .map(|adapter| {
                    let adapter: &dyn SourceAdapter = adapter.as_ref();
                    (adapter.name().to_string(), s.spawn(move || harvest(adapter, pairs)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle.join().unwrap_or_else(|_| Harvest {
                        source: name,
                        postings: Vec::new(),
                        errors: vec![SourceError::new(SourceErrorKind::Http, "adapter panicked")],
                        queries: pairs.len(),
                        elapsed: Duration::ZERO,
                    })
                })
                .collect()
        });

        let mut stats = SearchStats::default();
        let mut seen: HashSet<String> = HashSet::new();

        for harvest in harvests {
            let insert_start = Instant::now();
            let mut counts = AdapterCounts::default();

            for raw in harvest.postings.iter().cloned() {
                counts.found += 1;
                let Some(posting) = raw.normalize() else {
                    counts.invalid += 1;
                    continue;
                };
                if seen.contains(&posting.fingerprint) {
                    counts.duplicates += 1;
                    continue;
                }
                if db.insert_posting(&posting)?.is_new() {
                    counts.new += 1;
                } else {
                    counts.duplicates += 1;
                }
                seen.insert(posting.fingerprint);
            }

            let error = run_error(&harvest);
            db.log_search_run(&NewSearchRun {
                source: harvest.source.clone(),
                queries: harvest.queries as i64,
                jobs_found: counts.found as i64,
                new_jobs: counts.new as i64,
                duplicates: counts.duplicates as i64,
                error_kind: error.as_ref().map(|(kind, _)| kind.clone()),
                error: error.map(|(_, detail)| detail),
                duration_seconds: (harvest.elapsed + insert_start.elapsed()).as_secs_f64(),
            })?;

            info!(
                source = %harvest.source,
                found = counts.found,
                new = counts.new,
                duplicates = counts.duplicates,
                invalid = counts.invalid,
                errors = harvest.errors.len(),
                "Source processed"
            );

            stats.found += counts.found;
            stats.new += counts.new;
            stats.duplicates += counts.duplicates;
            stats.invalid += counts.invalid;
            stats
                .errors
                .extend(harvest.errors.into_iter().map(|e| (harvest.source.clone(), e)));
        }

        if let Some(days) = self.stale_after_days {
            stats.deactivated = db.deactivate_stale(days)?;
            if stats.deactivated > 0 {
                info!(count = stats.deactivated, days, "Deactivated stale postings");
            }
        }

        info!(
            found = stats.found,
            new = stats.new,
            duplicates = stats.duplicates,
            invalid = stats.invalid,
            errors = stats.errors.len(),
            "Search complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockAdapter, listing, structured, test_db};

    fn pairs() -> Vec<(String, String)> {
        vec![
            ("Safety Manager".to_string(), "Oklahoma City, OK".to_string()),
            ("HSE Coordinator".to_string(), "Oklahoma City, OK".to_string()),
        ]
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(MockAdapter::new(
            "usajobs",
            vec![
                structured("usajobs", Some("1"), "Safety Manager", "FAA", "Oklahoma City, OK"),
                structured("usajobs", Some("2"), "HSE Coordinator", "FAA", "Oklahoma City, OK"),
            ],
        ))];
        let pairs = pairs();
        let aggregator = Aggregator::new(&adapters, &pairs, None);

        let first = aggregator.run(&db).unwrap();
        assert_eq!(first.new, 2);
        // Same results for the second query pair are in-run duplicates
        assert_eq!(first.found, 4);
        assert_eq!(first.duplicates, 2);
        let count = db.count_postings(false).unwrap();

        let second = aggregator.run(&db).unwrap();
        assert_eq!(second.new, 0);
        assert_eq!(db.count_postings(false).unwrap(), count);
    }

    #[test]
    fn test_fingerprint_collision_across_sources() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(MockAdapter::new(
                "usajobs",
                vec![structured("usajobs", Some("9"), "Safety Coordinator", "Devon Energy", "Oklahoma City, OK")],
            )),
            Box::new(MockAdapter::new(
                "careers",
                vec![listing("careers", "Devon Energy", "Safety  Coordinator", "Oklahoma City, OK 73102")],
            )),
        ];
        let pairs = vec![("Safety".to_string(), "Oklahoma City, OK".to_string())];
        let stats = Aggregator::new(&adapters, &pairs, None).run(&db).unwrap();

        assert_eq!(stats.new, 1);
        assert_eq!(stats.duplicates, 1);
        let stored = db.list_postings(None, true, 10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source, "usajobs");
    }

    #[test]
    fn test_one_failing_adapter_is_isolated() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(MockAdapter::new(
                "usajobs",
                vec![structured("usajobs", Some("1"), "Safety Manager", "FAA", "Tulsa, OK")],
            )),
            Box::new(MockAdapter::failing("brave", SourceErrorKind::Blocked)),
            Box::new(MockAdapter::new(
                "remoteok",
                vec![structured("remoteok", Some("r1"), "Remote HSE Lead", "Acme", "Remote")],
            )),
        ];
        let pairs = pairs();
        let stats = Aggregator::new(&adapters, &pairs, None).run(&db).unwrap();

        assert_eq!(stats.new, 2);
        assert_eq!(stats.errors.len(), 2);
        assert!(stats.errors.iter().all(|(source, e)| source == "brave" && e.kind == SourceErrorKind::Blocked));

        let runs = db.recent_search_runs(10).unwrap();
        assert_eq!(runs.len(), 3);
        let failed: Vec<_> = runs.iter().filter(|r| r.error_kind.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source, "brave");
        assert_eq!(failed[0].error_kind.as_deref(), Some("blocked"));
        assert_eq!(failed[0].queries, 2);
    }

    fn hit(url: &str, page_title: &str) -> RawPosting {
        RawPosting::SearchHit {
            source: "brave".to_string(),
            url: url.to_string(),
            page_title: page_title.to_string(),
            snippet: "Hiring in Oklahoma City, OK.".to_string(),
            raw: None,
        }
    }

    #[test]
    fn test_search_hits_on_same_board_path_are_distinct() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(MockAdapter::new(
            "brave",
            vec![
                hit("https://www.indeed.com/viewjob?jk=111", "HSE Manager at Devon Energy - Indeed.com"),
                hit("https://www.indeed.com/viewjob?jk=222", "Safety Coordinator at Devon Energy - Indeed.com"),
            ],
        ))];
        let pairs = vec![("HSE".to_string(), "Oklahoma City, OK".to_string())];
        let stats = Aggregator::new(&adapters, &pairs, None).run(&db).unwrap();

        assert_eq!(stats.new, 2);
        assert_eq!(stats.duplicates, 0);
        let stored = db.list_postings(Some("brave"), true, 10).unwrap();
        assert_eq!(stored.len(), 2);
        let first = stored.iter().find(|p| p.title.starts_with("HSE Manager")).unwrap();
        assert_eq!(first.url.as_deref(), Some("https://www.indeed.com/viewjob?jk=111"));
    }

    #[test]
    fn test_untitled_postings_are_invalid() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(MockAdapter::new(
            "careers",
            vec![listing("careers", "Devon", "   ", "Tulsa, OK")],
        ))];
        let pairs = vec![("Safety".to_string(), "Tulsa, OK".to_string())];
        let stats = Aggregator::new(&adapters, &pairs, None).run(&db).unwrap();
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.new, 0);
        assert_eq!(db.count_postings(false).unwrap(), 0);
    }

    #[test]
    fn test_empty_everywhere_is_recorded() {
        let db = test_db();
        let adapters: Vec<Box<dyn SourceAdapter>> =
            vec![Box::new(MockAdapter::failing("remoteok", SourceErrorKind::Empty))];
        let pairs = pairs();
        Aggregator::new(&adapters, &pairs, Some(30)).run(&db).unwrap();
        let runs = db.recent_search_runs(10).unwrap();
        assert_eq!(runs[0].error_kind.as_deref(), Some("empty"));
    }

    #[test]
    fn test_adapters_are_called_once_per_pair() {
        let db = test_db();
        let adapter = MockAdapter::new("usajobs", Vec::new());
        let calls = adapter.counter();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(adapter)];
        let pairs = pairs();
        Aggregator::new(&adapters, &pairs, None).run(&db).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
