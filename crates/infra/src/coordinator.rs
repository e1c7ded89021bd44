//! Propagation of catalog deletions into bags.
//!
//! ```text
//! catalog entry deleted (already gone from the catalog store)
//!   ↓
//! 1. Scan: every bag with a line for the entry
//!   ↓
//! 2. For each bag, on its own:
//!      drop the entry's lines → recompute total → write with expected version
//!      conflict? reload the bag and try again (bounded)
//!   ↓
//! 3. Report: rewritten / skipped / failed bags
//! ```
//!
//! There is no transaction spanning bags. A bag that cannot be rewritten keeps its
//! stale line and is handed to the [`ReconciliationSink`]; the other bags are still
//! processed and successful rewrites are never rolled back. Because the catalog entry
//! is removed before the scan starts, readers can observe "entry gone, bag still
//! references it" but never the reverse.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use bakehouse_bags::Bag;
use bakehouse_core::{AggregateRoot, BagId, CatalogEntryId, DomainError, DomainResult};

use crate::config::CascadeConfig;
use crate::reconciliation::{ReconciliationIssue, ReconciliationSink};
use crate::store::{BagStore, StoreError};

/// A bag that still references a deleted entry after the cascade gave up on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("bag {bag_id} still references deleted entry {entry_id} after {attempts} attempt(s): {reason}")]
pub struct CascadeWriteFailure {
    pub bag_id: BagId,
    pub entry_id: CatalogEntryId,
    pub attempts: u32,
    pub reason: String,
}

/// Outcome of one cascade run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub entry_id: CatalogEntryId,
    /// Bags written without the entry's lines.
    pub rewritten: Vec<BagId>,
    /// Bags found by the scan that needed no write by the time they were processed
    /// (a concurrent writer dropped the lines, or the bag was removed).
    pub skipped: Vec<BagId>,
    pub failures: Vec<CascadeWriteFailure>,
}

impl CascadeReport {
    fn new(entry_id: CatalogEntryId) -> Self {
        Self {
            entry_id,
            rewritten: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when no bag was left referencing the entry.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of bags the scan returned.
    pub fn affected(&self) -> usize {
        self.rewritten.len() + self.skipped.len() + self.failures.len()
    }
}

enum RewriteOutcome {
    Rewritten,
    Skipped,
}

/// Keeps bags free of references to deleted catalog entries.
#[derive(Debug)]
pub struct ConsistencyCoordinator<B, R> {
    bags: B,
    sink: R,
    config: CascadeConfig,
}

impl<B, R> ConsistencyCoordinator<B, R>
where
    B: BagStore,
    R: ReconciliationSink,
{
    pub fn new(bags: B, sink: R, config: CascadeConfig) -> Self {
        Self { bags, sink, config }
    }

    pub fn config(&self) -> CascadeConfig {
        self.config
    }

    /// Remove every line for `entry_id` from every bag and recompute their totals.
    ///
    /// Fails only when the scan itself cannot run (`PersistenceUnavailable`); the
    /// entry is then reported to the sink as a whole. Per-bag failures are returned in
    /// the report. Running it again for the same entry is a no-op once it completed.
    #[instrument(skip_all, fields(entry_id = %entry_id))]
    pub fn on_catalog_entry_deleted(&self, entry_id: CatalogEntryId) -> DomainResult<CascadeReport> {
        let affected = match self.bags.find_all_referencing(entry_id) {
            Ok(bags) => bags,
            Err(e) => {
                error!(error = %e, "bag scan failed; cascade not run");
                self.sink.report(ReconciliationIssue::CascadeNotRun {
                    entry_id,
                    reason: e.to_string(),
                });
                return Err(DomainError::unavailable(e.to_string()));
            }
        };

        let mut report = CascadeReport::new(entry_id);
        for bag in affected {
            let bag_id = bag.id_typed();
            match self.rewrite(bag, entry_id) {
                Ok(RewriteOutcome::Rewritten) => report.rewritten.push(bag_id),
                Ok(RewriteOutcome::Skipped) => report.skipped.push(bag_id),
                Err(failure) => {
                    error!(bag_id = %bag_id, attempts = failure.attempts, reason = %failure.reason, "bag rewrite failed");
                    self.sink
                        .report(ReconciliationIssue::BagRewriteFailed(failure.clone()));
                    report.failures.push(failure);
                }
            }
        }

        info!(
            rewritten = report.rewritten.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "cascade finished"
        );
        Ok(report)
    }

    fn rewrite(&self, mut bag: Bag, entry_id: CatalogEntryId) -> Result<RewriteOutcome, CascadeWriteFailure> {
        let bag_id = bag.id_typed();
        let max_attempts = self.config.max_write_attempts.max(1);
        let failure = |attempts: u32, err: &StoreError| CascadeWriteFailure {
            bag_id,
            entry_id,
            attempts,
            reason: err.to_string(),
        };

        let mut attempt = 1;
        loop {
            if bag.remove_entry(entry_id) == 0 {
                debug!(bag_id = %bag_id, "bag no longer references entry");
                return Ok(RewriteOutcome::Skipped);
            }

            let expected = bag.expected_version();
            match self.bags.update(bag, expected) {
                Ok(_) => return Ok(RewriteOutcome::Rewritten),
                Err(StoreError::NotFound) => {
                    debug!(bag_id = %bag_id, "bag removed before rewrite");
                    return Ok(RewriteOutcome::Skipped);
                }
                Err(e @ StoreError::Conflict(_)) if attempt < max_attempts => {
                    warn!(bag_id = %bag_id, attempt, error = %e, "concurrent bag modification; reloading");
                    attempt += 1;
                    bag = match self.bags.find(bag_id) {
                        Ok(Some(fresh)) => fresh,
                        Ok(None) => return Ok(RewriteOutcome::Skipped),
                        Err(e) => return Err(failure(attempt, &e)),
                    };
                }
                Err(e) => return Err(failure(attempt, &e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bakehouse_bags::LineItem;
    use bakehouse_core::ExpectedVersion;

    use super::*;
    use crate::reconciliation::InMemoryReconciliationLog;
    use crate::store::InMemoryBagStore;

    /// Bag store wrapper with scripted faults and a write counter.
    #[derive(Default)]
    struct ScriptedBagStore {
        inner: InMemoryBagStore,
        failing: Mutex<HashSet<BagId>>,
        scan_down: Mutex<bool>,
        /// Lines slipped in by a "concurrent user" right before the next write.
        interleave: Mutex<Vec<(BagId, LineItem)>>,
        writes: AtomicUsize,
    }

    impl ScriptedBagStore {
        fn fail_writes_for(&self, id: BagId) {
            self.failing.lock().unwrap().insert(id);
        }

        fn interleave(&self, id: BagId, line: LineItem) {
            self.interleave.lock().unwrap().push((id, line));
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl BagStore for ScriptedBagStore {
        fn find(&self, id: BagId) -> Result<Option<Bag>, StoreError> {
            self.inner.find(id)
        }

        fn find_all_referencing(&self, entry_id: CatalogEntryId) -> Result<Vec<Bag>, StoreError> {
            if *self.scan_down.lock().unwrap() {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            self.inner.find_all_referencing(entry_id)
        }

        fn insert(&self, bag: Bag) -> Result<Bag, StoreError> {
            self.inner.insert(bag)
        }

        fn update(&self, bag: Bag, expected: ExpectedVersion) -> Result<Bag, StoreError> {
            let pending: Vec<_> = self.interleave.lock().unwrap().drain(..).collect();
            for (id, line) in pending {
                let mut current = self.inner.find(id)?.unwrap();
                current.add_item(line).unwrap();
                let version = current.expected_version();
                self.inner.update(current, version)?;
            }
            if self.failing.lock().unwrap().contains(&bag.id_typed()) {
                return Err(StoreError::Unavailable("write timed out".to_string()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(bag, expected)
        }
    }

    fn setup(
        attempts: u32,
    ) -> (
        ConsistencyCoordinator<Arc<ScriptedBagStore>, Arc<InMemoryReconciliationLog>>,
        Arc<ScriptedBagStore>,
        Arc<InMemoryReconciliationLog>,
    ) {
        let store = Arc::new(ScriptedBagStore::default());
        let log = InMemoryReconciliationLog::arc();
        let coordinator = ConsistencyCoordinator::new(
            store.clone(),
            log.clone(),
            CascadeConfig::with_max_write_attempts(attempts),
        );
        (coordinator, store, log)
    }

    fn put(store: &ScriptedBagStore, lines: &[(CatalogEntryId, u32, u64)]) -> BagId {
        let bag = Bag::with_items(
            BagId::new(),
            lines.iter().map(|(e, q, t)| LineItem::new(*e, *q, *t)),
        )
        .unwrap();
        store.insert(bag).unwrap().id_typed()
    }

    #[test]
    fn removes_lines_and_recomputes_total() {
        let (coordinator, store, log) = setup(3);
        let apple = CatalogEntryId::new();
        let pear = CatalogEntryId::new();
        let bag_a = put(&store, &[(apple, 2, 10), (pear, 1, 5)]);

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();

        assert_eq!(report.rewritten, vec![bag_a]);
        assert!(report.is_complete());
        let bag = store.find(bag_a).unwrap().unwrap();
        assert_eq!(bag.items(), &[LineItem::new(pear, 1, 5)]);
        assert_eq!(bag.total(), 5);
        assert!(log.all().is_empty());
    }

    #[test]
    fn untouched_bags_are_not_written() {
        let (coordinator, store, _log) = setup(3);
        let apple = CatalogEntryId::new();
        let pear = CatalogEntryId::new();
        put(&store, &[(apple, 1, 10)]);
        let other = put(&store, &[(pear, 1, 5)]);

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();

        assert_eq!(report.affected(), 1);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.find(other).unwrap().unwrap().version(), 1);
    }

    #[test]
    fn failing_bag_does_not_block_others() {
        let (coordinator, store, log) = setup(3);
        let apple = CatalogEntryId::new();
        let b1 = put(&store, &[(apple, 1, 10)]);
        let b2 = put(&store, &[(apple, 1, 10), (CatalogEntryId::new(), 1, 7)]);
        store.fail_writes_for(b1);

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();

        assert_eq!(report.rewritten, vec![b2]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].bag_id, b1);
        assert_eq!(report.failures[0].attempts, 1);
        assert!(!report.is_complete());

        assert!(store.find(b1).unwrap().unwrap().references(apple));
        let b2 = store.find(b2).unwrap().unwrap();
        assert!(!b2.references(apple));
        assert_eq!(b2.total(), 7);

        assert_eq!(log.stale_bags(), vec![(apple, b1)]);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (coordinator, store, _log) = setup(3);
        let apple = CatalogEntryId::new();
        put(&store, &[(apple, 1, 10)]);
        put(&store, &[(apple, 3, 30)]);

        coordinator.on_catalog_entry_deleted(apple).unwrap();
        let writes = store.writes();
        assert_eq!(writes, 2);

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();
        assert_eq!(report.affected(), 0);
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn concurrent_addition_survives_rewrite() {
        let (coordinator, store, _log) = setup(3);
        let apple = CatalogEntryId::new();
        let pear = CatalogEntryId::new();
        let bag_id = put(&store, &[(apple, 1, 10)]);
        store.interleave(bag_id, LineItem::new(pear, 2, 8));

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();

        assert_eq!(report.rewritten, vec![bag_id]);
        let bag = store.find(bag_id).unwrap().unwrap();
        assert_eq!(bag.items(), &[LineItem::new(pear, 2, 8)]);
        assert_eq!(bag.total(), 8);
    }

    #[test]
    fn conflicts_beyond_attempt_budget_are_reported() {
        let (coordinator, store, log) = setup(1);
        let apple = CatalogEntryId::new();
        let bag_id = put(&store, &[(apple, 1, 10)]);
        store.interleave(bag_id, LineItem::new(CatalogEntryId::new(), 1, 1));

        let report = coordinator.on_catalog_entry_deleted(apple).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("optimistic concurrency"));
        assert!(store.find(bag_id).unwrap().unwrap().references(apple));
        assert_eq!(log.stale_bags(), vec![(apple, bag_id)]);
    }

    #[test]
    fn scan_failure_is_propagated_and_reported() {
        let (coordinator, store, log) = setup(3);
        let apple = CatalogEntryId::new();
        put(&store, &[(apple, 1, 10)]);
        *store.scan_down.lock().unwrap() = true;

        let err = coordinator.on_catalog_entry_deleted(apple).unwrap_err();

        assert!(matches!(err, DomainError::PersistenceUnavailable(_)));
        assert_eq!(
            log.all(),
            vec![ReconciliationIssue::CascadeNotRun {
                entry_id: apple,
                reason: "store unavailable: connection refused".to_string(),
            }]
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            #[test]
            fn no_bag_references_deleted_entry(
                bags in prop::collection::vec(
                    prop::collection::vec((0usize..4, 1u32..5, 0u64..10_000), 0..8),
                    1..10,
                ),
                deleted in 0usize..4,
            ) {
                let (coordinator, store, _log) = setup(3);
                let entries: Vec<CatalogEntryId> = (0..4).map(|_| CatalogEntryId::new()).collect();
                let ids: Vec<BagId> = bags
                    .iter()
                    .map(|lines| {
                        let lines: Vec<_> = lines.iter().map(|(e, q, t)| (entries[*e], *q, *t)).collect();
                        put(&store, &lines)
                    })
                    .collect();

                let report = coordinator.on_catalog_entry_deleted(entries[deleted]).unwrap();
                prop_assert!(report.is_complete());

                for id in ids {
                    let bag = store.find(id).unwrap().unwrap();
                    prop_assert!(!bag.references(entries[deleted]));
                    let sum: u64 = bag.items().iter().map(|i| i.line_total).sum();
                    prop_assert_eq!(bag.total(), sum);
                }
            }
        }
    }
}
