//! Hand-off point for cascades that could not finish.
//!
//! The cascade is scan-then-fix-each, with no transaction spanning bags. A bag whose
//! rewrite failed keeps its line for the deleted entry until something retries it; the
//! sink is the contract through which that "something" learns about it. Re-running
//! `ConsistencyCoordinator::on_catalog_entry_deleted` for a reported entry is always
//! safe: it only touches bags that still reference the entry.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use bakehouse_core::{BagId, CatalogEntryId};

use crate::coordinator::CascadeWriteFailure;

/// Something left inconsistent after a catalog deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ReconciliationIssue {
    /// One bag still references the deleted entry.
    BagRewriteFailed(CascadeWriteFailure),
    /// The entry is gone but no bag was scanned for it.
    CascadeNotRun {
        entry_id: CatalogEntryId,
        reason: String,
    },
}

impl ReconciliationIssue {
    pub fn entry_id(&self) -> CatalogEntryId {
        match self {
            ReconciliationIssue::BagRewriteFailed(f) => f.entry_id,
            ReconciliationIssue::CascadeNotRun { entry_id, .. } => *entry_id,
        }
    }
}

/// Receiver of reconciliation issues (alerting, a retry queue, ...).
pub trait ReconciliationSink: Send + Sync {
    fn report(&self, issue: ReconciliationIssue);
}

impl<S> ReconciliationSink for Arc<S>
where
    S: ReconciliationSink + ?Sized,
{
    fn report(&self, issue: ReconciliationIssue) {
        (**self).report(issue)
    }
}

/// In-memory issue log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReconciliationLog {
    inner: Mutex<Vec<ReconciliationIssue>>,
}

impl InMemoryReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn all(&self) -> Vec<ReconciliationIssue> {
        match self.inner.lock() {
            Ok(issues) => issues.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Bags still pointing at a deleted entry, as `(entry, bag)` pairs.
    pub fn stale_bags(&self) -> Vec<(CatalogEntryId, BagId)> {
        self.all()
            .into_iter()
            .filter_map(|issue| match issue {
                ReconciliationIssue::BagRewriteFailed(f) => Some((f.entry_id, f.bag_id)),
                ReconciliationIssue::CascadeNotRun { .. } => None,
            })
            .collect()
    }

    /// Take every issue logged so far.
    pub fn drain(&self) -> Vec<ReconciliationIssue> {
        match self.inner.lock() {
            Ok(mut issues) => std::mem::take(&mut *issues),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl ReconciliationSink for InMemoryReconciliationLog {
    fn report(&self, issue: ReconciliationIssue) {
        match self.inner.lock() {
            Ok(mut issues) => issues.push(issue),
            Err(poisoned) => poisoned.into_inner().push(issue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(entry_id: CatalogEntryId, bag_id: BagId) -> CascadeWriteFailure {
        CascadeWriteFailure {
            bag_id,
            entry_id,
            attempts: 3,
            reason: "store unavailable: timeout".to_string(),
        }
    }

    #[test]
    fn log_keeps_issues_until_drained() {
        let log = InMemoryReconciliationLog::new();
        let entry = CatalogEntryId::new();
        let bag = BagId::new();
        log.report(ReconciliationIssue::BagRewriteFailed(failure(entry, bag)));
        log.report(ReconciliationIssue::CascadeNotRun {
            entry_id: entry,
            reason: "scan failed".to_string(),
        });

        assert_eq!(log.stale_bags(), vec![(entry, bag)]);
        assert!(log.all().iter().all(|i| i.entry_id() == entry));
        assert_eq!(log.drain().len(), 2);
        assert!(log.all().is_empty());
    }

    #[test]
    fn issues_serialize_with_tag() {
        let issue = ReconciliationIssue::CascadeNotRun {
            entry_id: CatalogEntryId::new(),
            reason: "scan failed".to_string(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["issue"], "cascade_not_run");
    }
}
