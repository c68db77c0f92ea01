//! Identity reconciliation at load time
//!
//! Records copied out-of-band can share a UID. A link to a shared UID could
//! resolve to either record, so every UID seen more than once is retired:
//! both holders get fresh identities and any link that pointed at the old
//! value is left dangling rather than silently retargeted.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{error, info, warn};

use crate::airframe::Airframe;
use crate::configuration::Configuration;
use crate::storage::ConfigStorage;

/// What reconciliation changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Record keys dropped for lacking an identity
    pub dropped: Vec<String>,
    /// UIDs seen on more than one record
    pub blacklisted: BTreeSet<String>,
    /// `(old, new)` for every identity change, in order
    pub regenerated: Vec<(String, String)>,
    /// `(uid, error)` for regenerated configurations that failed to persist
    pub save_failures: Vec<(String, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.regenerated.is_empty()
    }
}

/// Configurations with unique identities, in record-key order
pub struct Reconciled<A: Airframe> {
    pub configs: Vec<Configuration<A>>,
    pub report: ReconcileReport,
}

struct Reconciler<'s, A: Airframe, S: ConfigStorage> {
    storage: &'s S,
    configs: Vec<Configuration<A>>,
    index: HashMap<String, usize>,
    report: ReconcileReport,
}

impl<A: Airframe, S: ConfigStorage> Reconciler<'_, A, S> {
    fn insert(&mut self, config: Configuration<A>) -> usize {
        let idx = self.configs.len();
        self.index.insert(config.uid.clone(), idx);
        self.configs.push(config);
        idx
    }

    /// Give `configs[idx]` a UID no indexed configuration has, persist and re-index it
    fn regenerate(&mut self, idx: usize) {
        let config = &mut self.configs[idx];
        let old = config.uid.clone();
        loop {
            config.reset_uid();
            if !self.index.contains_key(&config.uid) {
                break;
            }
        }
        let new = config.uid.clone();
        warn!(name = %config.name, old = %old, new = %new, "Regenerated duplicate configuration UID");

        if let Err(e) = self.storage.save_configuration_file(config) {
            error!(uid = %new, error = %e, "Failed to persist regenerated UID");
            self.report.save_failures.push((new.clone(), format!("{e:#}")));
        }
        self.index.insert(new.clone(), idx);
        self.report.regenerated.push((old, new));
    }
}

/// Resolve duplicate and missing identities among freshly loaded records
pub fn reconcile<A: Airframe, S: ConfigStorage>(
    records: BTreeMap<String, Configuration<A>>,
    storage: &S,
) -> Reconciled<A> {
    let mut r = Reconciler {
        storage,
        configs: Vec::with_capacity(records.len()),
        index: HashMap::new(),
        report: ReconcileReport::default(),
    };

    for (key, config) in records {
        if !config.has_uid() {
            warn!(record = %key, name = %config.name, "Dropping configuration without UID");
            r.report.dropped.push(key);
            continue;
        }

        let uid = config.uid.clone();
        match r.index.remove(&uid) {
            None => {
                r.insert(config);
            }
            Some(previous) => {
                warn!(record = %key, uid = %uid, "Duplicate configuration UID");
                r.report.blacklisted.insert(uid);
                r.regenerate(previous);

                let idx = r.configs.len();
                r.configs.push(config);
                r.regenerate(idx);
            }
        }
    }

    // A regenerated UID may itself equal a value retired later in the pass
    let blacklisted: Vec<String> = r.report.blacklisted.iter().cloned().collect();
    for uid in blacklisted {
        if let Some(idx) = r.index.remove(&uid) {
            r.regenerate(idx);
        }
    }

    if !r.report.is_clean() {
        info!(
            airframe = %A::KIND,
            dropped = r.report.dropped.len(),
            regenerated = r.report.regenerated.len(),
            "Reconciled configuration identities"
        );
    }

    Reconciled { configs: r.configs, report: r.report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airframes::F16C;
    use crate::storage::memory::MemoryStorage;

    fn record(uid: &str, name: &str) -> Configuration<F16C> {
        let mut c = Configuration::<F16C>::factory(name);
        c.uid = uid.to_string();
        c
    }

    fn records(items: Vec<(&str, Configuration<F16C>)>) -> BTreeMap<String, Configuration<F16C>> {
        items.into_iter().map(|(k, c)| (k.to_string(), c)).collect()
    }

    #[test]
    fn test_unique_records_pass_through() {
        let storage = MemoryStorage::new();
        let result = reconcile(
            records(vec![("a.json", record("u1", "A")), ("b.json", record("u2", "B"))]),
            &storage,
        );

        assert!(result.report.is_clean());
        assert_eq!(result.configs.len(), 2);
        assert!(storage.saves().is_empty());
    }

    #[test]
    fn test_missing_uid_is_dropped() {
        let storage = MemoryStorage::new();
        let result = reconcile(
            records(vec![("a.json", record("", "Orphan")), ("b.json", record("u2", "B"))]),
            &storage,
        );

        assert_eq!(result.report.dropped, vec!["a.json".to_string()]);
        assert_eq!(result.configs.len(), 1);
        assert_eq!(result.configs[0].uid, "u2");
    }

    #[test]
    fn test_duplicate_pair_both_regenerated_and_persisted() {
        let storage = MemoryStorage::new();
        let result = reconcile(
            records(vec![("a.json", record("dup-1", "A")), ("b.json", record("dup-1", "B"))]),
            &storage,
        );

        let uids: Vec<&str> = result.configs.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids.len(), 2);
        assert_ne!(uids[0], uids[1]);
        assert!(!uids.contains(&"dup-1"));
        assert!(result.report.blacklisted.contains("dup-1"));

        // each persisted exactly once, under its final UID
        assert_eq!(storage.saves().len(), 2);
        for uid in uids {
            assert_eq!(storage.save_count(uid), 1);
        }
    }

    #[test]
    fn test_triple_duplicate_leaves_no_shared_uid() {
        let storage = MemoryStorage::new();
        let result = reconcile(
            records(vec![
                ("a.json", record("dup", "A")),
                ("b.json", record("dup", "B")),
                ("c.json", record("dup", "C")),
                ("d.json", record("solo", "D")),
            ]),
            &storage,
        );

        let uids: BTreeSet<&str> = result.configs.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids.len(), 4);
        assert!(!uids.contains("dup"));
        assert!(uids.contains("solo"));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let storage = MemoryStorage::new();
        let first = reconcile(
            records(vec![("a.json", record("dup-1", "A")), ("b.json", record("dup-1", "B"))]),
            &storage,
        );
        storage.clear_saves();

        let again: BTreeMap<String, Configuration<F16C>> = first
            .configs
            .iter()
            .map(|c| (c.filename.clone().unwrap_or_default(), c.clone()))
            .collect();
        let before: Vec<String> = again.values().map(|c| c.uid.clone()).collect();
        let second = reconcile(again, &storage);

        assert!(second.report.is_clean());
        assert!(storage.saves().is_empty());
        let after: Vec<String> = second.configs.iter().map(|c| c.uid.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_save_failure_is_reported_not_fatal() {
        let storage = MemoryStorage::new();
        storage.fail_saves_for("A");
        let result = reconcile(
            records(vec![("a.json", record("dup", "A")), ("b.json", record("dup", "B"))]),
            &storage,
        );

        assert_eq!(result.report.save_failures.len(), 1);
        assert_eq!(result.configs.len(), 2);
        assert_ne!(result.configs[0].uid, "dup");
        assert_eq!(storage.saves().len(), 1);
    }
}
