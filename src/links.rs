//! Link propagation
//!
//! A link is an edge `dependent --tag--> source`: the dependent's system for
//! `tag` mirrors the source's. When a source is saved with a sync tag, every
//! configuration that mirrors it directly or through other dependents receives
//! a value copy of the source's system and is saved (without a sync tag, so the
//! saves do not propagate again).

use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::airframe::Airframe;
use crate::configuration::{Configuration, SaveEvent};
use crate::error::ConfigError;
use crate::storage::ConfigStorage;
use crate::systems::SystemSet;

/// Outcome of pushing one system to its dependents
#[derive(Debug)]
pub struct PropagationReport<A: Airframe> {
    /// Save events of every dependent that was updated, in update order
    pub updated: Vec<SaveEvent<A::Tag>>,
    /// Dependents whose save failed; their in-memory value was still updated
    pub failures: Vec<(String, ConfigError)>,
}

impl<A: Airframe> Default for PropagationReport<A> {
    fn default() -> Self {
        Self { updated: Vec::new(), failures: Vec::new() }
    }
}

impl<A: Airframe> PropagationReport<A> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Indices of configurations linking `tag` directly to `source_uid`, in list order
pub fn direct_dependents<A: Airframe>(
    configs: &[Configuration<A>],
    source_uid: &str,
    tag: A::Tag,
) -> Vec<usize> {
    configs
        .iter()
        .enumerate()
        .filter(|(_, c)| c.uid != source_uid && c.linked_uid(tag) == Some(source_uid))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of every configuration mirroring `tag` from `source_uid`, directly
/// or transitively, in discovery order. The source itself is never included.
///
/// Each configuration is expanded at most once, so a cycle in the link graph
/// ends the walk instead of recursing forever.
pub fn find_configs_linking<A: Airframe>(
    configs: &[Configuration<A>],
    source_uid: &str,
    tag: A::Tag,
) -> Vec<usize> {
    let mut found = Vec::new();
    let mut expanded = HashSet::new();
    expanded.insert(source_uid.to_string());
    collect_dependents(configs, source_uid, source_uid, tag, &mut found, &mut expanded);
    found
}

fn collect_dependents<A: Airframe>(
    configs: &[Configuration<A>],
    root_uid: &str,
    uid: &str,
    tag: A::Tag,
    found: &mut Vec<usize>,
    expanded: &mut HashSet<String>,
) {
    let direct = direct_dependents(configs, uid, tag);
    for &idx in &direct {
        if configs[idx].uid == root_uid {
            warn!(source = %root_uid, via = %uid, tag = %tag, "Link cycle leads back to source, truncating");
            continue;
        }
        if !found.contains(&idx) {
            found.push(idx);
        }
    }

    for idx in direct {
        let dependent = &configs[idx].uid;
        if expanded.insert(dependent.clone()) {
            collect_dependents(configs, root_uid, dependent, tag, found, expanded);
        }
    }
}

/// True iff making `uid` mirror `tag` from `target_uid` would close a cycle,
/// i.e. `target_uid` already mirrors `tag` from `uid` through its link chain
pub fn would_create_cycle<A: Airframe>(
    configs: &[Configuration<A>],
    uid: &str,
    tag: A::Tag,
    target_uid: &str,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = target_uid;
    loop {
        if current == uid {
            return true;
        }
        if !seen.insert(current.to_string()) {
            // Already cyclic without us; linking into it does not close a new loop through `uid`
            return false;
        }
        let Some(next) = configs
            .iter()
            .find(|c| c.uid == current)
            .and_then(|c| c.linked_uid(tag))
        else {
            return false;
        };
        current = next;
    }
}

/// Copy `configs[source]`'s system for `tag` into every dependent and save each.
/// A failed save is logged and does not stop the remaining dependents.
pub fn propagate<A: Airframe, S: ConfigStorage>(
    configs: &mut [Configuration<A>],
    source: usize,
    tag: A::Tag,
    storage: &S,
) -> PropagationReport<A> {
    let source_uid = configs[source].uid.clone();
    let dependents = find_configs_linking(configs, &source_uid, tag);
    let mut report = PropagationReport::default();
    if dependents.is_empty() {
        return report;
    }

    let systems = configs[source].systems.clone();
    for idx in dependents {
        let dependent = &mut configs[idx];
        dependent.systems.copy_system(tag, &systems);
        dependent.mark_updated();

        match dependent.save(storage, None, None) {
            Ok(event) => report.updated.push(event),
            Err(e) => {
                error!(uid = %dependent.uid, source = %source_uid, tag = %tag, error = %e, "Failed to save linked configuration");
                report.failures.push((dependent.uid.clone(), e));
            }
        }
    }

    info!(
        source = %source_uid,
        tag = %tag,
        updated = report.updated.len(),
        failed = report.failures.len(),
        "Propagated linked system"
    );
    report
}
