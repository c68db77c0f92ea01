//! Configuration store for one airframe
//!
//! Owns every loaded configuration of airframe `A` and keeps three views in
//! step: the backing list, the UID index and the filtered, sorted listing.
//! All saves go through the store so linked systems are propagated and
//! observers see every resulting `SaveEvent`.
//!
//! The store is single-threaded; the host must serialize calls into it.

use std::any::Any;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::airframe::Airframe;
use crate::configuration::{Configuration, SaveEvent};
use crate::constants::defaults;
use crate::error::{ConfigError, Result};
use crate::links::{self, PropagationReport};
use crate::reconcile::{ReconcileReport, Reconciled, reconcile};
use crate::storage::ConfigStorage;

/// Handle returned by `subscribe`
pub type ObserverId = u64;

type Observer<T> = Box<dyn FnMut(&SaveEvent<T>)>;

pub struct ConfigStore<A: Airframe, S: ConfigStorage> {
    storage: S,
    configs: Vec<Configuration<A>>,
    uid_index: HashMap<String, usize>,
    /// UIDs of configurations matching `filter`, favorites first then by name
    filtered: Vec<String>,
    filter: String,
    observers: Vec<(ObserverId, Observer<A::Tag>)>,
    next_observer: ObserverId,
}

impl<A: Airframe, S: ConfigStorage> ConfigStore<A, S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            configs: Vec::new(),
            uid_index: HashMap::new(),
            filtered: Vec::new(),
            filter: String::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the store contents with every stored record of this airframe,
    /// repairing duplicate and missing identities
    pub fn load_configurations_for_airframe(&mut self) -> Result<ReconcileReport> {
        let records = self.storage.load_configuration_files::<A>()?;
        let Reconciled { configs, report } = reconcile(records, &self.storage);

        self.configs = configs;
        self.reindex();
        self.filter_configs(None, false);

        info!(airframe = %A::KIND, count = self.configs.len(), "Loaded configurations");
        Ok(report)
    }

    /// Every configuration in list order
    pub fn configs(&self) -> &[Configuration<A>] {
        &self.configs
    }

    pub fn get(&self, uid: &str) -> Option<&Configuration<A>> {
        self.uid_index.get(uid).map(|&idx| &self.configs[idx])
    }

    /// Mutable access for editing systems and export settings.
    /// Identity, name and favorite changes must go through the store.
    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Configuration<A>> {
        self.uid_index.get(uid).map(|&idx| &mut self.configs[idx])
    }

    /// The filtered, sorted listing
    pub fn filtered(&self) -> impl Iterator<Item = &Configuration<A>> {
        self.filtered.iter().filter_map(|uid| self.get(uid))
    }

    pub fn filtered_uids(&self) -> &[String] {
        &self.filtered
    }

    pub fn active_filter(&self) -> &str {
        &self.filter
    }

    /// True iff no configuration has `name`, ignoring case
    pub fn is_name_unique(&self, name: &str) -> bool {
        self.name_owner(name, None).is_none()
    }

    fn name_owner(&self, name: &str, except_uid: Option<&str>) -> Option<&Configuration<A>> {
        let wanted = name.to_lowercase();
        self.configs
            .iter()
            .filter(|c| Some(c.uid.as_str()) != except_uid)
            .find(|c| c.name.to_lowercase() == wanted)
    }

    /// `base` if free, else `base` with the smallest numeric suffix that is.
    /// Advisory only: commit operations check uniqueness again.
    pub fn uniquify_name(&self, base: &str) -> String {
        if self.is_name_unique(base) {
            return base.to_string();
        }
        (2u32..)
            .map(|n| format!("{base} {n}"))
            .find(|candidate| self.is_name_unique(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Rebuild the filtered listing. `Some` replaces the active filter,
    /// `None` with `force` clears it, `None` without `force` re-applies it.
    pub fn filter_configs(&mut self, filter: Option<&str>, force: bool) {
        match filter {
            Some(f) => self.filter = f.to_string(),
            None if force => self.filter.clear(),
            None => {}
        }

        // UIDs may have been changed through `get_mut`
        self.reindex();

        let needle = self.filter.to_lowercase();
        let mut shown: Vec<(bool, String, usize)> = self
            .configs
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let name = c.name.to_lowercase();
                (needle.is_empty() || name.contains(&needle)).then_some((!c.is_favorite, name, idx))
            })
            .collect();
        shown.sort();

        self.filtered.clear();
        self.filtered
            .extend(shown.into_iter().map(|(_, _, idx)| self.configs[idx].uid.clone()));
        debug!(filter = %self.filter, shown = self.filtered.len(), "Filtered configurations");
    }

    fn reindex(&mut self) {
        self.uid_index = self
            .configs
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.uid.clone(), idx))
            .collect();
    }

    fn index_of(&self, uid: &str) -> Result<usize> {
        self.uid_index
            .get(uid)
            .copied()
            .ok_or_else(|| ConfigError::NotFound { uid: uid.to_string() })
    }

    fn checked_name(&self, name: &str, except_uid: Option<&str>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name_owner(name, except_uid).is_some() {
            return Err(ConfigError::NameTaken { name: name.to_string() });
        }
        Ok(name.to_string())
    }

    /// Persist a configuration not yet in the store, then add it to every view
    fn track(&mut self, mut config: Configuration<A>) -> Result<String> {
        while !config.has_uid() || self.uid_index.contains_key(&config.uid) {
            config.reset_uid();
        }
        let event = config.save(&self.storage, None, None)?;

        let uid = config.uid.clone();
        self.uid_index.insert(uid.clone(), self.configs.len());
        self.configs.push(config);
        self.notify(&event);
        self.filter_configs(None, true);
        Ok(uid)
    }

    /// Create a configuration with default systems
    pub fn create(&mut self, name: &str) -> Result<String> {
        let name = self.checked_name(name, None)?;
        let uid = self.track(Configuration::factory(&name))?;
        info!(uid = %uid, name = %name, "Created configuration");
        Ok(uid)
    }

    /// Duplicate `uid` under `name` as an independent configuration.
    /// Links are kept.
    pub fn copy(&mut self, uid: &str, name: &str) -> Result<String> {
        let name = self.checked_name(name, None)?;
        let mut config = self.configs[self.index_of(uid)?].clone();
        config.reset_uid();
        config.name = name;
        config.filename = None;
        config.is_favorite = false;

        let new_uid = self.track(config)?;
        info!(source = %uid, uid = %new_uid, "Copied configuration");
        Ok(new_uid)
    }

    /// Add a configuration from outside, e.g. an import. Its identity and
    /// links are reset. It is persisted in any case but only tracked when it
    /// belongs to this airframe; the new UID is returned in that case.
    pub fn inject<B: Airframe>(&mut self, mut config: Configuration<B>) -> Result<Option<String>> {
        config.sanitize(true);

        let mut slot = Some(config);
        let own = (&mut slot as &mut dyn Any)
            .downcast_mut::<Option<Configuration<A>>>()
            .and_then(Option::take);

        match own {
            Some(mut config) => {
                let base = match config.name.trim() {
                    "" => defaults::CONFIG_NAME,
                    name => name,
                };
                config.name = self.uniquify_name(base);
                let uid = self.track(config)?;
                info!(uid = %uid, "Injected configuration");
                Ok(Some(uid))
            }
            None => {
                let Some(mut foreign) = slot else {
                    return Ok(None);
                };
                self.storage.save_configuration_file(&mut foreign)?;
                info!(uid = %foreign.uid, airframe = %B::KIND, "Stored configuration for another airframe");
                Ok(None)
            }
        }
    }

    /// Remove `uid` from storage and the store. Configurations mirroring any
    /// of its systems keep their current values and are unlinked.
    pub fn delete(&mut self, uid: &str) -> Result<()> {
        let idx = self.index_of(uid)?;
        self.storage.delete_configuration_file(&self.configs[idx])?;
        let removed = self.configs.remove(idx);
        self.reindex();
        info!(uid = %uid, name = %removed.name, "Deleted configuration");

        for idx in 0..self.configs.len() {
            let tags: Vec<A::Tag> = self.configs[idx]
                .linked_sys_map
                .iter()
                .filter(|(_, target)| target.as_str() == uid)
                .map(|(tag, _)| *tag)
                .collect();
            if tags.is_empty() {
                continue;
            }
            for tag in tags {
                self.configs[idx].unlink_system(Some(tag));
            }
            if let Err(e) = self.persist(idx, None, None) {
                error!(uid = %self.configs[idx].uid, error = %e, "Failed to save unlinked dependent");
            }
        }

        self.filter_configs(None, false);
        Ok(())
    }

    pub fn rename(&mut self, uid: &str, name: &str) -> Result<()> {
        let idx = self.index_of(uid)?;
        let name = self.checked_name(name, Some(uid))?;

        let config = &mut self.configs[idx];
        let old_name = std::mem::replace(&mut config.name, name);
        let old_handle = config.filename.clone();
        if let Err(e) = self.storage.rename_configuration_file(config, old_handle.as_deref()) {
            config.name = old_name;
            config.filename = old_handle;
            return Err(e.into());
        }
        info!(uid = %uid, from = %old_name, to = %config.name, "Renamed configuration");

        let event = SaveEvent { uid: uid.to_string(), invoked_by: None, sync_tag: None };
        self.notify(&event);
        self.filter_configs(None, true);
        Ok(())
    }

    pub fn set_favorite(&mut self, uid: &str, favorite: bool) -> Result<()> {
        let idx = self.index_of(uid)?;
        self.configs[idx].is_favorite = favorite;
        self.persist(idx, None, None)?;
        self.filter_configs(None, false);
        Ok(())
    }

    /// Make `uid`'s system `tag` mirror `target_uid`'s. The copied value is
    /// saved and pushed on to whatever already mirrors `uid`.
    pub fn link_system(&mut self, uid: &str, tag: A::Tag, target_uid: &str) -> Result<PropagationReport<A>> {
        let idx = self.index_of(uid)?;
        if uid == target_uid {
            return Err(ConfigError::SelfLink { uid: uid.to_string(), tag: tag.to_string() });
        }
        let target = self.configs[self.index_of(target_uid)?].clone();
        if links::would_create_cycle(&self.configs, uid, tag, target_uid) {
            warn!(uid = %uid, tag = %tag, target = %target_uid, "Rejected cyclic link");
            return Err(ConfigError::LinkCycle {
                uid: uid.to_string(),
                tag: tag.to_string(),
                target: target_uid.to_string(),
            });
        }

        self.configs[idx].link_system_to(tag, &target)?;
        self.persist(idx, None, Some(tag))
    }

    /// Drop the link for `tag`, or every link when `None`, keeping current values
    pub fn unlink_system(&mut self, uid: &str, tag: Option<A::Tag>) -> Result<()> {
        let idx = self.index_of(uid)?;
        self.configs[idx].unlink_system(tag);
        self.persist(idx, None, None)?;
        Ok(())
    }

    /// Save `uid`. With a `sync_tag` its system is then pushed to every
    /// configuration mirroring it, directly or transitively.
    pub fn save(
        &mut self,
        uid: &str,
        invoked_by: Option<&str>,
        sync_tag: Option<A::Tag>,
    ) -> Result<PropagationReport<A>> {
        let idx = self.index_of(uid)?;
        self.persist(idx, invoked_by, sync_tag)
    }

    fn persist(
        &mut self,
        idx: usize,
        invoked_by: Option<&str>,
        sync_tag: Option<A::Tag>,
    ) -> Result<PropagationReport<A>> {
        let event = self.configs[idx].save(&self.storage, invoked_by, sync_tag)?;
        let report = match sync_tag {
            Some(tag) => links::propagate(&mut self.configs, idx, tag, &self.storage),
            None => PropagationReport::default(),
        };

        self.notify(&event);
        for dependent in &report.updated {
            self.notify(dependent);
        }
        Ok(report)
    }

    /// Register a callback for every save made through the store
    pub fn subscribe(&mut self, observer: impl FnMut(&SaveEvent<A::Tag>) + 'static) -> ObserverId {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &SaveEvent<A::Tag>) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    /// JSON of `uid` stripped of identity, links, storage handle and favorite flag
    pub fn export_json(&self, uid: &str) -> Result<String> {
        let mut config = self.configs[self.index_of(uid)?].clone();
        config.sanitize(true);
        Ok(config.to_json()?)
    }

    /// `(tag, source uid)` for every system `uid` mirrors
    pub fn linked_sources(&self, uid: &str) -> Result<Vec<(A::Tag, String)>> {
        let config = &self.configs[self.index_of(uid)?];
        Ok(config
            .linked_sys_map
            .iter()
            .map(|(tag, target)| (*tag, target.clone()))
            .collect())
    }

    /// Configurations mirroring `tag` from `uid`, directly or transitively,
    /// in propagation order
    pub fn dependents(&self, uid: &str, tag: A::Tag) -> Vec<&Configuration<A>> {
        links::find_configs_linking(&self.configs, uid, tag)
            .into_iter()
            .map(|idx| &self.configs[idx])
            .collect()
    }

    /// Remove links whose source is not in the store and save the affected
    /// configurations. Returns `(uid, tag)` for every link removed.
    pub fn unlink_dangling(&mut self) -> Vec<(String, A::Tag)> {
        let mut removed = Vec::new();
        for idx in 0..self.configs.len() {
            let dangling: Vec<A::Tag> = self.configs[idx]
                .linked_sys_map
                .iter()
                .filter(|(_, target)| !self.uid_index.contains_key(target.as_str()))
                .map(|(tag, _)| *tag)
                .collect();
            if dangling.is_empty() {
                continue;
            }

            let config = &mut self.configs[idx];
            for tag in dangling {
                warn!(uid = %config.uid, tag = %tag, target = ?config.linked_uid(tag), "Removing dangling link");
                config.unlink_system(Some(tag));
                removed.push((config.uid.clone(), tag));
            }
            if let Err(e) = self.persist(idx, None, None) {
                error!(uid = %self.configs[idx].uid, error = %e, "Failed to save after removing dangling links");
            }
        }
        removed
    }
}
