//! In-memory storage double that records every save

use anyhow::{Result, bail};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use super::ConfigStorage;
use crate::airframe::{Airframe, AirframeKind};
use crate::configuration::Configuration;

#[derive(Debug, Default)]
pub(crate) struct MemoryStorage {
    records: RefCell<BTreeMap<(AirframeKind, String), String>>,
    saves: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
    next_handle: Cell<u32>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record directly, as if copied onto disk out-of-band
    pub fn seed<A: Airframe>(&self, handle: &str, config: &Configuration<A>) {
        self.records
            .borrow_mut()
            .insert((A::KIND, handle.to_string()), config.to_json().unwrap());
    }

    pub fn seed_raw(&self, kind: AirframeKind, handle: &str, text: &str) {
        self.records.borrow_mut().insert((kind, handle.to_string()), text.to_string());
    }

    /// UIDs in save order
    pub fn saves(&self) -> Vec<String> {
        self.saves.borrow().clone()
    }

    pub fn save_count(&self, uid: &str) -> usize {
        self.saves.borrow().iter().filter(|u| *u == uid).count()
    }

    pub fn clear_saves(&self) {
        self.saves.borrow_mut().clear();
    }

    /// Make every save of a configuration with this UID or name fail
    pub fn fail_saves_for(&self, uid_or_name: &str) {
        self.failing.borrow_mut().insert(uid_or_name.to_string());
    }

    pub fn record_count(&self, kind: AirframeKind) -> usize {
        self.records.borrow().keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn stored<A: Airframe>(&self, handle: &str) -> Option<Configuration<A>> {
        let records = self.records.borrow();
        let text = records.get(&(A::KIND, handle.to_string()))?;
        Configuration::from_json(text)
    }
}

impl ConfigStorage for MemoryStorage {
    fn load_configuration_files<A: Airframe>(&self) -> Result<BTreeMap<String, Configuration<A>>> {
        let records = self.records.borrow();
        let mut out = BTreeMap::new();
        for ((kind, handle), text) in records.iter() {
            if *kind != A::KIND {
                continue;
            }
            if let Some(mut config) = Configuration::<A>::from_json(text) {
                config.filename = Some(handle.clone());
                out.insert(handle.clone(), config);
            }
        }
        Ok(out)
    }

    fn save_configuration_file<A: Airframe>(&self, config: &mut Configuration<A>) -> Result<()> {
        let failing = self.failing.borrow();
        if failing.contains(&config.uid) || failing.contains(&config.name) {
            bail!("simulated write failure for {}", config.uid);
        }
        drop(failing);
        let handle = match &config.filename {
            Some(handle) => handle.clone(),
            None => {
                let n = self.next_handle.get() + 1;
                self.next_handle.set(n);
                format!("record-{n}.json")
            }
        };
        config.filename = Some(handle.clone());
        self.records.borrow_mut().insert((A::KIND, handle), config.to_json()?);
        self.saves.borrow_mut().push(config.uid.clone());
        Ok(())
    }

    fn delete_configuration_file<A: Airframe>(&self, config: &Configuration<A>) -> Result<()> {
        if let Some(handle) = &config.filename {
            self.records.borrow_mut().remove(&(A::KIND, handle.clone()));
        }
        Ok(())
    }

    fn rename_configuration_file<A: Airframe>(
        &self,
        config: &mut Configuration<A>,
        old_handle: Option<&str>,
    ) -> Result<()> {
        if let Some(old) = old_handle {
            self.records.borrow_mut().remove(&(A::KIND, old.to_string()));
        }
        config.filename = None;
        self.save_configuration_file(config)
    }
}
