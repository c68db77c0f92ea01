//! Persistence of configuration records
//!
//! The core only needs four operations from storage. `FileStorage` keeps one
//! JSON file per configuration under a directory per airframe.

mod file;
#[cfg(test)]
pub(crate) mod memory;

pub use file::FileStorage;

use anyhow::Result;
use std::collections::BTreeMap;

use crate::airframe::Airframe;
use crate::configuration::Configuration;

pub trait ConfigStorage {
    /// Every readable record of airframe `A`, keyed by storage handle
    fn load_configuration_files<A: Airframe>(&self) -> Result<BTreeMap<String, Configuration<A>>>;

    /// Write `config`, assigning its storage handle on first save
    fn save_configuration_file<A: Airframe>(&self, config: &mut Configuration<A>) -> Result<()>;

    fn delete_configuration_file<A: Airframe>(&self, config: &Configuration<A>) -> Result<()>;

    /// Move the record stored under `old_handle` to a handle matching the
    /// configuration's current name
    fn rename_configuration_file<A: Airframe>(
        &self,
        config: &mut Configuration<A>,
        old_handle: Option<&str>,
    ) -> Result<()>;
}
