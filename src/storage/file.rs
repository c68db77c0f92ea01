//! JSON file storage

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ConfigStorage;
use crate::airframe::{Airframe, AirframeKind};
use crate::configuration::Configuration;
use crate::constants::config::RECORD_EXTENSION;

/// Stores records as `<root>/<airframe>/<handle>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn airframe_dir(&self, kind: AirframeKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn record_path(&self, kind: AirframeKind, handle: &str) -> PathBuf {
        self.airframe_dir(kind).join(handle)
    }

    /// Pick a handle derived from `name` that no other record uses
    fn free_handle(&self, kind: AirframeKind, name: &str) -> String {
        let stem = slug(name);
        let mut handle = format!("{stem}.{RECORD_EXTENSION}");
        let mut n = 2;
        while self.record_path(kind, &handle).exists() {
            handle = format!("{stem}-{n}.{RECORD_EXTENSION}");
            n += 1;
        }
        handle
    }

    fn write_record<A: Airframe>(&self, config: &Configuration<A>, handle: &str) -> Result<()> {
        let dir = self.airframe_dir(A::KIND);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {:?}", dir))?;

        let path = dir.join(handle);
        let json = config
            .to_json()
            .with_context(|| format!("Failed to serialize configuration '{}'", config.name))?;
        fs::write(&path, json).with_context(|| format!("Failed to write configuration to {:?}", path))
    }
}

impl ConfigStorage for FileStorage {
    fn load_configuration_files<A: Airframe>(&self) -> Result<BTreeMap<String, Configuration<A>>> {
        let dir = self.airframe_dir(A::KIND);
        let mut records = BTreeMap::new();
        if !dir.exists() {
            info!(path = ?dir, "No configurations stored yet");
            return Ok(records);
        }

        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to read {:?}", dir))? {
            let path = entry?.path();
            if !is_record(&path) {
                continue;
            }
            let Some(handle) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable configuration");
                    continue;
                }
            };
            if let Some(mut config) = Configuration::<A>::from_json(&text) {
                config.filename = Some(handle.clone());
                records.insert(handle, config);
            } else {
                warn!(path = ?path, "Skipping malformed configuration");
            }
        }

        info!(airframe = %A::KIND, count = records.len(), "Loaded configuration records");
        Ok(records)
    }

    fn save_configuration_file<A: Airframe>(&self, config: &mut Configuration<A>) -> Result<()> {
        let handle = match &config.filename {
            Some(handle) => handle.clone(),
            None => self.free_handle(A::KIND, &config.name),
        };
        // The handle is only adopted once the record exists on disk
        self.write_record(config, &handle)?;
        config.filename = Some(handle);
        debug!(uid = %config.uid, file = ?config.filename, "Wrote configuration record");
        Ok(())
    }

    fn delete_configuration_file<A: Airframe>(&self, config: &Configuration<A>) -> Result<()> {
        let Some(handle) = &config.filename else {
            return Ok(());
        };
        let path = self.record_path(A::KIND, handle);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
        }
        Ok(())
    }

    fn rename_configuration_file<A: Airframe>(
        &self,
        config: &mut Configuration<A>,
        old_handle: Option<&str>,
    ) -> Result<()> {
        let wanted = format!("{}.{RECORD_EXTENSION}", slug(&config.name));
        let handle = if old_handle == Some(wanted.as_str()) {
            wanted
        } else {
            self.free_handle(A::KIND, &config.name)
        };
        self.write_record(config, &handle)?;

        if let Some(old) = old_handle.filter(|old| *old != handle) {
            let old_path = self.record_path(A::KIND, old);
            if old_path.exists() {
                if let Err(e) = fs::remove_file(&old_path) {
                    // Never leave two records holding one UID
                    let new_path = self.record_path(A::KIND, &handle);
                    if let Err(cleanup) = fs::remove_file(&new_path) {
                        warn!(path = ?new_path, error = %cleanup, "Failed to remove new record after failed rename");
                    }
                    return Err(e).with_context(|| format!("Failed to remove old record {:?}", old_path));
                }
            }
        }
        config.filename = Some(handle);
        Ok(())
    }
}

fn is_record(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
}

/// Lowercase ASCII file stem for a configuration name
fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-').to_string();
    if out.is_empty() { "config".to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airframes::{A10C, F16C};

    #[test]
    fn test_slug() {
        assert_eq!(slug("Strike Package #2"), "strike-package-2");
        assert_eq!(slug("  ***  "), "config");
        assert_eq!(slug("CAP"), "cap");
    }

    #[test]
    fn test_save_assigns_handle_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut config = Configuration::<F16C>::factory("Strike One");
        storage.save_configuration_file(&mut config).unwrap();
        assert_eq!(config.filename.as_deref(), Some("strike-one.json"));

        let loaded = storage.load_configuration_files::<F16C>().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["strike-one.json"].uid, config.uid);
        assert_eq!(loaded["strike-one.json"].filename.as_deref(), Some("strike-one.json"));
    }

    #[test]
    fn test_same_name_gets_distinct_handles() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut a = Configuration::<F16C>::factory("CAP");
        let mut b = Configuration::<F16C>::factory("cap");
        storage.save_configuration_file(&mut a).unwrap();
        storage.save_configuration_file(&mut b).unwrap();
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn test_airframes_are_kept_apart_and_malformed_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.save_configuration_file(&mut Configuration::<F16C>::factory("Viper")).unwrap();
        storage.save_configuration_file(&mut Configuration::<A10C>::factory("Hog")).unwrap();
        fs::write(storage.airframe_dir(AirframeKind::F16C).join("broken.json"), "{").unwrap();

        let vipers = storage.load_configuration_files::<F16C>().unwrap();
        assert_eq!(vipers.len(), 1);
        assert_eq!(vipers.values().next().unwrap().name, "Viper");
    }

    #[test]
    fn test_rename_moves_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut config = Configuration::<F16C>::factory("Old Name");
        storage.save_configuration_file(&mut config).unwrap();
        let old = config.filename.clone();

        config.name = "New Name".to_string();
        storage.rename_configuration_file(&mut config, old.as_deref()).unwrap();

        assert_eq!(config.filename.as_deref(), Some("new-name.json"));
        let loaded = storage.load_configuration_files::<F16C>().unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["new-name.json"]);
    }

    #[test]
    fn test_rename_to_same_slug_keeps_handle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut config = Configuration::<F16C>::factory("cap");
        storage.save_configuration_file(&mut config).unwrap();
        let old = config.filename.clone();

        config.name = "CAP".to_string();
        storage.rename_configuration_file(&mut config, old.as_deref()).unwrap();

        assert_eq!(config.filename, old);
        let loaded = storage.load_configuration_files::<F16C>().unwrap();
        assert_eq!(loaded["cap.json"].name, "CAP");
    }

    #[test]
    fn test_failed_rename_leaves_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        // A directory under the old handle makes removing it fail
        fs::create_dir_all(storage.airframe_dir(AirframeKind::F16C).join("stuck.json")).unwrap();

        let mut config = Configuration::<F16C>::factory("Fresh");
        config.filename = Some("stuck.json".to_string());
        assert!(storage.rename_configuration_file(&mut config, Some("stuck.json")).is_err());

        assert_eq!(config.filename.as_deref(), Some("stuck.json"));
        assert!(!storage.airframe_dir(AirframeKind::F16C).join("fresh.json").exists());
        assert!(storage.load_configuration_files::<F16C>().unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut config = Configuration::<F16C>::factory("Gone");
        storage.save_configuration_file(&mut config).unwrap();
        storage.delete_configuration_file(&config).unwrap();

        assert!(storage.load_configuration_files::<F16C>().unwrap().is_empty());
    }
}
