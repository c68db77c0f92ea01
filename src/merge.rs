//! Merge coordinator
//!
//! Folds the non-default systems of a configuration into a simulator data file
//! or into kneeboards. Both pipelines share one `MergeLock` so two merges never
//! interleave writes to shared temporary resources.

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::airframe::Airframe;
use crate::configuration::Configuration;
use crate::constants::merge::{DATA_FIELD, KNEEBOARD_TEMP_PREFIX, LOCK_TIMEOUT_MS, NAME_FIELD};
use crate::error::MergeError;
use crate::mission::Mission;
use crate::templates::{KneeboardGenerator, KneeboardRequest, TemplateSource};

/// Mutual exclusion between merge operations
///
/// Clones share the same lock. Acquisition waits a bounded time and reports
/// contention instead of blocking.
#[derive(Debug, Clone)]
pub struct MergeLock {
    inner: Arc<Mutex<()>>,
    timeout: Duration,
}

/// Held for the duration of a merge; dropping it releases the lock
#[derive(Debug)]
#[must_use = "the merge lock is released as soon as the guard is dropped"]
pub struct MergeGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Default for MergeLock {
    fn default() -> Self {
        Self::with_timeout(Duration::from_millis(LOCK_TIMEOUT_MS))
    }
}

impl MergeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(())), timeout }
    }

    /// Take the lock, waiting at most the configured timeout.
    /// A timeout is not fatal: the caller should retry later.
    pub fn acquire(&self) -> Result<MergeGuard<'_>, MergeError> {
        match self.inner.try_lock_for(self.timeout) {
            Some(guard) => Ok(MergeGuard { _guard: guard }),
            None => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "Merge lock busy");
                Err(MergeError::LockTimeout { timeout_ms })
            }
        }
    }

    pub fn release(guard: MergeGuard<'_>) {
        drop(guard);
    }
}

/// Result of a pipeline that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No output path configured; nothing was done
    Skipped,
    /// Files written by the pipeline
    Written(Vec<PathBuf>),
}

pub struct MergeCoordinator<T, G> {
    lock: MergeLock,
    templates: T,
    generator: G,
    /// Pilot name for flights no system filled
    callsign: String,
}

impl<T: TemplateSource, G: KneeboardGenerator> MergeCoordinator<T, G> {
    pub fn new(lock: MergeLock, templates: T, generator: G, callsign: impl Into<String>) -> Self {
        Self { lock, templates, generator, callsign: callsign.into() }
    }

    pub fn lock(&self) -> &MergeLock {
        &self.lock
    }

    /// Write the simulator data file for `config`
    pub fn save_merged_sim_dtc<A: Airframe>(
        &self,
        config: &Configuration<A>,
    ) -> Result<MergeOutcome, MergeError> {
        let Some(path) = config.export.dtc_output_path.as_deref() else {
            debug!(uid = %config.uid, "No DTC output path, skipping merge");
            return Ok(MergeOutcome::Skipped);
        };

        let guard = self.lock.acquire()?;
        let result = self.merge_sim_dtc(config, path);
        MergeLock::release(guard);

        match result {
            Ok(()) => {
                info!(uid = %config.uid, path = %path.display(), "Wrote merged DTC");
                Ok(MergeOutcome::Written(vec![path.to_path_buf()]))
            }
            Err(e) => {
                error!(uid = %config.uid, path = %path.display(), error = %e, "DTC merge failed");
                Err(e)
            }
        }
    }

    /// Build the merged document for `config` without writing it
    pub fn build_sim_dtc<A: Airframe>(
        &self,
        config: &Configuration<A>,
        name: &str,
    ) -> Result<Value, MergeError> {
        let template = &config.export.dtc_template;
        let text = self
            .templates
            .load_dtc_template(A::KIND, template)
            .map_err(|e| MergeError::Template { template: template.clone(), reason: format!("{e:#}") })?;
        let mut doc: Value = serde_json::from_str(&text).map_err(|e| MergeError::TemplateParse {
            template: template.clone(),
            reason: e.to_string(),
        })?;

        let root = doc
            .as_object_mut()
            .ok_or_else(|| MergeError::MalformedDocument { field: "document".to_string() })?;
        root.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));

        let mut data = match root.remove(DATA_FIELD) {
            Some(data @ Value::Object(_)) => data,
            _ => return Err(MergeError::MalformedDocument { field: DATA_FIELD.to_string() }),
        };

        for tag in A::MERGEABLE_TAGS {
            let system = config.system(*tag);
            if !config.export.merged_tags.contains(tag) || system.is_default() {
                continue;
            }
            debug!(tag = %tag, "Merging system into DTC");
            data = system.merge_into_sim_dtc(data)?;
        }

        let data_root = data
            .as_object_mut()
            .ok_or_else(|| MergeError::MalformedDocument { field: DATA_FIELD.to_string() })?;
        data_root.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));
        root.insert(DATA_FIELD.to_string(), data);

        Ok(doc)
    }

    fn merge_sim_dtc<A: Airframe>(&self, config: &Configuration<A>, path: &Path) -> Result<(), MergeError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.name.clone());
        let doc = self.build_sim_dtc(config, &name)?;
        let text = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Generate kneeboards for `config`
    pub fn save_merged_kboards<A: Airframe>(
        &self,
        config: &Configuration<A>,
    ) -> Result<MergeOutcome, MergeError> {
        let Some(path) = config.export.kneeboard_output_path.as_deref() else {
            debug!(uid = %config.uid, "No kneeboard output path, skipping merge");
            return Ok(MergeOutcome::Skipped);
        };

        let guard = self.lock.acquire()?;
        let result = self.merge_kboards(config, path);
        MergeLock::release(guard);

        match result {
            Ok(produced) => {
                for file in &produced {
                    info!(uid = %config.uid, path = %file.display(), "Generated kneeboard");
                }
                Ok(MergeOutcome::Written(produced))
            }
            Err(e) => {
                error!(uid = %config.uid, path = %path.display(), error = %e, "Kneeboard merge failed");
                Err(e)
            }
        }
    }

    /// Mission plan with every non-default mergeable system folded in
    pub fn build_mission<A: Airframe>(&self, config: &Configuration<A>) -> Result<Mission, MergeError> {
        let mut mission = Mission::skeleton(A::KIND);
        for tag in A::MERGEABLE_TAGS {
            let system = config.system(*tag);
            if system.is_default() {
                continue;
            }
            debug!(tag = %tag, "Merging system into mission");
            mission = system.merge_into_mission(mission, 0, 0)?;
        }
        mission.fill_empty_flights(&self.callsign);
        Ok(mission)
    }

    fn merge_kboards<A: Airframe>(
        &self,
        config: &Configuration<A>,
        path: &Path,
    ) -> Result<Vec<PathBuf>, MergeError> {
        let mission = self.build_mission(config)?;

        let template = &config.export.kneeboard_template;
        let template_dir = tempfile::Builder::new().prefix(KNEEBOARD_TEMP_PREFIX).tempdir()?;
        let extracted = self
            .templates
            .extract_kneeboard_package(A::KIND, template, &config.export.kneeboard_filter, template_dir.path())
            .map_err(|e| MergeError::Template { template: template.clone(), reason: format!("{e:#}") })?;
        if extracted.is_empty() {
            return Err(MergeError::NoTemplates { template: template.clone() });
        }
        debug!(count = extracted.len(), dir = %template_dir.path().display(), "Extracted kneeboard templates");

        let request = KneeboardRequest {
            template_dir: template_dir.path(),
            output_path: path,
            mission: &mission,
            night_mode: config.export.night_mode,
            vector_mode: config.export.vector_mode,
        };
        self.generator
            .generate(&request)
            .map_err(|e| MergeError::Generator { reason: format!("{e:#}") })
    }
}
