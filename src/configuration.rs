//! Configuration: all systems of one airframe plus identity and link metadata
//!
//! A configuration is identified by its UID. The link map records, per system
//! tag, the UID of the configuration whose system this one mirrors; a tag that
//! is absent from the map is owned by this configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::airframe::{Airframe, AirframeKind, SystemTag};
use crate::constants::defaults;
use crate::error::{ConfigError, Result};
use crate::storage::ConfigStorage;
use crate::systems::{AvionicsSystem, SystemSet};

/// Where and how a configuration is merged into output artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound = "")]
pub struct ExportSettings<T: SystemTag> {
    /// Simulator data file to write; `None` disables the simulator merge
    pub dtc_output_path: Option<PathBuf>,
    pub dtc_template: String,
    /// Tags the simulator template declares as merged
    pub merged_tags: BTreeSet<T>,

    /// Kneeboard output directory; `None` disables the kneeboard merge
    pub kneeboard_output_path: Option<PathBuf>,
    pub kneeboard_template: String,
    /// Kneeboard identifiers to generate (empty = every kneeboard in the package)
    pub kneeboard_filter: Vec<String>,
    pub night_mode: bool,
    pub vector_mode: bool,
}

impl<T: SystemTag> Default for ExportSettings<T> {
    fn default() -> Self {
        Self {
            dtc_output_path: None,
            dtc_template: defaults::DTC_TEMPLATE.to_string(),
            merged_tags: T::ALL.iter().copied().collect(),
            kneeboard_output_path: None,
            kneeboard_template: defaults::KNEEBOARD_TEMPLATE.to_string(),
            kneeboard_filter: Vec::new(),
            night_mode: false,
            vector_mode: false,
        }
    }
}

/// Editor scratch state, never persisted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub selected_page: Option<String>,
    pub scroll_offset: f32,
    /// Set by any change not yet written to storage
    pub dirty: bool,
}

/// Emitted by every successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent<T: SystemTag> {
    pub uid: String,
    /// Opaque identifier of whoever requested the save
    pub invoked_by: Option<String>,
    /// System whose value must be pushed to linked configurations
    pub sync_tag: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Configuration<A: Airframe> {
    /// Empty until assigned; an empty UID never belongs to a store
    #[serde(default)]
    pub uid: String,
    pub airframe: AirframeKind,
    pub name: String,
    /// Storage handle, `None` until first persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub linked_sys_map: BTreeMap<A::Tag, String>,
    #[serde(default)]
    pub last_system_edited: Option<A::Tag>,
    #[serde(default)]
    pub export: ExportSettings<A::Tag>,
    #[serde(default)]
    pub systems: A::Systems,
    #[serde(skip)]
    pub ui_state: UiState,
}

impl<A: Airframe> Configuration<A> {
    /// Fresh configuration with default systems and a new identity
    pub fn factory(name: &str) -> Self {
        let mut config = Self {
            uid: String::new(),
            airframe: A::KIND,
            name: name.to_string(),
            filename: None,
            is_favorite: false,
            linked_sys_map: BTreeMap::new(),
            last_system_edited: None,
            export: ExportSettings::default(),
            systems: A::Systems::default(),
            ui_state: UiState::default(),
        };
        config.reset_uid();
        config
    }

    /// Parse a stored record; malformed records and records of another
    /// airframe are logged and yield `None`
    pub fn from_json(text: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(text) {
            Ok(config) if config.airframe == A::KIND => Some(config),
            Ok(config) => {
                error!(expected = %A::KIND, found = %config.airframe, name = %config.name, "Configuration belongs to another airframe");
                None
            }
            Err(e) => {
                error!(airframe = %A::KIND, error = %e, "Failed to parse configuration");
                None
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn has_uid(&self) -> bool {
        !self.uid.is_empty()
    }

    /// Assign a new, globally distinct identity
    pub fn reset_uid(&mut self) {
        self.uid = Uuid::new_v4().to_string();
    }

    /// Strip everything tying this configuration to the local machine before
    /// export. Without `reset_uid` the result has no identity and cannot join a store.
    pub fn sanitize(&mut self, reset_uid: bool) {
        self.uid.clear();
        self.filename = None;
        self.is_favorite = false;
        self.unlink_system(None);
        if reset_uid {
            self.reset_uid();
        }
    }

    pub fn system(&self, tag: A::Tag) -> &dyn AvionicsSystem {
        self.systems.system(tag)
    }

    pub fn system_mut(&mut self, tag: A::Tag) -> &mut dyn AvionicsSystem {
        self.last_system_edited = Some(tag);
        self.mark_updated();
        self.systems.system_mut(tag)
    }

    /// True iff every system is at factory defaults
    pub fn is_default(&self) -> bool {
        self.systems.is_default()
    }

    pub fn reset_system(&mut self, tag: A::Tag) {
        self.systems.system_mut(tag).reset();
        self.mark_updated();
    }

    pub fn is_linked(&self, tag: A::Tag) -> bool {
        self.linked_sys_map.contains_key(&tag)
    }

    pub fn linked_uid(&self, tag: A::Tag) -> Option<&str> {
        self.linked_sys_map.get(&tag).map(String::as_str)
    }

    /// Mirror `target`'s system for `tag`: records the link and copies the
    /// current value
    pub fn link_system_to(&mut self, tag: A::Tag, target: &Configuration<A>) -> Result<()> {
        if target.uid == self.uid {
            return Err(ConfigError::SelfLink { uid: self.uid.clone(), tag: tag.to_string() });
        }
        if !target.has_uid() {
            return Err(ConfigError::MissingIdentity);
        }

        self.linked_sys_map.insert(tag, target.uid.clone());
        self.systems.copy_system(tag, &target.systems);
        self.mark_updated();
        info!(uid = %self.uid, tag = %tag, target = %target.uid, "Linked system");
        Ok(())
    }

    /// Remove the link for `tag`, or every link when `tag` is `None`.
    /// The current system values stay in place.
    pub fn unlink_system(&mut self, tag: Option<A::Tag>) {
        match tag {
            Some(tag) => {
                if self.linked_sys_map.remove(&tag).is_some() {
                    debug!(uid = %self.uid, tag = %tag, "Unlinked system");
                }
            }
            None => {
                if !self.linked_sys_map.is_empty() {
                    debug!(uid = %self.uid, count = self.linked_sys_map.len(), "Unlinked all systems");
                }
                self.linked_sys_map.clear();
            }
        }
        self.mark_updated();
    }

    pub fn mark_updated(&mut self) {
        self.ui_state.dirty = true;
    }

    /// Persist this configuration and describe the save for observers
    pub fn save<S: ConfigStorage>(
        &mut self,
        storage: &S,
        invoked_by: Option<&str>,
        sync_tag: Option<A::Tag>,
    ) -> Result<SaveEvent<A::Tag>> {
        if !self.has_uid() {
            return Err(ConfigError::MissingIdentity);
        }
        if let Some(tag) = sync_tag {
            self.last_system_edited = Some(tag);
        }

        storage.save_configuration_file(self)?;
        self.ui_state.dirty = false;
        debug!(uid = %self.uid, name = %self.name, sync = ?sync_tag, "Saved configuration");

        Ok(SaveEvent {
            uid: self.uid.clone(),
            invoked_by: invoked_by.map(str::to_string),
            sync_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airframes::{A10C, F16C, F16CTag};
    use crate::storage::memory::MemoryStorage;
    use crate::systems::RadioPreset;

    fn with_radio(name: &str, frequency_mhz: f64) -> Configuration<F16C> {
        let mut config = Configuration::<F16C>::factory(name);
        config.systems.radio.primary.push(RadioPreset {
            channel: 1,
            frequency_mhz,
            description: String::new(),
        });
        config
    }

    #[test]
    fn test_factory_assigns_identity_and_defaults() {
        let config = Configuration::<F16C>::factory("Alpha");
        assert!(config.has_uid());
        assert_eq!(config.airframe, AirframeKind::F16C);
        assert!(config.is_default());
        assert!(config.filename.is_none());
        assert_eq!(config.export.merged_tags.len(), 3);
    }

    #[test]
    fn test_reset_uid_changes_identity() {
        let mut config = Configuration::<F16C>::factory("Alpha");
        let before = config.uid.clone();
        config.reset_uid();
        assert_ne!(config.uid, before);
        assert!(Uuid::parse_str(&config.uid).is_ok());
    }

    #[test]
    fn test_sanitize_clears_identity_and_links() {
        let source = with_radio("Source", 251.0);
        let mut config = Configuration::<F16C>::factory("Alpha");
        config.link_system_to(F16CTag::Radio, &source).unwrap();
        config.filename = Some("alpha.json".to_string());
        config.is_favorite = true;

        config.sanitize(false);
        assert!(!config.has_uid());
        assert!(config.filename.is_none());
        assert!(!config.is_favorite);
        assert!(config.linked_sys_map.is_empty());
        // Linked values are kept, only the link is dropped
        assert_eq!(config.systems.radio, source.systems.radio);

        config.sanitize(true);
        assert!(config.has_uid());
    }

    #[test]
    fn test_link_copies_value_not_reference() {
        let mut source = with_radio("Source", 251.0);
        let mut config = Configuration::<F16C>::factory("Alpha");

        config.link_system_to(F16CTag::Radio, &source).unwrap();
        assert_eq!(config.linked_uid(F16CTag::Radio), Some(source.uid.as_str()));
        assert!(config.ui_state.dirty);

        source.systems.radio.primary[0].frequency_mhz = 305.0;
        assert_eq!(config.systems.radio.primary[0].frequency_mhz, 251.0);
    }

    #[test]
    fn test_link_to_self_rejected() {
        let mut config = with_radio("Alpha", 251.0);
        let same = config.clone();
        let err = config.link_system_to(F16CTag::Radio, &same).unwrap_err();
        assert!(matches!(err, ConfigError::SelfLink { .. }));
        assert!(!config.is_linked(F16CTag::Radio));
    }

    #[test]
    fn test_unlink_one_or_all() {
        let source = with_radio("Source", 251.0);
        let mut config = Configuration::<F16C>::factory("Alpha");
        config.link_system_to(F16CTag::Radio, &source).unwrap();
        config.link_system_to(F16CTag::Steerpoints, &source).unwrap();

        config.unlink_system(Some(F16CTag::Radio));
        assert!(!config.is_linked(F16CTag::Radio));
        assert!(config.is_linked(F16CTag::Steerpoints));

        config.unlink_system(None);
        assert!(config.linked_sys_map.is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_links_and_drops_ui_state() {
        let source = with_radio("Source", 251.0);
        let mut config = Configuration::<F16C>::factory("Alpha");
        config.link_system_to(F16CTag::Radio, &source).unwrap();
        config.ui_state.selected_page = Some("radio".to_string());

        let text = config.to_json().unwrap();
        assert!(text.contains("\"RADIO\""));

        let parsed = Configuration::<F16C>::from_json(&text).unwrap();
        assert_eq!(parsed.uid, config.uid);
        assert_eq!(parsed.linked_sys_map, config.linked_sys_map);
        assert_eq!(parsed.systems, config.systems);
        assert_eq!(parsed.ui_state, UiState::default());
    }

    #[test]
    fn test_from_json_rejects_malformed_and_foreign() {
        assert!(Configuration::<F16C>::from_json("{ not json").is_none());

        let hog = Configuration::<A10C>::factory("Hog").to_json().unwrap();
        assert!(Configuration::<F16C>::from_json(&hog).is_none());
    }

    #[test]
    fn test_from_json_rejects_tag_of_other_airframe() {
        let text = r#"{ "uid": "u1", "airframe": "A10C", "name": "Hog",
                        "linked_sys_map": { "STPT": "u2" } }"#;
        assert!(Configuration::<A10C>::from_json(text).is_none());
    }

    #[test]
    fn test_save_requires_identity_and_clears_dirty() {
        let storage = MemoryStorage::new();
        let mut config = Configuration::<F16C>::factory("Alpha");
        config.mark_updated();

        let event = config.save(&storage, Some("radio-page"), Some(F16CTag::Radio)).unwrap();
        assert_eq!(event.uid, config.uid);
        assert_eq!(event.invoked_by.as_deref(), Some("radio-page"));
        assert_eq!(event.sync_tag, Some(F16CTag::Radio));
        assert_eq!(config.last_system_edited, Some(F16CTag::Radio));
        assert!(!config.ui_state.dirty);
        assert_eq!(storage.save_count(&config.uid), 1);

        config.sanitize(false);
        assert!(matches!(config.save(&storage, None, None), Err(ConfigError::MissingIdentity)));
    }
}
