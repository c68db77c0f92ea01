//! Avionics systems and the per-airframe system registry
//!
//! A system is one subsystem's settings (radio presets, navigation points, ...).
//! The core never looks inside a system: it only asks whether it is at factory
//! defaults, resets it, copies it between configurations and lets it fold itself
//! into a merge artifact.

pub mod datalink;
pub mod navpoints;
pub mod radio;

pub use datalink::DatalinkSystem;
pub use navpoints::{Navpoint, NavpointSystem};
pub use radio::{RadioPreset, RadioSystem};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

use crate::airframe::SystemTag;
use crate::error::MergeError;
use crate::mission::Mission;

/// Behaviour every system provides to the configuration core
///
/// Both merge hooks take their target by value and hand back the value the
/// caller continues with. The defaults return the target untouched, which is
/// also what a system with nothing to contribute must do.
pub trait AvionicsSystem: Debug {
    /// True iff every field equals its factory default
    fn is_default(&self) -> bool;

    /// Restore factory defaults
    fn reset(&mut self);

    /// Fold this system into the `data` subtree of a simulator document
    fn merge_into_sim_dtc(&self, data: Value) -> Result<Value, MergeError> {
        Ok(data)
    }

    /// Fold this system into flight `flight` of package `package`
    fn merge_into_mission(
        &self,
        mission: Mission,
        _package: usize,
        _flight: usize,
    ) -> Result<Mission, MergeError> {
        Ok(mission)
    }
}

/// All systems of one airframe, addressable by tag
pub trait SystemSet: Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned {
    type Tag: SystemTag;

    fn system(&self, tag: Self::Tag) -> &dyn AvionicsSystem;

    fn system_mut(&mut self, tag: Self::Tag) -> &mut dyn AvionicsSystem;

    /// Replace the system for `tag` with a value copy of `from`'s
    fn copy_system(&mut self, tag: Self::Tag, from: &Self);

    /// True iff the systems for `tag` hold equal values
    fn system_eq(&self, tag: Self::Tag, other: &Self) -> bool;

    fn is_default(&self) -> bool {
        Self::Tag::ALL.iter().all(|tag| self.system(*tag).is_default())
    }
}

/// Writes `value` at `data[section][key]`, creating `section` when missing
pub(crate) fn write_section(
    mut data: Value,
    section: &str,
    key: &str,
    value: Value,
) -> Result<Value, MergeError> {
    let root = data.as_object_mut().ok_or_else(|| MergeError::MalformedDocument {
        field: crate::constants::merge::DATA_FIELD.to_string(),
    })?;
    let entry = root
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    let object = entry.as_object_mut().ok_or_else(|| MergeError::MalformedDocument {
        field: section.to_string(),
    })?;
    object.insert(key.to_string(), value);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_section_creates_missing_section() {
        let data = write_section(json!({ "name": "x" }), "COMM", "COMM1", json!([1, 2])).unwrap();
        assert_eq!(data, json!({ "name": "x", "COMM": { "COMM1": [1, 2] } }));
    }

    #[test]
    fn test_write_section_keeps_sibling_keys() {
        let data = json!({ "COMM": { "COMM2": "keep" } });
        let data = write_section(data, "COMM", "COMM1", json!("new")).unwrap();
        assert_eq!(data["COMM"]["COMM2"], "keep");
        assert_eq!(data["COMM"]["COMM1"], "new");
    }

    #[test]
    fn test_write_section_rejects_non_object() {
        let err = write_section(json!([1]), "COMM", "COMM1", json!(null)).unwrap_err();
        assert!(matches!(err, MergeError::MalformedDocument { .. }));

        let err = write_section(json!({ "COMM": 3 }), "COMM", "COMM1", json!(null)).unwrap_err();
        assert!(matches!(err, MergeError::MalformedDocument { field } if field == "COMM"));
    }
}
