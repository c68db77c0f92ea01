//! Radio presets

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AvionicsSystem, write_section};
use crate::error::MergeError;

/// Radio section of a simulator document
const SECTION: &str = "COMM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioPreset {
    pub channel: u32,
    pub frequency_mhz: f64,
    #[serde(default)]
    pub description: String,
}

/// Preset lists for the primary and auxiliary radio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadioSystem {
    #[serde(default)]
    pub primary: Vec<RadioPreset>,
    #[serde(default)]
    pub auxiliary: Vec<RadioPreset>,
}

impl RadioSystem {
    fn channels(presets: &[RadioPreset]) -> Value {
        Value::Array(
            presets
                .iter()
                .map(|p| {
                    json!({
                        "channel": p.channel,
                        "frequency": p.frequency_mhz,
                        "name": p.description,
                    })
                })
                .collect(),
        )
    }
}

impl AvionicsSystem for RadioSystem {
    fn is_default(&self) -> bool {
        self.primary.is_empty() && self.auxiliary.is_empty()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn merge_into_sim_dtc(&self, data: Value) -> Result<Value, MergeError> {
        let mut data = data;
        if !self.primary.is_empty() {
            data = write_section(data, SECTION, "COMM1", Self::channels(&self.primary))?;
        }
        if !self.auxiliary.is_empty() {
            data = write_section(data, SECTION, "COMM2", Self::channels(&self.auxiliary))?;
        }
        Ok(data)
    }
}
