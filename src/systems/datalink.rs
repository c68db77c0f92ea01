//! Flight datalink: ownship callsign and flight members

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AvionicsSystem, write_section};
use crate::error::MergeError;
use crate::mission::{Mission, Pilot};

const SECTION: &str = "DLNK";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatalinkSystem {
    /// Flight callsign, e.g. "Venom 1"
    #[serde(default)]
    pub flight_callsign: String,
    /// Members in flight position order (position 1 first)
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub ownship_position: u32,
}

impl AvionicsSystem for DatalinkSystem {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn merge_into_sim_dtc(&self, data: Value) -> Result<Value, MergeError> {
        let data = write_section(data, SECTION, "callsign", json!(self.flight_callsign))?;
        let data = write_section(data, SECTION, "ownship", json!(self.ownship_position))?;
        write_section(data, SECTION, "members", json!(self.members))
    }

    fn merge_into_mission(
        &self,
        mut mission: Mission,
        package: usize,
        flight: usize,
    ) -> Result<Mission, MergeError> {
        let Some(target) = mission.flight_mut(package, flight) else {
            return Err(MergeError::System {
                tag: SECTION.to_string(),
                reason: format!("mission has no flight {flight} in package {package}"),
            });
        };
        if !self.flight_callsign.is_empty() {
            target.name = self.flight_callsign.clone();
        }
        target.pilots = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| Pilot { name: name.clone(), position: i as u32 + 1 })
            .collect();
        Ok(mission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airframe::AirframeKind;

    #[test]
    fn test_merge_into_mission_assigns_positions() {
        let dlnk = DatalinkSystem {
            flight_callsign: "Venom 1".to_string(),
            members: vec!["Lead".to_string(), String::new(), "Three".to_string()],
            ownship_position: 1,
        };
        let mission = dlnk
            .merge_into_mission(Mission::skeleton(AirframeKind::F16C), 0, 0)
            .unwrap();
        let flight = &mission.packages[0].flights[0];

        assert_eq!(flight.name, "Venom 1");
        assert_eq!(
            flight.pilots,
            vec![
                Pilot { name: "Lead".to_string(), position: 1 },
                Pilot { name: "Three".to_string(), position: 3 },
            ]
        );
    }

    #[test]
    fn test_is_default_tracks_any_field() {
        let mut dlnk = DatalinkSystem::default();
        assert!(dlnk.is_default());
        dlnk.ownship_position = 2;
        assert!(!dlnk.is_default());
        dlnk.reset();
        assert!(dlnk.is_default());
    }
}
