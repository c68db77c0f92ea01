//! Navigation points (steerpoints on the F-16, waypoints on the A-10)

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AvionicsSystem, write_section};
use crate::error::MergeError;
use crate::mission::{Mission, MissionWaypoint};

const SECTION: &str = "NAV";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navpoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_ft: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavpointSystem {
    #[serde(default)]
    pub points: Vec<Navpoint>,
}

impl AvionicsSystem for NavpointSystem {
    fn is_default(&self) -> bool {
        self.points.is_empty()
    }

    fn reset(&mut self) {
        self.points.clear();
    }

    fn merge_into_sim_dtc(&self, data: Value) -> Result<Value, MergeError> {
        let points = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                json!({
                    "number": i + 1,
                    "name": p.name,
                    "lat": p.latitude,
                    "lon": p.longitude,
                    "alt": p.altitude_ft,
                })
            })
            .collect();
        write_section(data, SECTION, "points", Value::Array(points))
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
        target.waypoints = self
            .points
            .iter()
            .map(|p| MissionWaypoint {
                name: p.name.clone(),
                latitude: p.latitude,
                longitude: p.longitude,
                altitude_ft: p.altitude_ft,
            })
            .collect();
        Ok(mission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airframe::AirframeKind;

    fn points() -> NavpointSystem {
        NavpointSystem {
            points: vec![
                Navpoint { name: "IP".to_string(), latitude: 42.1, longitude: 41.9, altitude_ft: 15000 },
                Navpoint { name: "TGT".to_string(), latitude: 42.3, longitude: 42.0, altitude_ft: 0 },
            ],
        }
    }

    #[test]
    fn test_merge_numbers_points_from_one() {
        let data = points().merge_into_sim_dtc(json!({})).unwrap();
        assert_eq!(data["NAV"]["points"][0]["number"], 1);
        assert_eq!(data["NAV"]["points"][1]["name"], "TGT");
    }

    #[test]
    fn test_merge_into_mission_sets_flight_waypoints() {
        let mission = points()
            .merge_into_mission(Mission::skeleton(AirframeKind::F16C), 0, 0)
            .unwrap();
        let flight = &mission.packages[0].flights[0];
        assert_eq!(flight.waypoints.len(), 2);
        assert_eq!(flight.waypoints[0].altitude_ft, 15000);
    }

    #[test]
    fn test_merge_into_missing_flight_fails() {
        let err = points()
            .merge_into_mission(Mission::skeleton(AirframeKind::F16C), 0, 4)
            .unwrap_err();
        assert!(matches!(err, MergeError::System { .. }));
    }
}
