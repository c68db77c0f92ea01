//! Mission plan consumed by the kneeboard generator
//!
//! Field names follow the generator's JSON format (PascalCase).

use serde::{Deserialize, Serialize};

use crate::airframe::AirframeKind;
use crate::constants::mission as defaults;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mission {
    pub name: String,
    pub theater: String,
    pub owner: Owner,
    #[serde(default)]
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub flights: Vec<Flight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Flight {
    pub name: String,
    pub aircraft: AirframeKind,
    #[serde(default)]
    pub pilots: Vec<Pilot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<MissionWaypoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pilot {
    pub name: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MissionWaypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: i32,
}

impl Mission {
    /// One package holding one flight of `aircraft` with no pilots
    pub fn skeleton(aircraft: AirframeKind) -> Self {
        Self {
            name: defaults::DEFAULT_NAME.to_string(),
            theater: defaults::DEFAULT_THEATER.to_string(),
            owner: Owner { name: defaults::DEFAULT_OWNER.to_string() },
            packages: vec![Package {
                name: defaults::DEFAULT_PACKAGE.to_string(),
                flights: vec![Flight {
                    name: defaults::DEFAULT_FLIGHT.to_string(),
                    aircraft,
                    pilots: Vec::new(),
                    waypoints: Vec::new(),
                }],
            }],
        }
    }

    pub fn flight_mut(&mut self, package: usize, flight: usize) -> Option<&mut Flight> {
        self.packages.get_mut(package)?.flights.get_mut(flight)
    }

    /// Give every pilot-less flight a single pilot at position 1
    pub fn fill_empty_flights(&mut self, callsign: &str) {
        for flight in self.packages.iter_mut().flat_map(|p| p.flights.iter_mut()) {
            if flight.pilots.is_empty() {
                flight.pilots.push(Pilot {
                    name: callsign.to_string(),
                    position: crate::constants::merge::DEFAULT_PILOT_POSITION,
                });
            }
        }
    }
}
