//! A-10C Warthog

use serde::{Deserialize, Serialize};

use crate::airframe::{Airframe, AirframeKind, system_tags};
use crate::systems::{AvionicsSystem, NavpointSystem, RadioSystem, SystemSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct A10C;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum A10CTag {
    #[serde(rename = "RADIO")]
    Radio,
    #[serde(rename = "WYPT")]
    Waypoints,
}

system_tags!(A10CTag {
    Radio => "RADIO",
    Waypoints => "WYPT",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct A10CSystems {
    #[serde(default)]
    pub radio: RadioSystem,
    #[serde(default)]
    pub waypoints: NavpointSystem,
}

impl SystemSet for A10CSystems {
    type Tag = A10CTag;

    fn system(&self, tag: A10CTag) -> &dyn AvionicsSystem {
        match tag {
            A10CTag::Radio => &self.radio,
            A10CTag::Waypoints => &self.waypoints,
        }
    }

    fn system_mut(&mut self, tag: A10CTag) -> &mut dyn AvionicsSystem {
        match tag {
            A10CTag::Radio => &mut self.radio,
            A10CTag::Waypoints => &mut self.waypoints,
        }
    }

    fn copy_system(&mut self, tag: A10CTag, from: &Self) {
        match tag {
            A10CTag::Radio => self.radio = from.radio.clone(),
            A10CTag::Waypoints => self.waypoints = from.waypoints.clone(),
        }
    }

    fn system_eq(&self, tag: A10CTag, other: &Self) -> bool {
        match tag {
            A10CTag::Radio => self.radio == other.radio,
            A10CTag::Waypoints => self.waypoints == other.waypoints,
        }
    }
}

impl Airframe for A10C {
    const KIND: AirframeKind = AirframeKind::A10C;

    type Tag = A10CTag;
    type Systems = A10CSystems;

    const MERGEABLE_TAGS: &'static [A10CTag] = &[A10CTag::Radio, A10CTag::Waypoints];
}
