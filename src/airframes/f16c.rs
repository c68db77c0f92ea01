//! F-16C Viper

use serde::{Deserialize, Serialize};

use crate::airframe::{Airframe, AirframeKind, system_tags};
use crate::systems::{AvionicsSystem, DatalinkSystem, NavpointSystem, RadioSystem, SystemSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct F16C;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum F16CTag {
    #[serde(rename = "RADIO")]
    Radio,
    #[serde(rename = "STPT")]
    Steerpoints,
    #[serde(rename = "DLNK")]
    Datalink,
}

system_tags!(F16CTag {
    Radio => "RADIO",
    Steerpoints => "STPT",
    Datalink => "DLNK",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct F16CSystems {
    #[serde(default)]
    pub radio: RadioSystem,
    #[serde(default)]
    pub steerpoints: NavpointSystem,
    #[serde(default)]
    pub datalink: DatalinkSystem,
}

impl SystemSet for F16CSystems {
    type Tag = F16CTag;

    fn system(&self, tag: F16CTag) -> &dyn AvionicsSystem {
        match tag {
            F16CTag::Radio => &self.radio,
            F16CTag::Steerpoints => &self.steerpoints,
            F16CTag::Datalink => &self.datalink,
        }
    }

    fn system_mut(&mut self, tag: F16CTag) -> &mut dyn AvionicsSystem {
        match tag {
            F16CTag::Radio => &mut self.radio,
            F16CTag::Steerpoints => &mut self.steerpoints,
            F16CTag::Datalink => &mut self.datalink,
        }
    }

    fn copy_system(&mut self, tag: F16CTag, from: &Self) {
        match tag {
            F16CTag::Radio => self.radio = from.radio.clone(),
            F16CTag::Steerpoints => self.steerpoints = from.steerpoints.clone(),
            F16CTag::Datalink => self.datalink = from.datalink.clone(),
        }
    }

    fn system_eq(&self, tag: F16CTag, other: &Self) -> bool {
        match tag {
            F16CTag::Radio => self.radio == other.radio,
            F16CTag::Steerpoints => self.steerpoints == other.steerpoints,
            F16CTag::Datalink => self.datalink == other.datalink,
        }
    }
}

impl Airframe for F16C {
    const KIND: AirframeKind = AirframeKind::F16C;

    type Tag = F16CTag;
    type Systems = F16CSystems;

    const MERGEABLE_TAGS: &'static [F16CTag] =
        &[F16CTag::Radio, F16CTag::Steerpoints, F16CTag::Datalink];
}
