//! Airframe and system tag definitions
//!
//! Every airframe has a closed set of system tags. Configurations, link maps and
//! merge lists are typed by the airframe's tag enum, so a tag that does not exist
//! on an airframe cannot be linked, merged or looked up.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use crate::systems::SystemSet;

/// Runtime identifier of an airframe (stored in every configuration record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AirframeKind {
    F16C,
    A10C,
}

impl AirframeKind {
    pub const ALL: &'static [AirframeKind] = &[AirframeKind::F16C, AirframeKind::A10C];

    /// Short lowercase name, also used as the storage and template directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            AirframeKind::F16C => "f16c",
            AirframeKind::A10C => "a10c",
        }
    }
}

impl Display for AirframeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for AirframeKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AirframeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.dir_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Name that does not parse as an airframe or as one of an airframe's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown name '{}'", self.0)
    }
}

impl std::error::Error for UnknownName {}

/// Tag addressing one system inside a configuration of a given airframe
pub trait SystemTag:
    Copy + Eq + Ord + Hash + Debug + Display + FromStr<Err = UnknownName> + Serialize + DeserializeOwned + 'static
{
    /// Every tag of the airframe, in declaration order
    const ALL: &'static [Self];
}

/// Static description of an airframe: its tag enum, its system set and which
/// systems take part in merges.
pub trait Airframe: Debug + Clone + Copy + PartialEq + Default + 'static {
    const KIND: AirframeKind;

    type Tag: SystemTag;
    type Systems: SystemSet<Tag = Self::Tag>;

    /// Systems eligible for merging, in merge order
    const MERGEABLE_TAGS: &'static [Self::Tag];
}

/// Implements `Display`/`FromStr` for a tag enum from its wire names
macro_rules! system_tags {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::airframe::SystemTag for $ty {
            const ALL: &'static [Self] = &[$($ty::$variant),+];
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $name),+
                })
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::airframe::UnknownName;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err($crate::airframe::UnknownName(s.to_string())),
                }
            }
        }
    };
}

pub(crate) use system_tags;
