//! Avionics configuration core
//!
//! Configurations of one airframe live in a [`store::ConfigStore`]. Systems can
//! mirror the same system of another configuration; saving a source pushes its
//! value to every mirror. The [`merge::MergeCoordinator`] folds a configuration
//! into a simulator data file or into kneeboards.

#![forbid(unsafe_code)]

pub mod airframe;
pub mod airframes;
pub mod configuration;
pub mod constants;
pub mod error;
pub mod links;
pub mod merge;
pub mod mission;
pub mod reconcile;
pub mod settings;
pub mod storage;
pub mod store;
pub mod systems;
pub mod templates;
