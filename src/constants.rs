//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Settings file location
pub mod config {
    /// Directory under the platform config/data dirs
    pub const APP_DIR: &str = "avionics-dtc";

    /// Settings filename
    pub const FILENAME: &str = "settings.json";

    /// Subdirectory of the data dir holding configuration records
    pub const CONFIGS_DIR: &str = "configs";

    /// Subdirectory of the data dir holding DTC and kneeboard templates
    pub const TEMPLATES_DIR: &str = "templates";

    /// Extension of configuration records on disk
    pub const RECORD_EXTENSION: &str = "json";
}

/// Merge coordinator constants
pub mod merge {
    /// Bounded wait for the merge lock before reporting contention
    pub const LOCK_TIMEOUT_MS: u64 = 100;

    /// Top-level and data-subtree name field of a simulator document
    pub const NAME_FIELD: &str = "name";

    /// Subtree of a simulator document that systems write into
    pub const DATA_FIELD: &str = "data";

    /// Position of the default pilot added to an empty flight
    pub const DEFAULT_PILOT_POSITION: u32 = 1;

    /// Prefix for the temporary kneeboard template directory
    pub const KNEEBOARD_TEMP_PREFIX: &str = "avionics-dtc-kb";
}

/// Mission plan skeleton values
pub mod mission {
    pub const DEFAULT_NAME: &str = "Mission";
    pub const DEFAULT_THEATER: &str = "Caucasus";
    pub const DEFAULT_OWNER: &str = "Blue";
    pub const DEFAULT_PACKAGE: &str = "Package 1";
    pub const DEFAULT_FLIGHT: &str = "Flight 1";
}

/// Template layout on disk
pub mod templates {
    /// Subdirectory of an airframe's template dir holding DTC documents
    pub const DTC_DIR: &str = "dtc";

    /// Subdirectory of an airframe's template dir holding kneeboard packages
    pub const KNEEBOARD_DIR: &str = "kneeboards";

    /// Extension of DTC template documents
    pub const DTC_EXTENSION: &str = "json";

    /// Suffix of plan files written next to each kneeboard template
    pub const PLAN_SUFFIX: &str = "plan.json";
}

/// Settings defaults
pub mod defaults {
    pub const CALLSIGN: &str = "Viper 1-1";
    /// Name given to an imported configuration that arrives without one
    pub const CONFIG_NAME: &str = "Imported";
    pub const LOG_LEVEL: &str = "info";
    pub const DTC_TEMPLATE: &str = "default";
    pub const KNEEBOARD_TEMPLATE: &str = "default";
}
