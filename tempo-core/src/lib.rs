//! TEMPO Core - Temporal Content Types
//!
//! Data structures shared by every TEMPO crate: time-scoped content records,
//! transition events, the monitored-collection registry, configuration,
//! errors and the injectable clock.

pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    HarmonizationConfig, TempoConfig, DEFAULT_HARMONIZATION_TOLERANCE,
    DEFAULT_MAX_CACHE_LIFETIME, DEFAULT_SCOPING_STRATEGY, DEFAULT_TIMING_STRATEGY,
};
pub use content::{
    ContentType, TemporalContent, TemporalField, TransitionEvent, TransitionType,
    CONTENT_COLLECTION, PAGES_COLLECTION,
};
pub use error::{
    ConfigError, ReferenceError, StorageError, TempoError, TempoResult, TransitionError,
    ValidationError,
};
pub use registry::{MonitorRegistry, RegistryEntry, REQUIRED_FIELDS};

/// Epoch seconds.
pub type Timestamp = i64;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;
