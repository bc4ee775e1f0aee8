//! Error types for TEMPO operations

use thiserror::Error;

/// Validation errors raised by caller-facing constructors and registrations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Collection {collection} is a default collection and cannot be modified")]
    ReservedCollection { collection: String },

    #[error("Collection {collection} is already registered")]
    DuplicateCollection { collection: String },

    #[error("Invalid transition type: {value}")]
    InvalidTransitionType { value: String },
}

/// Configuration errors. Fatal when raised by a strategy factory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown {kind} strategy: {name}")]
    UnknownStrategy { kind: String, name: String },

    #[error("No {kind} strategies registered")]
    NoStrategiesRegistered { kind: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    ParseFailed { reason: String },
}

/// Storage layer errors reported by content stores and cache clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Collection not registered: {collection}")]
    UnknownCollection { collection: String },

    #[error("Query failed on {collection}: {reason}")]
    QueryFailed { collection: String, reason: String },

    #[error("Update failed for {collection} record {id}: {reason}")]
    UpdateFailed {
        collection: String,
        id: i64,
        reason: String,
    },

    #[error("Cache flush failed: {reason}")]
    FlushFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Failure while processing a single transition. Recoverable per item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Tag resolution failed for {collection} record {id}: {reason}")]
    TagResolutionFailed {
        collection: String,
        id: i64,
        reason: String,
    },

    #[error("Invalidation failed for {collection} record {id}: {reason}")]
    InvalidationFailed {
        collection: String,
        id: i64,
        reason: String,
    },
}

/// Failure while resolving content-to-page references. Degrades scope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Reference index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    #[error("Reference lookup failed for element {element_id}: {reason}")]
    LookupFailed { element_id: i64, reason: String },
}

/// Master error type for all TEMPO errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TempoError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),
}

/// Result type alias for TEMPO operations.
pub type TempoResult<T> = Result<T, TempoError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_reserved_collection() {
        let err = ValidationError::ReservedCollection {
            collection: "pages".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("pages"));
        assert!(msg.contains("default collection"));
    }

    #[test]
    fn test_config_error_display_unknown_strategy() {
        let err = ConfigError::UnknownStrategy {
            kind: "scoping".to_string(),
            name: "per-planet".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("scoping"));
        assert!(msg.contains("per-planet"));
    }

    #[test]
    fn test_storage_error_display_update_failed() {
        let err = StorageError::UpdateFailed {
            collection: "content-elements".to_string(),
            id: 42,
            reason: "read-only".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("content-elements"));
        assert!(msg.contains("42"));
        assert!(msg.contains("read-only"));
    }

    #[test]
    fn test_tempo_error_from_variants() {
        let validation = TempoError::from(ValidationError::InvalidTransitionType {
            value: "middle".to_string(),
        });
        assert!(matches!(validation, TempoError::Validation(_)));

        let config = TempoError::from(ConfigError::NoStrategiesRegistered {
            kind: "timing".to_string(),
        });
        assert!(matches!(config, TempoError::Config(_)));

        let storage = TempoError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, TempoError::Storage(_)));

        let transition = TempoError::from(TransitionError::InvalidationFailed {
            collection: "pages".to_string(),
            id: 1,
            reason: "timeout".to_string(),
        });
        assert!(matches!(transition, TempoError::Transition(_)));

        let reference = TempoError::from(ReferenceError::IndexUnavailable {
            reason: "offline".to_string(),
        });
        assert!(matches!(reference, TempoError::Reference(_)));
    }
}
