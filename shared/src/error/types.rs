//! Error type shared by every crate in the workspace

use super::codes::ErrorCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the primary error type of the workspace, providing:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages (shown verbatim as status text)
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field names, ids, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether the user can fix the input and retry
    pub fn is_recoverable(&self) -> bool {
        self.code.category().is_recoverable()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a group not found error
    pub fn group_not_found(group_id: impl Into<String>) -> Self {
        let id = group_id.into();
        Self::with_message(ErrorCode::GroupNotFound, format!("Product group {} not found", id))
            .with_detail("group_id", id)
    }

    /// Create a variant not found error
    pub fn variant_not_found(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::with_message(ErrorCode::VariantNotFound, format!("Variant {} not found", key))
            .with_detail("inventory_id", key)
    }

    /// Create an unknown taxonomy label error
    pub fn unknown_taxonomy(label: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        let label = label.into();
        let taxonomy = taxonomy.into();
        Self::with_message(
            ErrorCode::UnknownTaxonomyLabel,
            format!("'{}' is not a known {} label or id", label, taxonomy),
        )
        .with_detail("label", label)
        .with_detail("taxonomy", taxonomy)
    }

    /// Create an invalid merge state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidMergeState, msg)
    }

    /// Create a store unavailable error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::StoreUnavailable, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ConfigError, msg)
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
