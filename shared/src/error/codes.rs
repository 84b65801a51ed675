//! Unified error codes for the inventory workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 6xxx: Inventory errors (groups, variants, drafts, taxonomy)
//! - 7xxx: Merge errors
//! - 8xxx: Write errors (collections, documents, chunks)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they survive JSON
/// round-trips through the status text shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 6xxx: Inventory ====================
    /// Product group not found
    GroupNotFound = 6001,
    /// Variant not found
    VariantNotFound = 6002,
    /// Variant has a blank inventory id
    BlankInventoryId = 6003,
    /// Two variants share one inventory id
    DuplicateInventoryId = 6004,
    /// No group is open for editing
    NoActiveGroup = 6005,
    /// Draft has no changes to save
    NothingToSave = 6006,
    /// Taxonomy label could not be resolved to a canonical id
    UnknownTaxonomyLabel = 6101,
    /// Taxonomy document has an unexpected shape
    InvalidTaxonomyDocument = 6102,

    // ==================== 7xxx: Merge ====================
    /// Merge blocked by unresolved variant conflicts
    MergeConflict = 7001,
    /// Source and target group are the same
    MergeSameGroup = 7002,
    /// Merge state machine transition not allowed
    InvalidMergeState = 7003,
    /// No merge context prepared
    NoMergeContext = 7004,
    /// No unresolved conflict for this key
    ConflictNotFound = 7005,
    /// Nominated surviving variant is not part of the conflict
    InvalidMergeTarget = 7006,

    // ==================== 8xxx: Write ====================
    /// Collection name missing or malformed
    InvalidCollection = 8001,
    /// Document id missing
    MissingDocumentId = 8002,
    /// Chunk size must be positive
    InvalidChunkSize = 8003,
    /// One or more chunks failed
    PartialWriteFailure = 8004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Remote store unreachable or returned a transport error
    StoreUnavailable = 9002,
    /// Remote store returned a malformed response
    InvalidStoreResponse = 9003,
    /// Configuration error
    ConfigError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Inventory
            ErrorCode::GroupNotFound => "Product group not found",
            ErrorCode::VariantNotFound => "Variant not found",
            ErrorCode::BlankInventoryId => "Variant has no inventory id",
            ErrorCode::DuplicateInventoryId => "Inventory id is used by more than one variant",
            ErrorCode::NoActiveGroup => "No product group is open for editing",
            ErrorCode::NothingToSave => "No changes to save",
            ErrorCode::UnknownTaxonomyLabel => "Taxonomy label could not be resolved",
            ErrorCode::InvalidTaxonomyDocument => "Taxonomy document is malformed",

            // Merge
            ErrorCode::MergeConflict => "Merge has unresolved variant conflicts",
            ErrorCode::MergeSameGroup => "Cannot merge a group into itself",
            ErrorCode::InvalidMergeState => "Merge operation not allowed in current state",
            ErrorCode::NoMergeContext => "No merge has been prepared",
            ErrorCode::ConflictNotFound => "No unresolved conflict for this key",
            ErrorCode::InvalidMergeTarget => "Target variant is not part of the conflict",

            // Write
            ErrorCode::InvalidCollection => "Collection name is missing or invalid",
            ErrorCode::MissingDocumentId => "Document id is missing",
            ErrorCode::InvalidChunkSize => "Chunk size must be greater than zero",
            ErrorCode::PartialWriteFailure => "Some write chunks failed",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::StoreUnavailable => "Remote store is unavailable",
            ErrorCode::InvalidStoreResponse => "Remote store returned an invalid response",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Inventory
            6001 => Ok(ErrorCode::GroupNotFound),
            6002 => Ok(ErrorCode::VariantNotFound),
            6003 => Ok(ErrorCode::BlankInventoryId),
            6004 => Ok(ErrorCode::DuplicateInventoryId),
            6005 => Ok(ErrorCode::NoActiveGroup),
            6006 => Ok(ErrorCode::NothingToSave),
            6101 => Ok(ErrorCode::UnknownTaxonomyLabel),
            6102 => Ok(ErrorCode::InvalidTaxonomyDocument),

            // Merge
            7001 => Ok(ErrorCode::MergeConflict),
            7002 => Ok(ErrorCode::MergeSameGroup),
            7003 => Ok(ErrorCode::InvalidMergeState),
            7004 => Ok(ErrorCode::NoMergeContext),
            7005 => Ok(ErrorCode::ConflictNotFound),
            7006 => Ok(ErrorCode::InvalidMergeTarget),

            // Write
            8001 => Ok(ErrorCode::InvalidCollection),
            8002 => Ok(ErrorCode::MissingDocumentId),
            8003 => Ok(ErrorCode::InvalidChunkSize),
            8004 => Ok(ErrorCode::PartialWriteFailure),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StoreUnavailable),
            9003 => Ok(ErrorCode::InvalidStoreResponse),
            9004 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
