//! Shared types for the inventory workspace
//!
//! Domain models, remote store protocol types, the unified error system
//! and small utilities used by both the client and the engine.

pub mod error;
pub mod models;
pub mod store;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{ChangedField, FieldDiff, ProductGroup, Variant};
pub use serde::{Deserialize, Serialize};
pub use store::{Collection, PendingOperation, WriteAction};
