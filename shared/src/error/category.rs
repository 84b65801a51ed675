//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 6xxx: Inventory errors
/// - 7xxx: Merge errors
/// - 8xxx: Write errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Inventory errors (6xxx)
    Inventory,
    /// Merge errors (7xxx)
    Merge,
    /// Write errors (8xxx)
    Write,
    /// System errors (9xxx and anything unassigned)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            6000..7000 => Self::Inventory,
            7000..8000 => Self::Merge,
            8000..9000 => Self::Write,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Inventory => "inventory",
            Self::Merge => "merge",
            Self::Write => "write",
            Self::System => "system",
        }
    }

    /// 用户可自行修正后重试的错误 (校验 / 冲突)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
