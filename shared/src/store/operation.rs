//! Pending write operations
//!
//! 上游（保存、合并、CSV 导入）产出扁平有序的 `PendingOperation` 列表，
//! 交给 WriteOrchestrator 分组、分块、发送。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collection::Collection;
use crate::error::{AppError, AppResult, ErrorCode};

/// Payload field recognized by the batch-write endpoint as "delete this document"
pub const DELETE_MARKER: &str = "_deleteDoc";

/// What to do with one document
#[derive(Debug, Clone, PartialEq)]
pub enum WriteAction {
    /// Merge these fields into the document (created if missing)
    Set(Map<String, Value>),
    /// Delete the document
    Delete,
}

impl WriteAction {
    /// Wire payload: the fields for a set, the delete marker for a delete
    pub fn payload(&self) -> Value {
        match self {
            WriteAction::Set(data) => Value::Object(data.clone()),
            WriteAction::Delete => {
                let mut marker = Map::new();
                marker.insert(DELETE_MARKER.to_string(), Value::Bool(true));
                Value::Object(marker)
            }
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteAction::Delete)
    }
}

/// One document write headed for the remote store
///
/// `summary` is diagnostic only and never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OperationRecord", try_from = "OperationRecord")]
pub struct PendingOperation {
    pub collection: Collection,
    pub doc_id: String,
    pub action: WriteAction,
    pub summary: String,
}

impl PendingOperation {
    pub fn set(
        collection: Collection,
        doc_id: impl Into<String>,
        data: Map<String, Value>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            collection,
            doc_id: doc_id.into(),
            action: WriteAction::Set(data),
            summary: summary.into(),
        }
    }

    pub fn delete(
        collection: Collection,
        doc_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            collection,
            doc_id: doc_id.into(),
            action: WriteAction::Delete,
            summary: summary.into(),
        }
    }

    /// Reject operations that can never be written (checked before any network call)
    pub fn validate(&self) -> AppResult<()> {
        self.collection.validate()?;
        if self.doc_id.trim().is_empty() {
            return Err(AppError::with_message(
                ErrorCode::MissingDocumentId,
                format!("Missing document id for {} ({})", self.collection, self.summary),
            )
            .with_detail("collection", self.collection.as_str()));
        }
        Ok(())
    }
}

// ========== Serde record ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActionKind {
    Set,
    Delete,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationRecord {
    collection: String,
    #[serde(alias = "doc_id")]
    doc_id: String,
    action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    summary: String,
}

impl From<PendingOperation> for OperationRecord {
    fn from(op: PendingOperation) -> Self {
        let (action, data) = match op.action {
            WriteAction::Set(data) => (ActionKind::Set, Some(data)),
            WriteAction::Delete => (ActionKind::Delete, None),
        };
        OperationRecord {
            collection: op.collection.to_string(),
            doc_id: op.doc_id,
            action,
            data,
            summary: op.summary,
        }
    }
}

impl TryFrom<OperationRecord> for PendingOperation {
    type Error = AppError;

    fn try_from(record: OperationRecord) -> Result<Self, Self::Error> {
        let collection = Collection::parse(&record.collection)?;
        let action = match record.action {
            ActionKind::Set => WriteAction::Set(record.data.unwrap_or_default()),
            ActionKind::Delete => WriteAction::Delete,
        };
        Ok(PendingOperation {
            collection,
            doc_id: record.doc_id,
            action,
            summary: record.summary,
        })
    }
}
