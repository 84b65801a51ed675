//! Batch-write protocol types
//!
//! Request: `{collection, docs: [{id, data}]}`
//! Response: `{written, failed: [{id?, reason}]}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operation::PendingOperation;

/// One document in a batch-write request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDoc {
    pub id: String,
    pub data: Value,
}

/// Batch-write request for a single collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub collection: String,
    pub docs: Vec<WireDoc>,
}

impl WriteRequest {
    /// Build a request from operations that all target one collection
    ///
    /// Summaries stay behind; only `id` and the payload go on the wire.
    pub fn from_operations(collection: impl Into<String>, ops: &[PendingOperation]) -> Self {
        Self {
            collection: collection.into(),
            docs: ops
                .iter()
                .map(|op| WireDoc {
                    id: op.doc_id.clone(),
                    data: op.action.payload(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// A document the store refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

/// Batch-write response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub written: usize,
    #[serde(default)]
    pub failed: Vec<FailedDoc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, PendingOperation};
    use serde_json::{Map, json};

    #[test]
    fn test_request_omits_summary() {
        let mut data = Map::new();
        data.insert("variantGroupIdRef".to_string(), json!("vg_2"));
        let ops = vec![
            PendingOperation::set(Collection::Variants, "vg_1_a", data, "repoint vg_1_a"),
            PendingOperation::delete(Collection::Variants, "vg_1_b", "delete vg_1_b"),
        ];

        let request = WriteRequest::from_operations("variants_master", &ops);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "collection": "variants_master",
                "docs": [
                    { "id": "vg_1_a", "data": { "variantGroupIdRef": "vg_2" } },
                    { "id": "vg_1_b", "data": { "_deleteDoc": true } }
                ]
            })
        );
        assert!(!json.to_string().contains("repoint"));
    }

    #[test]
    fn test_response_defaults() {
        let response: WriteResponse = serde_json::from_value(json!({ "written": 3 })).unwrap();
        assert_eq!(response.written, 3);
        assert!(response.failed.is_empty());

        let response: WriteResponse = serde_json::from_value(json!({
            "written": 1,
            "failed": [{ "id": "x", "reason": "permission denied" }, { "reason": "quota" }]
        }))
        .unwrap();
        assert_eq!(response.failed.len(), 2);
        assert_eq!(response.failed[1].id, None);
    }
}
