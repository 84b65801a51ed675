//! Remote store seams
//!
//! 引擎只通过这两个 trait 访问远端：批量写入 + 单组读取，以及分类字典的读取。

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{GroupListing, RawGroup};
use shared::store::{WriteRequest, WriteResponse};

use crate::ClientResult;

/// Remote document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write one chunk of documents into one collection
    async fn batch_write(&self, request: &WriteRequest) -> ClientResult<WriteResponse>;

    /// Read one denormalized, already-joined group; `None` when it no longer exists
    async fn read_group(&self, group_id: &str) -> ClientResult<Option<RawGroup>>;

    /// Read the full group listing
    async fn list_groups(&self) -> ClientResult<GroupListing>;
}

/// Source of taxonomy payloads
///
/// Payloads are returned as loose JSON; the engine parses them once at the
/// boundary into typed taxonomy documents.
#[async_trait]
pub trait TaxonomySource: Send + Sync {
    /// `{documents: {types|damages|sealing|categories: {_subcollections: {terms: ...}}}}`
    async fn load_taxonomies(&self) -> ClientResult<Value>;

    /// `{documents: {docId: {label|name}}}`
    async fn load_storages(&self) -> ClientResult<Value>;
}
