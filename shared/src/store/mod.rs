//! Remote document store protocol
//!
//! - [`Collection`]: validated target collection names
//! - [`PendingOperation`]: one set/delete headed for the store
//! - [`WriteRequest`] / [`WriteResponse`]: batch-write wire shapes

pub mod batch;
pub mod collection;
pub mod operation;

pub use batch::{FailedDoc, WireDoc, WriteRequest, WriteResponse};
pub use collection::{Collection, MAX_COLLECTION_NAME_LEN};
pub use operation::{DELETE_MARKER, PendingOperation, WriteAction};

/// Store-side document id normalization: `/` is not allowed in ids
pub fn sanitize_doc_id(id: &str) -> String {
    id.trim().replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_doc_id() {
        assert_eq!(sanitize_doc_id(" a/b/c "), "a_b_c");
        assert_eq!(sanitize_doc_id("vg_1"), "vg_1");
    }
}
