//! WriteOrchestrator - chunked dispatch of pending operations
//!
//! 按集合分组（保持首次出现顺序与组内顺序），每个集合切成固定大小的 chunk，
//! 同一集合内严格顺序发送。某个 chunk 失败只记录，不中断后续 chunk，也不回滚。

use futures::future::join_all;
use inventory_client::DocumentStore;
use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::store::{Collection, PendingOperation, WriteRequest};
use std::sync::Arc;
use tracing::Instrument;

/// Remote payload ceiling: operations per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// One failed document or chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub collection: String,
    /// Document id when the store named one; `None` for a whole-chunk failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
    /// Documents of a failed chunk
    #[serde(skip)]
    pub chunk_ids: Vec<String>,
}

/// Aggregated outcome of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub batch_id: String,
    pub total_written: usize,
    pub chunks_dispatched: usize,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    /// Every chunk succeeded and the store reported no failed document
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, outcome: CollectionOutcome) {
        self.total_written += outcome.written;
        self.chunks_dispatched += outcome.chunks;
        self.failures.extend(outcome.failures);
    }

    /// Whether an operation's document was accepted by the store
    ///
    /// False when its chunk failed or the store named its id as failed.
    pub fn was_written(&self, op: &PendingOperation) -> bool {
        !self.failures.iter().any(|f| {
            f.collection == op.collection.as_str()
                && match &f.id {
                    Some(id) => *id == op.doc_id,
                    None => f.chunk_ids.contains(&op.doc_id),
                }
        })
    }

    /// Failure reasons joined for display
    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| match &f.id {
                Some(id) => format!("{}/{}: {}", f.collection, id, f.reason),
                None => format!("{}: {}", f.collection, f.reason),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Default)]
struct CollectionOutcome {
    written: usize,
    chunks: usize,
    failures: Vec<WriteFailure>,
}

/// Chunks and dispatches operations against a [`DocumentStore`]
#[derive(Clone)]
pub struct WriteOrchestrator {
    store: Arc<dyn DocumentStore>,
    chunk_size: usize,
    parallel_collections: bool,
}

impl std::fmt::Debug for WriteOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteOrchestrator")
            .field("chunk_size", &self.chunk_size)
            .field("parallel_collections", &self.parallel_collections)
            .finish()
    }
}

impl WriteOrchestrator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel_collections: false,
        }
    }

    /// Set the chunk size; zero is rejected
    pub fn with_chunk_size(mut self, chunk_size: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::with_message(
                ErrorCode::InvalidChunkSize,
                "Chunk size must be at least 1",
            ));
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Dispatch different collections concurrently (never chunks of one collection)
    pub fn with_parallel_collections(mut self, enabled: bool) -> Self {
        self.parallel_collections = enabled;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Write every operation
    ///
    /// All operations are validated before the first network call; a single
    /// invalid operation rejects the whole batch. Store failures never abort:
    /// they are collected in the report.
    pub async fn execute(&self, operations: &[PendingOperation]) -> AppResult<WriteReport> {
        for op in operations {
            op.validate()?;
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let mut report = WriteReport {
            batch_id: batch_id.clone(),
            ..Default::default()
        };
        if operations.is_empty() {
            return Ok(report);
        }

        let groups = group_by_collection(operations);
        let span = tracing::info_span!("write_batch", batch_id = %batch_id);

        async {
            tracing::info!(
                operations = operations.len(),
                collections = groups.len(),
                chunk_size = self.chunk_size,
                "Dispatching write batch"
            );

            if self.parallel_collections {
                let outcomes = join_all(
                    groups
                        .iter()
                        .map(|(collection, ops)| self.write_collection(collection, ops)),
                )
                .await;
                for outcome in outcomes {
                    report.absorb(outcome);
                }
            } else {
                for (collection, ops) in &groups {
                    let outcome = self.write_collection(collection, ops).await;
                    report.absorb(outcome);
                }
            }

            if report.is_success() {
                tracing::info!(written = report.total_written, "Write batch completed");
            } else {
                tracing::warn!(
                    written = report.total_written,
                    failures = report.failures.len(),
                    "Write batch completed with failures"
                );
            }
        }
        .instrument(span)
        .await;

        Ok(report)
    }

    /// Send one collection's chunks strictly in sequence
    async fn write_collection(
        &self,
        collection: &Collection,
        ops: &[PendingOperation],
    ) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::default();
        let total_chunks = ops.len().div_ceil(self.chunk_size);

        for (index, chunk) in ops.chunks(self.chunk_size).enumerate() {
            let request = WriteRequest::from_operations(collection.as_str(), chunk);
            outcome.chunks += 1;

            match self.store.batch_write(&request).await {
                Ok(response) => {
                    outcome.written += response.written;
                    tracing::debug!(
                        collection = %collection,
                        chunk = index + 1,
                        of = total_chunks,
                        written = response.written,
                        failed = response.failed.len(),
                        "Chunk written"
                    );
                    for failed in response.failed {
                        outcome.failures.push(WriteFailure {
                            collection: collection.to_string(),
                            id: failed.id,
                            reason: if failed.reason.is_empty() {
                                "unknown error".to_string()
                            } else {
                                failed.reason
                            },
                            chunk_ids: Vec::new(),
                        });
                    }
                }
                Err(e) => {
                    tracing::error!(
                        collection = %collection,
                        chunk = index + 1,
                        of = total_chunks,
                        docs = request.len(),
                        error = %e,
                        "Chunk failed"
                    );
                    outcome.failures.push(WriteFailure {
                        collection: collection.to_string(),
                        id: None,
                        reason: e.reason(),
                        chunk_ids: chunk.iter().map(|op| op.doc_id.clone()).collect(),
                    });
                }
            }
        }

        outcome
    }
}

/// Group by collection in first-seen order, keeping order within each group
fn group_by_collection(operations: &[PendingOperation]) -> Vec<(Collection, Vec<PendingOperation>)> {
    let mut groups: Vec<(Collection, Vec<PendingOperation>)> = Vec::new();
    for op in operations {
        match groups.iter_mut().find(|(c, _)| *c == op.collection) {
            Some((_, ops)) => ops.push(op.clone()),
            None => groups.push((op.collection.clone(), vec![op.clone()])),
        }
    }
    groups
}
