//! End-to-end flows through `InventoryEngine` against the in-process store
//!
//! 打开 → 编辑 → 保存 → 刷新，合并（含冲突解决），强制删除，部分写入失败后重试。

use async_trait::async_trait;
use inventory_client::{ClientError, ClientResult, DocumentStore, MemoryDocumentStore};
use inventory_engine::draft::{ProductDraftPatch, VariantDraftPatch};
use inventory_engine::{
    ConflictResolution, ErrorCode, InventoryEngine, MergeState, RefreshOutcome, WriteOrchestrator,
};
use serde_json::json;
use shared::models::{ChangedField, GroupListing, ProductGroup, RawGroup, Variant};
use shared::store::{Collection, WriteRequest, WriteResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn variant(id: &str, sku: &str, kind: &str, quantity: i64) -> Variant {
    Variant {
        inventory_id: id.to_string(),
        variant_sku: sku.to_string(),
        variant_type: kind.to_string(),
        sealing: "none".to_string(),
        quantity,
        ..Default::default()
    }
}

fn seed(store: &MemoryDocumentStore) {
    store.seed_group(&ProductGroup {
        group_id: "vg_1".to_string(),
        product_name: "Alpha".to_string(),
        category: "cat_game".to_string(),
        types: vec!["box".to_string()],
        sealing: vec!["none".to_string()],
        variants: vec![
            variant("inv-1", "vg_1_box", "box", 2),
            variant("inv-2", "vg_1_loose", "loose", 1),
        ],
        ..Default::default()
    });
    store.seed_group(&ProductGroup {
        group_id: "vg_2".to_string(),
        product_name: "Beta".to_string(),
        category: "cat_game".to_string(),
        types: vec!["box".to_string()],
        sealing: vec!["none".to_string()],
        variants: vec![variant("inv-3", "vg_2_box", "box", 5)],
        ..Default::default()
    });

    let terms = |pairs: &[(&str, &str)]| {
        let entries: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(id, label)| (id.to_string(), json!({ "_id": id, "label": label })))
            .collect();
        json!({ "_subcollections": { "terms": entries } })
    };
    store.set_taxonomies(json!({
        "documents": {
            "types": terms(&[("box", "Box"), ("loose", "Loose")]),
            "damages": terms(&[("dent", "Dent")]),
            "sealing": terms(&[("none", "None"), ("shrink", "Shrink")]),
            "categories": terms(&[("cat_game", "Game")]),
        }
    }));
    store.set_storages(json!({
        "documents": {
            "wh_a": { "label": "Warehouse A" },
            "wh_b": { "name": "Warehouse B" },
        }
    }));
}

async fn engine_over(store: Arc<dyn DocumentStore>, taxonomy: &MemoryDocumentStore) -> InventoryEngine {
    let mut engine = InventoryEngine::new(WriteOrchestrator::new(store));
    engine.load_taxonomies(taxonomy).await.unwrap();
    assert_eq!(engine.load_catalog().await.unwrap(), 2);
    engine
}

async fn memory_engine() -> (Arc<MemoryDocumentStore>, InventoryEngine) {
    let store = Arc::new(MemoryDocumentStore::new());
    seed(&store);
    let engine = engine_over(store.clone(), &store).await;
    (store, engine)
}

/// Memory store that rejects batches for one collection while `down` is set
struct CollectionOutage {
    inner: MemoryDocumentStore,
    collection: &'static str,
    down: AtomicBool,
}

impl CollectionOutage {
    fn seeded(collection: &'static str) -> Self {
        let inner = MemoryDocumentStore::new();
        seed(&inner);
        Self {
            inner,
            collection,
            down: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl DocumentStore for CollectionOutage {
    async fn batch_write(&self, request: &WriteRequest) -> ClientResult<WriteResponse> {
        if self.down.load(Ordering::SeqCst) && request.collection == self.collection {
            return Err(ClientError::Status {
                status: 503,
                message: format!("{} endpoint unavailable", self.collection),
            });
        }
        self.inner.batch_write(request).await
    }

    async fn read_group(&self, group_id: &str) -> ClientResult<Option<RawGroup>> {
        self.inner.read_group(group_id).await
    }

    async fn list_groups(&self) -> ClientResult<GroupListing> {
        self.inner.list_groups().await
    }
}

#[tokio::test]
async fn test_rename_save_refreshes_catalog_and_session() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();

    let suggestion = engine
        .patch_product(ProductDraftPatch {
            product_name: Some("Alpha Deluxe".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert!(suggestion.is_none());
    assert!(engine.session().unwrap().is_dirty());

    let outcome = engine.save().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.saved_group_id, "vg_1");
    assert!(matches!(outcome.refresh, RefreshOutcome::Refreshed(_)));

    assert_eq!(engine.catalog().get("vg_1").unwrap().product_name, "Alpha Deluxe");
    let session = engine.session().unwrap();
    assert_eq!(session.group().product_name, "Alpha Deluxe");
    assert!(!session.is_dirty());

    // every variant's denormalized name was rewritten
    for id in ["inv-1", "inv-2"] {
        let doc = store.get(&Collection::Inventory, id).unwrap();
        assert_eq!(doc["productNameRef"], "Alpha Deluxe");
        assert_eq!(doc["changed_fields"], json!(["productName"]));
    }
    let product = store.get(&Collection::Products, "vg_1").unwrap();
    assert_eq!(product["types"], "box");
    assert_eq!(product["category"], "cat_game");
}

#[tokio::test]
async fn test_variant_labels_persist_as_ids() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();
    engine
        .patch_variant(
            "inv-1",
            VariantDraftPatch {
                damages: Some("Dent".to_string()),
                storage_location: Some("Warehouse B".to_string()),
                quantity: Some("4".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let outcome = engine.save_variant("inv-1").await.unwrap();
    assert!(outcome.is_success());

    let doc = store.get(&Collection::Inventory, "inv-1").unwrap();
    assert_eq!(doc["damages"], "dent");
    assert_eq!(doc["damages_label"], "Dent");
    assert_eq!(doc["storage"], "wh_b");
    assert_eq!(doc["storage_label"], "Warehouse B");
    assert_eq!(doc["quantity"], 4);

    let group = engine.catalog().get("vg_1").cloned().unwrap();
    assert_eq!(group.total_quantity, 5);
    assert_eq!(group.variant("inv-1").unwrap().storage_location, "wh_b");
}

#[tokio::test]
async fn test_unknown_label_rejects_save_before_writing() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();
    engine
        .patch_variant(
            "inv-2",
            VariantDraftPatch {
                types: Some("Blister".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let writes_before = store.write_log().len();
    let err = engine.save().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownTaxonomyLabel);
    assert_eq!(store.write_log().len(), writes_before);
    assert!(engine.session().unwrap().is_dirty());
}

#[tokio::test]
async fn test_group_id_change_moves_variants() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();
    engine
        .patch_product(ProductDraftPatch {
            group_id: Some("vg_9".to_string()),
            ..Default::default()
        })
        .unwrap();

    let outcome = engine.save().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.saved_group_id, "vg_9");

    let catalog = engine.catalog();
    assert!(!catalog.contains("vg_1"));
    let moved = catalog.get("vg_9").unwrap();
    assert_eq!(moved.product_name, "Alpha");
    assert_eq!(moved.variants.len(), 2);
    assert_eq!(moved.total_quantity, 3);
    drop(catalog);

    assert_eq!(engine.session().unwrap().group_id(), "vg_9");
    let archived = store
        .find_where(&Collection::ProductsArchive, "originalDocId", "vg_1")
        .pop()
        .unwrap();
    assert_eq!(archived["mergedInto"], "vg_9");
    assert!(store.get(&Collection::Products, "vg_1").is_none());
    assert_eq!(
        store.get(&Collection::Variants, "vg_1_box").unwrap()["variantGroupIdRef"],
        "vg_9"
    );
}

#[tokio::test]
async fn test_rename_onto_existing_name_merges_after_resolution() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();

    let target = engine
        .patch_product(ProductDraftPatch {
            product_name: Some(" beta ".to_string()),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(target.group_id, "vg_2");
    assert_eq!(engine.merge_state(), MergeState::Proposed);

    engine.prepare_merge("vg_1", "vg_2").unwrap();
    assert_eq!(engine.merge_state(), MergeState::Blocked);

    let blocked = engine.execute_merge().await.unwrap();
    assert!(!blocked.success);
    assert!(store.get(&Collection::Products, "vg_1").is_some());

    let key = engine.merge_context().unwrap().conflicts[0].key.clone();
    let state = engine
        .resolve_conflict(
            &key,
            ConflictResolution::Merge {
                target_variant_id: "inv-3".to_string(),
            },
        )
        .unwrap();
    assert_eq!(state, MergeState::Prepared);

    let outcome = engine.execute_merge().await.unwrap();
    assert!(outcome.success);
    assert_eq!(engine.merge_state(), MergeState::Done);

    let catalog = engine.catalog();
    assert!(!catalog.contains("vg_1"));
    let merged = catalog.get("vg_2").unwrap();
    let ids: Vec<&str> = merged.variants.iter().map(|v| v.inventory_id.as_str()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2", "inv-3"]);
    assert_eq!(merged.total_quantity, 8);
    drop(catalog);

    // the folded inventory record points at the surviving target variant
    let inv1 = store.get(&Collection::Inventory, "inv-1").unwrap();
    assert_eq!(inv1["variantIdRef"], "vg_2_box");
    assert!(store.get(&Collection::Variants, "vg_1_box").is_none());
    assert!(
        !store
            .find_where(&Collection::VariantsArchive, "originalDocId", "vg_1_box")
            .is_empty()
    );

    // the session followed its group into the target
    assert_eq!(engine.session().unwrap().group_id(), "vg_2");
}

#[tokio::test]
async fn test_discard_resolution_archives_source_inventory() {
    let (store, mut engine) = memory_engine().await;
    engine.prepare_merge("vg_1", "vg_2").unwrap();
    let key = engine.merge_context().unwrap().conflicts[0].key.clone();
    engine.resolve_conflict(&key, ConflictResolution::Discard).unwrap();

    let outcome = engine.execute_merge().await.unwrap();
    assert!(outcome.success);

    assert!(store.get(&Collection::Inventory, "inv-1").is_none());
    let archived = store
        .find_where(&Collection::InventoryArchive, "originalDocId", "inv-1")
        .pop()
        .unwrap();
    assert_eq!(archived["quantity"], 2);

    let merged = engine.catalog().get("vg_2").cloned().unwrap();
    let ids: Vec<&str> = merged.variants.iter().map(|v| v.inventory_id.as_str()).collect();
    assert_eq!(ids, vec!["inv-2", "inv-3"]);
}

#[tokio::test]
async fn test_force_delete_clears_merge_conflict() {
    let (store, mut engine) = memory_engine().await;
    engine.prepare_merge("vg_1", "vg_2").unwrap();
    assert_eq!(engine.merge_state(), MergeState::Blocked);

    let report = engine.force_delete_variant("inv-1").await.unwrap();
    assert!(report.is_success());
    assert_eq!(engine.merge_state(), MergeState::Prepared);
    assert!(engine.merge_context().unwrap().conflicts.is_empty());
    assert_eq!(engine.catalog().get("vg_1").unwrap().variants.len(), 1);
    assert!(
        !store
            .find_where(&Collection::InventoryArchive, "originalDocId", "inv-1")
            .is_empty()
    );

    let outcome = engine.execute_merge().await.unwrap();
    assert!(outcome.success);
    assert_eq!(engine.catalog().get("vg_2").unwrap().variants.len(), 2);
}

#[tokio::test]
async fn test_force_delete_in_open_group() {
    let (store, mut engine) = memory_engine().await;
    engine.open("vg_1").unwrap();

    let report = engine.force_delete_variant("inv-2").await.unwrap();
    assert!(report.is_success());
    assert!(store.get(&Collection::Inventory, "inv-2").is_none());
    assert_eq!(engine.session().unwrap().group().variants.len(), 1);

    let err = engine.force_delete_variant("inv-404").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::VariantNotFound);
}

#[tokio::test]
async fn test_cancel_merge_leaves_store_untouched() {
    let (store, mut engine) = memory_engine().await;
    let writes_before = store.write_log().len();

    engine.prepare_merge("vg_1", "vg_2").unwrap();
    engine.cancel_merge().unwrap();
    assert_eq!(engine.merge_state(), MergeState::Cancelled);
    assert!(engine.merge_context().is_none());
    assert_eq!(store.write_log().len(), writes_before);
}

#[tokio::test]
async fn test_partial_failure_keeps_drafts_for_retry() {
    let store = Arc::new(CollectionOutage::seeded("inventory_master"));
    let mut engine = engine_over(store.clone(), &store.inner).await;
    engine.open("vg_1").unwrap();
    engine
        .patch_product(ProductDraftPatch {
            vol: Some("2".to_string()),
            ..Default::default()
        })
        .unwrap();
    engine
        .patch_variant(
            "inv-1",
            VariantDraftPatch {
                quantity: Some("7".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let failed = engine.save().await.unwrap();
    assert!(!failed.is_success());
    assert_eq!(failed.report.failures.len(), 1);
    assert_eq!(failed.report.failures[0].collection, "inventory_master");

    // the product chunk landed, the inventory edit is still pending
    assert_eq!(engine.catalog().get("vg_1").unwrap().vol, "2");
    let session = engine.session().unwrap();
    let diff = session.diff();
    assert!(diff.product.is_empty());
    assert!(diff.variant("inv-1").unwrap().contains(ChangedField::Quantity));

    store.down.store(false, Ordering::SeqCst);
    let retried = engine.save().await.unwrap();
    assert!(retried.is_success());
    assert_eq!(engine.catalog().get("vg_1").unwrap().total_quantity, 8);
    assert!(!engine.session().unwrap().is_dirty());
}

#[tokio::test]
async fn test_merge_retry_appends_archive_records() {
    let store = Arc::new(CollectionOutage::seeded("products_master"));
    let mut engine = engine_over(store.clone(), &store.inner).await;

    engine.prepare_merge("vg_1", "vg_2").unwrap();
    let key = engine.merge_context().unwrap().conflicts[0].key.clone();
    engine
        .resolve_conflict(
            &key,
            ConflictResolution::Merge {
                target_variant_id: "inv-3".to_string(),
            },
        )
        .unwrap();

    let failed = engine.execute_merge().await.unwrap();
    assert!(!failed.success);
    assert_eq!(engine.merge_state(), MergeState::Failed);
    assert!(store.inner.get(&Collection::Products, "vg_1").is_some());
    let first = store
        .inner
        .find_where(&Collection::ProductsArchive, "originalDocId", "vg_1");
    assert_eq!(first.len(), 1);

    store.down.store(false, Ordering::SeqCst);
    engine.prepare_merge("vg_1", "vg_2").unwrap();
    assert_eq!(engine.merge_state(), MergeState::Prepared);
    let retried = engine.execute_merge().await.unwrap();
    assert!(retried.success, "{}", retried.message);
    assert!(store.inner.get(&Collection::Products, "vg_1").is_none());

    // the first archive copy is still there, untouched
    let archives = store
        .inner
        .find_where(&Collection::ProductsArchive, "originalDocId", "vg_1");
    assert_eq!(archives.len(), 2);
    assert!(archives.contains(&first[0]));
}

#[tokio::test]
async fn test_session_errors() {
    let (_store, mut engine) = memory_engine().await;

    let err = engine.save().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoActiveGroup);

    let err = engine.open("vg_404").unwrap_err();
    assert_eq!(err.code, ErrorCode::GroupNotFound);

    engine.open("vg_2").unwrap();
    let err = engine.save().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NothingToSave);

    engine.close();
    assert!(engine.session().is_none());
}
