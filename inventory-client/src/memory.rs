//! In-process document store
//!
//! 与远端 batch-write / group-read 语义一致的内存实现，用于测试与本地回放：
//! - set 为浅合并 (merge: true)，delete 由 `_deleteDoc` 标记触发
//! - 文档 id 中的 `/` 替换为 `_`
//! - group-read 在 products / variants / inventory 三个集合之间做 join

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use shared::models::{GroupListing, RawGroup, RawVariant};
use shared::store::{
    Collection, DELETE_MARKER, FailedDoc, WriteRequest, WriteResponse, sanitize_doc_id,
};
use std::collections::{BTreeMap, HashMap};

use crate::{ClientError, ClientResult, DocumentStore, TaxonomySource};

type Documents = BTreeMap<String, Map<String, Value>>;

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Documents>>,
    taxonomies: RwLock<Value>,
    storages: RwLock<Value>,
    /// (collection, doc count) of every accepted batch, in arrival order
    write_log: RwLock<Vec<(String, usize)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one document
    pub fn insert(&self, collection: &Collection, id: &str, data: Value) {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(sanitize_doc_id(id), data);
    }

    /// Read one document
    pub fn get(&self, collection: &Collection, id: &str) -> Option<Value> {
        self.collections
            .read()
            .get(collection.as_str())
            .and_then(|docs| docs.get(&sanitize_doc_id(id)))
            .map(|data| Value::Object(data.clone()))
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &Collection) -> usize {
        self.collections
            .read()
            .get(collection.as_str())
            .map_or(0, |docs| docs.len())
    }

    /// Document ids of a collection, sorted
    pub fn ids(&self, collection: &Collection) -> Vec<String> {
        self.collections
            .read()
            .get(collection.as_str())
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Documents of a collection whose `field` equals `value`, in id order
    pub fn find_where(&self, collection: &Collection, field: &str, value: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection.as_str())
            .map(|docs| {
                docs.values()
                    .filter(|data| data.get(field).and_then(Value::as_str) == Some(value))
                    .map(|data| Value::Object(data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Accepted batches as (collection, doc count)
    pub fn write_log(&self) -> Vec<(String, usize)> {
        self.write_log.read().clone()
    }

    pub fn set_taxonomies(&self, payload: Value) {
        *self.taxonomies.write() = payload;
    }

    pub fn set_storages(&self, payload: Value) {
        *self.storages.write() = payload;
    }

    /// Seed one product group with its variants (one variants_master and one
    /// inventory_master document per variant)
    pub fn seed_group(&self, group: &shared::models::ProductGroup) {
        self.insert(
            &Collection::Products,
            group.doc_id(),
            serde_json::json!({
                "variant_group_id": group.group_id,
                "series_id": group.series_id,
                "product_name": group.product_name,
                "vol": group.vol,
                "release_date": group.release_date,
                "category": group.category,
                "types": group.types.first(),
                "damages": group.damages.first(),
                "sealing": group.sealing.first(),
            }),
        );
        for variant in &group.variants {
            let variant_id = variant.variant_doc_id(&group.group_id);
            self.insert(
                &Collection::Variants,
                &variant_id,
                serde_json::json!({
                    "variant_id": variant_id,
                    "variantGroupIdRef": group.group_id,
                    "type": variant.variant_type,
                    "sealing": variant.sealing,
                }),
            );
            self.insert(
                &Collection::Inventory,
                &variant.inventory_id,
                serde_json::json!({
                    "inventory_id": variant.inventory_id,
                    "variant_sku": variant_id,
                    "variantIdRef": variant_id,
                    "groupIdRef": group.group_id,
                    "types": variant.variant_type,
                    "damages": variant.damages,
                    "sealing": variant.sealing,
                    "storage": variant.storage_location,
                    "quantity": variant.quantity,
                    "unit_price": variant.unit_price,
                    "status_tokens": variant.status_tokens,
                    "barcode": variant.barcode,
                    "notes": variant.notes,
                    "created_at": variant.created_at,
                    "updated_at": variant.updated_at,
                }),
            );
        }
    }

    // ========== Join ==========

    fn join_group(&self, group_id: &str) -> Option<RawGroup> {
        let collections = self.collections.read();
        let empty = Documents::new();
        let products = collections.get(Collection::Products.as_str()).unwrap_or(&empty);
        let variants = collections.get(Collection::Variants.as_str()).unwrap_or(&empty);
        let inventory = collections.get(Collection::Inventory.as_str()).unwrap_or(&empty);

        let (doc_id, product) = products.iter().find(|(id, data)| {
            id.as_str() == group_id || str_field(data, "variant_group_id") == Some(group_id)
        })?;

        let raw_variants: Vec<RawVariant> = inventory
            .iter()
            .filter(|(_, data)| owning_group(data, variants) == Some(group_id))
            .filter_map(|(id, data)| joined_variant(id, data, variants))
            .collect();

        let mut product = product.clone();
        product.insert("docid".to_string(), Value::String(doc_id.clone()));
        if !product.contains_key("variant_group_id") {
            product.insert("variant_group_id".to_string(), Value::String(group_id.to_string()));
        }
        let mut raw: RawGroup = serde_json::from_value(Value::Object(product)).ok()?;
        raw.total_quantity = Value::from(
            raw_variants
                .iter()
                .map(|v| v.quantity.as_i64().unwrap_or(0))
                .sum::<i64>(),
        );
        raw.variants = raw_variants;
        Some(raw)
    }

    fn group_ids(&self) -> Vec<String> {
        let collections = self.collections.read();
        collections
            .get(Collection::Products.as_str())
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| {
                        str_field(data, "variant_group_id")
                            .map(str::to_string)
                            .unwrap_or_else(|| id.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn str_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Group of an inventory record: through its variant when the variant exists,
/// otherwise its own `groupIdRef`
fn owning_group<'a>(inventory: &'a Map<String, Value>, variants: &'a Documents) -> Option<&'a str> {
    str_field(inventory, "variantIdRef")
        .and_then(|variant_id| variants.get(variant_id))
        .and_then(|variant| str_field(variant, "variantGroupIdRef"))
        .or_else(|| str_field(inventory, "groupIdRef"))
}

fn joined_variant(id: &str, data: &Map<String, Value>, variants: &Documents) -> Option<RawVariant> {
    let mut data = data.clone();
    if !data.contains_key("inventory_id") && !data.contains_key("inventoryId") {
        data.insert("inventory_id".to_string(), Value::String(id.to_string()));
    }
    let variant = str_field(&data, "variantIdRef")
        .and_then(|variant_id| variants.get(variant_id))
        .cloned();
    if let Some(variant) = variant {
        let has_type = data.contains_key("types") || data.contains_key("type");
        if !has_type {
            if let Some(kind) = variant.get("type") {
                data.insert("types".to_string(), kind.clone());
            }
        }
    }
    serde_json::from_value(Value::Object(data)).ok()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn batch_write(&self, request: &WriteRequest) -> ClientResult<WriteResponse> {
        let collection = Collection::parse(&request.collection)
            .map_err(|_| ClientError::Validation("Invalid collection name".to_string()))?;
        if request.is_empty() {
            return Err(ClientError::Validation("No docs provided".to_string()));
        }

        let mut response = WriteResponse::default();
        {
            let mut collections = self.collections.write();
            let docs = collections.entry(collection.to_string()).or_default();

            for doc in &request.docs {
                let id = sanitize_doc_id(&doc.id);
                if id.is_empty() {
                    response.failed.push(FailedDoc {
                        id: None,
                        reason: "missing document id".to_string(),
                    });
                    continue;
                }
                let is_delete = doc.data.get(DELETE_MARKER).and_then(Value::as_bool) == Some(true);
                if is_delete {
                    docs.remove(&id);
                } else if let Value::Object(fields) = &doc.data {
                    let existing = docs.entry(id).or_default();
                    for (key, value) in fields {
                        existing.insert(key.clone(), value.clone());
                    }
                } else {
                    response.failed.push(FailedDoc {
                        id: Some(id),
                        reason: "document data must be an object".to_string(),
                    });
                    continue;
                }
                response.written += 1;
            }
        }

        self.write_log
            .write()
            .push((collection.to_string(), request.len()));
        Ok(response)
    }

    async fn read_group(&self, group_id: &str) -> ClientResult<Option<RawGroup>> {
        Ok(self.join_group(group_id))
    }

    async fn list_groups(&self) -> ClientResult<GroupListing> {
        let items: Vec<RawGroup> = self
            .group_ids()
            .iter()
            .filter_map(|id| self.join_group(id))
            .collect();
        Ok(GroupListing {
            generated_at: Some(shared::util::now_iso()),
            total_groups: items.len(),
            items,
        })
    }
}

#[async_trait]
impl TaxonomySource for MemoryDocumentStore {
    async fn load_taxonomies(&self) -> ClientResult<Value> {
        Ok(self.taxonomies.read().clone())
    }

    async fn load_storages(&self) -> ClientResult<Value> {
        Ok(self.storages.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::{ProductGroup, Variant};
    use shared::store::WireDoc;

    fn sample_group() -> ProductGroup {
        ProductGroup {
            group_id: "vg_1".to_string(),
            product_name: "Alpha".to_string(),
            category: "cat_game".to_string(),
            types: vec!["box".to_string()],
            variants: vec![
                Variant {
                    inventory_id: "inv-1".to_string(),
                    variant_sku: "vg_1_aa".to_string(),
                    variant_type: "box".to_string(),
                    quantity: 2,
                    ..Default::default()
                },
                Variant {
                    inventory_id: "inv-2".to_string(),
                    variant_sku: "vg_1_bb".to_string(),
                    variant_type: "none".to_string(),
                    quantity: 3,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seed_and_read_group() {
        let store = MemoryDocumentStore::new();
        store.seed_group(&sample_group());

        let raw = store.read_group("vg_1").await.unwrap().unwrap();
        let group = ProductGroup::from(raw);
        assert_eq!(group.product_name, "Alpha");
        assert_eq!(group.types, vec!["box"]);
        assert_eq!(group.total_quantity, 5);
        assert_eq!(group.variants.len(), 2);
        assert_eq!(group.variants[0].inventory_id, "inv-1");
        assert_eq!(group.variants[1].variant_type, "none");

        assert!(store.read_group("vg_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_write_merges_and_deletes() {
        let store = MemoryDocumentStore::new();
        store.insert(&Collection::Variants, "a", json!({ "type": "box", "sealing": "none" }));
        store.insert(&Collection::Variants, "b", json!({ "type": "box" }));

        let request = WriteRequest {
            collection: "variants_master".to_string(),
            docs: vec![
                WireDoc { id: "a".to_string(), data: json!({ "variantGroupIdRef": "vg_2" }) },
                WireDoc { id: "b".to_string(), data: json!({ "_deleteDoc": true }) },
                WireDoc { id: "c/d".to_string(), data: json!({ "type": "none" }) },
            ],
        };
        let response = store.batch_write(&request).await.unwrap();

        assert_eq!(response.written, 3);
        assert!(response.failed.is_empty());
        let a = store.get(&Collection::Variants, "a").unwrap();
        assert_eq!(a["type"], "box");
        assert_eq!(a["variantGroupIdRef"], "vg_2");
        assert!(store.get(&Collection::Variants, "b").is_none());
        assert_eq!(store.ids(&Collection::Variants), vec!["a", "c_d"]);
        assert_eq!(store.write_log(), vec![("variants_master".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_batch_write_rejects_bad_requests() {
        let store = MemoryDocumentStore::new();
        let bad_collection = WriteRequest {
            collection: "bad name".to_string(),
            docs: vec![WireDoc { id: "x".to_string(), data: json!({}) }],
        };
        assert!(matches!(
            store.batch_write(&bad_collection).await,
            Err(ClientError::Validation(_))
        ));

        let empty = WriteRequest {
            collection: "variants_master".to_string(),
            docs: vec![],
        };
        assert!(store.batch_write(&empty).await.is_err());
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_repointed_variant_moves_group() {
        let store = MemoryDocumentStore::new();
        store.seed_group(&sample_group());
        let mut target = sample_group();
        target.group_id = "vg_2".to_string();
        target.variants.clear();
        store.seed_group(&target);

        let request = WriteRequest {
            collection: "variants_master".to_string(),
            docs: vec![WireDoc {
                id: "vg_1_aa".to_string(),
                data: json!({ "variantGroupIdRef": "vg_2" }),
            }],
        };
        store.batch_write(&request).await.unwrap();

        let source = ProductGroup::from(store.read_group("vg_1").await.unwrap().unwrap());
        let target = ProductGroup::from(store.read_group("vg_2").await.unwrap().unwrap());
        assert_eq!(source.variants.len(), 1);
        assert_eq!(target.variants.len(), 1);
        assert_eq!(target.variants[0].inventory_id, "inv-1");

        let listing = store.list_groups().await.unwrap();
        assert_eq!(listing.total_groups, 2);
    }
}
