//! Label ↔ canonical ID resolution

use inventory_client::TaxonomySource;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use std::collections::HashMap;

use super::{TaxonomyDocument, TaxonomyKind, TaxonomyTerm};

static NULL: Value = Value::Null;

/// Bidirectional lookup over every loaded vocabulary
#[derive(Debug, Clone, Default)]
pub struct TaxonomyResolver {
    documents: HashMap<TaxonomyKind, TaxonomyDocument>,
    id_to_label: HashMap<TaxonomyKind, HashMap<String, String>>,
    label_to_id: HashMap<TaxonomyKind, HashMap<String, String>>,
}

impl TaxonomyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register one vocabulary
    pub fn with_document(mut self, kind: TaxonomyKind, document: TaxonomyDocument) -> Self {
        self.insert(kind, document);
        self
    }

    /// Register (or replace) one vocabulary
    ///
    /// When two terms share a label the one sorted first keeps it.
    pub fn insert(&mut self, kind: TaxonomyKind, document: TaxonomyDocument) {
        let mut id_to_label = HashMap::new();
        let mut label_to_id = HashMap::new();
        for term in document.options() {
            label_to_id
                .entry(term.label.clone())
                .or_insert_with(|| term.id.clone());
            id_to_label.insert(term.id, term.label);
        }
        self.id_to_label.insert(kind, id_to_label);
        self.label_to_id.insert(kind, label_to_id);
        self.documents.insert(kind, document);
    }

    /// Parse the taxonomies and storages payloads
    ///
    /// Both payloads carry a top-level `documents` object.
    pub fn from_payloads(taxonomies: &Value, storages: &Value) -> AppResult<Self> {
        let documents = documents_of(taxonomies)?;
        let mut resolver = Self::new();
        for kind in [
            TaxonomyKind::Types,
            TaxonomyKind::Damages,
            TaxonomyKind::Sealing,
            TaxonomyKind::Categories,
        ] {
            let node = documents.get(kind.as_str()).unwrap_or(&NULL);
            resolver.insert(kind, TaxonomyDocument::from_value(node)?);
        }
        resolver.insert(
            TaxonomyKind::Storages,
            TaxonomyDocument::from_storages(documents_of(storages)?)?,
        );
        Ok(resolver)
    }

    /// Load every vocabulary from a taxonomy source
    ///
    /// A storage load failure leaves the storage vocabulary empty; a taxonomy
    /// load failure is returned.
    pub async fn load(source: &dyn TaxonomySource) -> AppResult<Self> {
        let taxonomies = source.load_taxonomies().await.map_err(AppError::from)?;
        let storages = match source.load_storages().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Storage load failed, continuing without storages");
                Value::Null
            }
        };
        let resolver = Self::from_payloads(&taxonomies, &storages)?;
        tracing::info!(
            types = resolver.options(TaxonomyKind::Types).len(),
            damages = resolver.options(TaxonomyKind::Damages).len(),
            sealing = resolver.options(TaxonomyKind::Sealing).len(),
            categories = resolver.options(TaxonomyKind::Categories).len(),
            storages = resolver.options(TaxonomyKind::Storages).len(),
            "Taxonomies loaded"
        );
        Ok(resolver)
    }

    /// Resolve candidate labels or ids to a canonical id
    ///
    /// Candidates are scanned in input order, blanks skipped. For each one a
    /// label match wins over an exact id match; the first candidate matching
    /// either way decides. `None` when nothing matches.
    pub fn resolve<S: AsRef<str>>(&self, candidates: &[S], kind: TaxonomyKind) -> Option<String> {
        let labels = self.label_to_id.get(&kind)?;
        let ids = self.id_to_label.get(&kind)?;
        for candidate in candidates {
            let trimmed = candidate.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(id) = labels.get(trimmed) {
                return Some(id.clone());
            }
            if ids.contains_key(trimmed) {
                return Some(trimmed.to_string());
            }
        }
        None
    }

    /// Resolve one required value; blank input resolves to `None`
    ///
    /// Non-blank input that matches nothing is an `UnknownTaxonomyLabel` error.
    pub fn resolve_required(&self, value: &str, kind: TaxonomyKind) -> AppResult<Option<String>> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        self.resolve(&[trimmed], kind)
            .map(Some)
            .ok_or_else(|| AppError::unknown_taxonomy(trimmed, kind.as_str()))
    }

    /// Label of an id, falling back to the id itself
    pub fn get_label(&self, id: &str, kind: TaxonomyKind) -> String {
        self.id_to_label
            .get(&kind)
            .and_then(|map| map.get(id))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Id of a label, falling back to the label itself
    pub fn get_id(&self, label: &str, kind: TaxonomyKind) -> String {
        self.label_to_id
            .get(&kind)
            .and_then(|map| map.get(label))
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    /// id → label map of one vocabulary
    pub fn labels(&self, kind: TaxonomyKind) -> Option<&HashMap<String, String>> {
        self.id_to_label.get(&kind)
    }

    /// Sorted options of one vocabulary
    pub fn options(&self, kind: TaxonomyKind) -> Vec<TaxonomyTerm> {
        self.documents
            .get(&kind)
            .map(TaxonomyDocument::options)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.values().all(TaxonomyDocument::is_empty)
    }
}

fn documents_of(payload: &Value) -> AppResult<&Value> {
    match payload {
        Value::Null => Ok(&NULL),
        Value::Object(object) => Ok(object.get("documents").unwrap_or(&NULL)),
        _ => Err(AppError::with_message(
            ErrorCode::InvalidTaxonomyDocument,
            "Taxonomy payload must be an object",
        )),
    }
}
