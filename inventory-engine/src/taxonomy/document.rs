//! Parsed taxonomy documents
//!
//! 远端分类字典是松散的嵌套结构
//! `{_subcollections: {terms|term: {slug: {_id?, label?}}}}`，
//! 保管场所则是扁平的 `{docId: {label|name}}`。两者都在这里解析成
//! [`TaxonomyDocument`]，调用方不再遍历原始 JSON。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use std::collections::BTreeMap;

/// One entry of a controlled vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: String,
    pub label: String,
}

/// A controlled vocabulary keyed by slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyDocument {
    pub terms: BTreeMap<String, TaxonomyTerm>,
}

impl TaxonomyDocument {
    /// Build a document from `(id, label)` pairs; the id doubles as slug
    pub fn from_terms<I, S, L>(terms: I) -> Self
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        let terms = terms
            .into_iter()
            .map(|(id, label)| {
                let id = id.into();
                let term = TaxonomyTerm {
                    id: id.clone(),
                    label: label.into(),
                };
                (id, term)
            })
            .collect();
        Self { terms }
    }

    /// Parse one nested taxonomy node
    ///
    /// `null` or a node without `_subcollections` yields an empty document;
    /// a node that is not an object is rejected.
    pub fn from_value(node: &Value) -> AppResult<Self> {
        let object = match node {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            _ => {
                return Err(AppError::with_message(
                    ErrorCode::InvalidTaxonomyDocument,
                    "Taxonomy node must be an object",
                ));
            }
        };

        let sub = object.get("_subcollections");
        let terms_node = sub
            .and_then(|s| s.get("terms"))
            .or_else(|| sub.and_then(|s| s.get("term")));
        let Some(Value::Object(entries)) = terms_node else {
            return Ok(Self::default());
        };

        let terms = entries
            .iter()
            .map(|(slug, node)| {
                let id = node
                    .get("_id")
                    .and_then(value_text)
                    .unwrap_or_else(|| slug.clone());
                let label = node
                    .get("label")
                    .and_then(value_text)
                    .unwrap_or_else(|| slug.clone());
                (slug.clone(), TaxonomyTerm { id, label })
            })
            .collect();
        Ok(Self { terms })
    }

    /// Parse the flat storage map; blank document ids are skipped
    pub fn from_storages(documents: &Value) -> AppResult<Self> {
        let entries = match documents {
            Value::Null => return Ok(Self::default()),
            Value::Object(entries) => entries,
            _ => {
                return Err(AppError::with_message(
                    ErrorCode::InvalidTaxonomyDocument,
                    "Storage documents must be an object",
                ));
            }
        };

        let terms = entries
            .iter()
            .filter(|(doc_id, _)| !doc_id.trim().is_empty())
            .map(|(doc_id, doc)| {
                let label = ["label", "name"]
                    .iter()
                    .filter_map(|key| doc.get(*key).and_then(value_text))
                    .find(|text| !text.is_empty())
                    .unwrap_or_else(|| doc_id.clone());
                let term = TaxonomyTerm {
                    id: doc_id.clone(),
                    label,
                };
                (doc_id.clone(), term)
            })
            .collect();
        Ok(Self { terms })
    }

    /// Options sorted by label, then id
    pub fn options(&self) -> Vec<TaxonomyTerm> {
        let mut options: Vec<TaxonomyTerm> = self.terms.values().cloned().collect();
        options.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        options
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_nested_terms() {
        let node = json!({
            "_subcollections": {
                "terms": {
                    "box": {"_id": "type_box", "label": "箱"},
                    "shrink": {"label": "シュリンク"},
                    "bare": {}
                }
            }
        });
        let doc = TaxonomyDocument::from_value(&node).unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.terms["box"].id, "type_box");
        assert_eq!(doc.terms["shrink"].id, "shrink");
        assert_eq!(doc.terms["bare"].label, "bare");
    }

    #[test]
    fn test_from_value_accepts_singular_term_key() {
        let node = json!({"_subcollections": {"term": {"a": {"label": "A"}}}});
        let doc = TaxonomyDocument::from_value(&node).unwrap();
        assert_eq!(doc.terms["a"].label, "A");
    }

    #[test]
    fn test_from_value_shapes() {
        assert!(TaxonomyDocument::from_value(&Value::Null).unwrap().is_empty());
        assert!(TaxonomyDocument::from_value(&json!({})).unwrap().is_empty());

        let err = TaxonomyDocument::from_value(&json!("types")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTaxonomyDocument);
    }

    #[test]
    fn test_from_storages() {
        let docs = json!({
            "wh_a": {"label": "倉庫A"},
            "wh_b": {"name": "倉庫B"},
            "wh_c": {"label": ""},
            "  ": {"label": "blank"}
        });
        let doc = TaxonomyDocument::from_storages(&docs).unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.terms["wh_a"].label, "倉庫A");
        assert_eq!(doc.terms["wh_b"].label, "倉庫B");
        assert_eq!(doc.terms["wh_c"].label, "wh_c");
    }

    #[test]
    fn test_options_sorted_by_label() {
        let doc = TaxonomyDocument::from_terms([("z", "Alpha"), ("a", "Beta"), ("m", "Alpha")]);
        let ids: Vec<String> = doc.options().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["m", "z", "a"]);
    }
}
