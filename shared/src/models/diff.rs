//! Field-level diff types
//!
//! `FieldDiff` 是决定写什么的最小差量：一个实体 key 加上变更字段名列表。

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field that can differ between a canonical record and its draft
///
/// Serialized names are the camelCase names written into `changed_fields`
/// on persisted variant documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangedField {
    // ── Product ──
    SeriesId,
    ProductName,
    Vol,
    ReleaseDate,
    Category,
    /// Product-level default storage selection
    Storage,
    /// The effective group id differs from the canonical one
    GroupId,

    // ── Variant ──
    Types,
    Damages,
    Sealing,
    StorageLocation,
    Quantity,
    UnitPrice,
    StatusTokens,
    Barcode,
    Notes,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedField::SeriesId => "seriesId",
            ChangedField::ProductName => "productName",
            ChangedField::Vol => "vol",
            ChangedField::ReleaseDate => "releaseDate",
            ChangedField::Category => "category",
            ChangedField::Storage => "storage",
            ChangedField::GroupId => "groupId",
            ChangedField::Types => "types",
            ChangedField::Damages => "damages",
            ChangedField::Sealing => "sealing",
            ChangedField::StorageLocation => "storageLocation",
            ChangedField::Quantity => "quantity",
            ChangedField::UnitPrice => "unitPrice",
            ChangedField::StatusTokens => "statusTokens",
            ChangedField::Barcode => "barcode",
            ChangedField::Notes => "notes",
        }
    }
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changed fields of one variant, keyed by its inventory id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub key: String,
    pub changed_fields: Vec<ChangedField>,
}

impl FieldDiff {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            changed_fields: Vec::new(),
        }
    }

    /// Append a field once; insertion order is kept
    pub fn push(&mut self, field: ChangedField) {
        if !self.changed_fields.contains(&field) {
            self.changed_fields.push(field);
        }
    }

    pub fn contains(&self, field: ChangedField) -> bool {
        self.changed_fields.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields.is_empty()
    }

    /// Field names as written to `changed_fields`
    pub fn field_names(&self) -> Vec<&'static str> {
        self.changed_fields.iter().map(ChangedField::as_str).collect()
    }
}
