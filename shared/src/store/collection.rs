//! Remote store collections

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, ErrorCode};

/// Maximum collection name length accepted by the batch-write endpoint
pub const MAX_COLLECTION_NAME_LEN: usize = 64;

/// Target collection of a write
///
/// Three logical collections plus one archive shadow each. Upstream
/// producers (CSV import, edit forms) may target other collections through
/// [`Collection::Custom`], which is validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Collection {
    Products,
    Variants,
    Inventory,
    ProductsArchive,
    VariantsArchive,
    InventoryArchive,
    Custom(String),
}

impl Collection {
    /// Parse and validate a collection name (`[A-Za-z0-9_-]{1,64}`)
    pub fn parse(name: &str) -> Result<Self, AppError> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(AppError::with_message(
                ErrorCode::InvalidCollection,
                format!("Invalid collection name: '{}'", name),
            )
            .with_detail("collection", name));
        }
        Ok(match name {
            "products_master" => Collection::Products,
            "variants_master" => Collection::Variants,
            "inventory_master" => Collection::Inventory,
            "products_master_archive" => Collection::ProductsArchive,
            "variants_master_archive" => Collection::VariantsArchive,
            "inventory_master_archive" => Collection::InventoryArchive,
            other => Collection::Custom(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Collection::Products => "products_master",
            Collection::Variants => "variants_master",
            Collection::Inventory => "inventory_master",
            Collection::ProductsArchive => "products_master_archive",
            Collection::VariantsArchive => "variants_master_archive",
            Collection::InventoryArchive => "inventory_master_archive",
            Collection::Custom(name) => name,
        }
    }

    /// Archive shadow of a live collection
    pub fn archive(&self) -> Option<Collection> {
        match self {
            Collection::Products => Some(Collection::ProductsArchive),
            Collection::Variants => Some(Collection::VariantsArchive),
            Collection::Inventory => Some(Collection::InventoryArchive),
            _ => None,
        }
    }

    pub fn is_archive(&self) -> bool {
        match self {
            Collection::ProductsArchive
            | Collection::VariantsArchive
            | Collection::InventoryArchive => true,
            Collection::Custom(name) => name.ends_with("_archive"),
            _ => false,
        }
    }

    /// Re-check the name (custom names may be built without [`Collection::parse`])
    pub fn validate(&self) -> Result<(), AppError> {
        Collection::parse(self.as_str()).map(|_| ())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Collection> for String {
    fn from(collection: Collection) -> Self {
        collection.as_str().to_string()
    }
}

impl TryFrom<String> for Collection {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Collection::parse(&value)
    }
}
