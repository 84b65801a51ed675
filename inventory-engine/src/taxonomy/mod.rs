//! Taxonomy glue
//!
//! - [`TaxonomyDocument`] - 分类字典在边界一次性解析后的固定结构
//! - [`TaxonomyResolver`] - label ↔ canonical ID 的双向查找

pub mod document;
pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use document::{TaxonomyDocument, TaxonomyTerm};
pub use resolver::TaxonomyResolver;

/// Controlled vocabularies known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Types,
    Damages,
    Sealing,
    Categories,
    Storages,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 5] = [
        TaxonomyKind::Types,
        TaxonomyKind::Damages,
        TaxonomyKind::Sealing,
        TaxonomyKind::Categories,
        TaxonomyKind::Storages,
    ];

    /// Key of this vocabulary in the taxonomies payload
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Types => "types",
            TaxonomyKind::Damages => "damages",
            TaxonomyKind::Sealing => "sealing",
            TaxonomyKind::Categories => "categories",
            TaxonomyKind::Storages => "storages",
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
