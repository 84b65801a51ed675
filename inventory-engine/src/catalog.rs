//! In-memory catalog of product groups
//!
//! 所有修改都是按 group id 整组替换或追加，绝不做字段级 patch。

use serde::{Deserialize, Serialize};
use shared::models::ProductGroup;

use crate::tokens::parse_types_input;

/// Listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Category id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Type id, matched against the group and its variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<String>,
    /// Free text over names, ids, skus, locations and barcodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl CatalogQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Default::default()
        }
    }

    fn search_text(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn matches_type(group: &ProductGroup, wanted: &str) -> bool {
    group.types.iter().any(|t| t.trim() == wanted)
        || group
            .variants
            .iter()
            .any(|v| parse_types_input(&v.variant_type).iter().any(|t| t == wanted))
}

fn matches_text(group: &ProductGroup, needle: &str) -> bool {
    let hit = |value: &str| value.to_lowercase().contains(needle);
    hit(&group.display_name())
        || hit(&group.group_id)
        || group.variants.iter().any(|v| {
            hit(&v.inventory_id) || hit(&v.variant_sku) || hit(&v.storage_location) || hit(&v.barcode)
        })
}

/// The canonical in-memory list of groups
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<ProductGroup>,
}

impl Catalog {
    pub fn new(groups: Vec<ProductGroup>) -> Self {
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[ProductGroup] {
        &self.groups
    }

    pub fn get(&self, group_id: &str) -> Option<&ProductGroup> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    pub fn contains(&self, group_id: &str) -> bool {
        self.get(group_id).is_some()
    }

    /// Replace the group with the same id, or append it; returns true on replace
    pub fn replace_or_append(&mut self, group: ProductGroup) -> bool {
        match self.groups.iter_mut().find(|g| g.group_id == group.group_id) {
            Some(slot) => {
                *slot = group;
                true
            }
            None => {
                self.groups.push(group);
                false
            }
        }
    }

    pub fn remove(&mut self, group_id: &str) -> Option<ProductGroup> {
        let index = self.groups.iter().position(|g| g.group_id == group_id)?;
        Some(self.groups.remove(index))
    }

    pub fn replace_all(&mut self, groups: Vec<ProductGroup>) {
        self.groups = groups;
    }

    /// Filtered listing
    ///
    /// Sorted by total quantity (descending) when searching, otherwise by
    /// product name then group id.
    pub fn query(&self, query: &CatalogQuery) -> Vec<&ProductGroup> {
        let category = non_blank(&query.category);
        let variant_type = non_blank(&query.variant_type);
        let text = query.search_text();

        let mut hits: Vec<&ProductGroup> = self
            .groups
            .iter()
            .filter(|g| category.is_none_or(|c| g.category.trim() == c))
            .filter(|g| variant_type.is_none_or(|t| matches_type(g, t)))
            .filter(|g| text.as_deref().is_none_or(|t| matches_text(g, t)))
            .collect();

        if text.is_some() {
            hits.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
        } else {
            hits.sort_by(|a, b| {
                a.product_name
                    .cmp(&b.product_name)
                    .then_with(|| a.group_id.cmp(&b.group_id))
            });
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Variant;

    fn group(id: &str, name: &str, category: &str, quantity: i64) -> ProductGroup {
        ProductGroup {
            group_id: id.to_string(),
            product_name: name.to_string(),
            category: category.to_string(),
            types: vec!["box".to_string()],
            total_quantity: quantity,
            variants: vec![Variant {
                inventory_id: format!("{}-inv", id),
                variant_sku: format!("{}_sku", id),
                variant_type: "box|shrink".to_string(),
                storage_location: "WH-A".to_string(),
                barcode: format!("490{}", quantity),
                quantity,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            group("vg_2", "Beta", "cat_game", 4),
            group("vg_1", "Alpha", "cat_game", 1),
            group("vg_3", "Alpha Deluxe", "cat_card", 9),
        ])
    }

    #[test]
    fn test_replace_or_append() {
        let mut catalog = catalog();
        assert!(catalog.replace_or_append(group("vg_1", "Alpha II", "cat_game", 2)));
        assert_eq!(catalog.get("vg_1").unwrap().product_name, "Alpha II");
        assert_eq!(catalog.len(), 3);

        assert!(!catalog.replace_or_append(group("vg_4", "Gamma", "cat_game", 0)));
        assert_eq!(catalog.len(), 4);

        assert!(catalog.remove("vg_4").is_some());
        assert!(catalog.remove("vg_4").is_none());
    }

    #[test]
    fn test_query_sorts_by_name_without_search() {
        let catalog = catalog();
        let ids: Vec<&str> = catalog
            .query(&CatalogQuery::default())
            .iter()
            .map(|g| g.group_id.as_str())
            .collect();
        assert_eq!(ids, vec!["vg_1", "vg_3", "vg_2"]);
    }

    #[test]
    fn test_query_search_sorts_by_quantity() {
        let catalog = catalog();
        let ids: Vec<&str> = catalog
            .query(&CatalogQuery::search("alpha"))
            .iter()
            .map(|g| g.group_id.as_str())
            .collect();
        assert_eq!(ids, vec!["vg_3", "vg_1"]);

        assert_eq!(catalog.query(&CatalogQuery::search("vg_2_sku")).len(), 1);
        assert_eq!(catalog.query(&CatalogQuery::search("wh-a")).len(), 3);
        assert_eq!(catalog.query(&CatalogQuery::search("4909")).len(), 1);
    }

    #[test]
    fn test_query_filters() {
        let catalog = catalog();
        let query = CatalogQuery {
            category: Some("cat_game".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.query(&query).len(), 2);

        let query = CatalogQuery {
            variant_type: Some("shrink".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.query(&query).len(), 3);

        let query = CatalogQuery {
            variant_type: Some("loose".to_string()),
            ..Default::default()
        };
        assert!(catalog.query(&query).is_empty());
    }
}
