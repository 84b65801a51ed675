//! ConflictDetector - overlapping variants between two groups
//!
//! 复合 key = `type|sealing|damages|location`，精确字符串匹配（区分大小写，空串也有意义）。

use serde::Serialize;
use shared::models::Variant;
use std::collections::HashMap;
use std::fmt;

/// Composite identity of a variant for merge purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConflictKey {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub sealing: String,
    pub damages: String,
    pub location: String,
}

impl ConflictKey {
    pub fn of(variant: &Variant) -> Self {
        let (variant_type, sealing, damages, location) = variant.key_parts();
        Self {
            variant_type: variant_type.to_string(),
            sealing: sealing.to_string(),
            damages: damages.to_string(),
            location: location.to_string(),
        }
    }
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.variant_type, self.sealing, self.damages, self.location
        )
    }
}

/// All variants on each side sharing one composite key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantConflict {
    pub key: ConflictKey,
    pub from_variants: Vec<Variant>,
    pub to_variants: Vec<Variant>,
}

impl VariantConflict {
    /// Whether this conflict involves the given source variant
    pub fn involves(&self, inventory_id: &str) -> bool {
        let id = inventory_id.trim();
        self.from_variants
            .iter()
            .chain(&self.to_variants)
            .any(|v| v.inventory_id.trim() == id)
    }
}

/// Group variants by key, keeping first-seen key order
fn group_by_key(variants: &[Variant]) -> Vec<(ConflictKey, Vec<Variant>)> {
    let mut order: Vec<(ConflictKey, Vec<Variant>)> = Vec::new();
    let mut index: HashMap<ConflictKey, usize> = HashMap::new();
    for variant in variants {
        let key = ConflictKey::of(variant);
        match index.get(&key) {
            Some(&i) => order[i].1.push(variant.clone()),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![variant.clone()]));
            }
        }
    }
    order
}

/// Conflicts between the source and target variants, in source key order
pub fn detect_conflicts(from: &[Variant], to: &[Variant]) -> Vec<VariantConflict> {
    let mut to_by_key: HashMap<ConflictKey, Vec<Variant>> = group_by_key(to).into_iter().collect();

    group_by_key(from)
        .into_iter()
        .filter_map(|(key, from_variants)| {
            let to_variants = to_by_key.remove(&key)?;
            Some(VariantConflict {
                key,
                from_variants,
                to_variants,
            })
        })
        .collect()
}
