//! Loose wire shapes of the group-read endpoint
//!
//! 远端返回的 group 已经 join 好，但字段类型不稳定：taxonomy 可能是字符串或数组，
//! 数量可能是数字或字符串。这里在边界一次性收敛成 [`ProductGroup`]。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::group::{ProductGroup, Variant};

/// One denormalized group as returned by the group-read endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroup {
    #[serde(default)]
    pub docid: Option<String>,
    #[serde(default, alias = "variant_group_id", alias = "groupId")]
    pub variant_group_id: String,
    #[serde(default, alias = "series_id")]
    pub series_id: Option<String>,
    #[serde(default, alias = "product_name")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub vol: Option<String>,
    #[serde(default, alias = "release_date")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub types: Value,
    #[serde(default)]
    pub damages: Value,
    #[serde(default)]
    pub sealing: Value,
    #[serde(default, alias = "total_quantity")]
    pub total_quantity: Value,
    #[serde(default)]
    pub variants: Vec<RawVariant>,
}

/// One joined variant + inventory record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariant {
    #[serde(default, alias = "inventory_id")]
    pub inventory_id: Value,
    #[serde(default, alias = "variant_sku", alias = "variant_id")]
    pub variant_sku: Value,
    #[serde(default, alias = "type")]
    pub types: Value,
    #[serde(default)]
    pub damages: Value,
    #[serde(default)]
    pub sealing: Value,
    #[serde(default, alias = "storage_location", alias = "location", alias = "storage")]
    pub storage_location: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default, alias = "unit_price")]
    pub unit_price: Value,
    #[serde(default, alias = "status_tokens", alias = "status")]
    pub status_tokens: Value,
    #[serde(default)]
    pub barcode: Value,
    #[serde(default, alias = "note")]
    pub notes: Value,
    #[serde(default, alias = "created_at")]
    pub created_at: Value,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Value,
}

/// Full listing response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListing {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub total_groups: usize,
    #[serde(default)]
    pub items: Vec<RawGroup>,
}

// ========== Coercion helpers ==========

/// Array → non-empty strings; string → one-element list; anything else → empty
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => scalar_string(other)
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect(),
    }
}

/// String as-is, array joined with `|`
fn joined(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join("|"),
        other => scalar_string(other).unwrap_or_default(),
    }
}

/// String as-is, array → first element
fn first_or_string(value: &Value) -> String {
    match value {
        Value::Array(items) => items.first().and_then(scalar_string).unwrap_or_default(),
        other => scalar_string(other).unwrap_or_default(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Integer quantity; fractional values are truncated, garbage becomes 0
fn as_quantity(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        other => as_f64(other).map(|f| f as i64).unwrap_or(0),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<RawVariant> for Variant {
    fn from(raw: RawVariant) -> Self {
        Variant {
            inventory_id: scalar_string(&raw.inventory_id).unwrap_or_default(),
            variant_sku: scalar_string(&raw.variant_sku).unwrap_or_default(),
            variant_type: joined(&raw.types),
            damages: joined(&raw.damages),
            sealing: joined(&raw.sealing),
            storage_location: first_or_string(&raw.storage_location),
            quantity: as_quantity(&raw.quantity),
            unit_price: as_f64(&raw.unit_price),
            status_tokens: joined(&raw.status_tokens),
            barcode: scalar_string(&raw.barcode).unwrap_or_default(),
            notes: scalar_string(&raw.notes).unwrap_or_default(),
            created_at: scalar_string(&raw.created_at).unwrap_or_default(),
            updated_at: scalar_string(&raw.updated_at).unwrap_or_default(),
            ..Default::default()
        }
    }
}

impl From<RawGroup> for ProductGroup {
    fn from(raw: RawGroup) -> Self {
        let mut group = ProductGroup {
            group_id: raw.variant_group_id,
            docid: non_blank(raw.docid),
            series_id: raw.series_id.unwrap_or_default(),
            product_name: raw.product_name.unwrap_or_default(),
            vol: raw.vol.unwrap_or_default(),
            release_date: non_blank(raw.release_date),
            category: raw.category.unwrap_or_default(),
            types: string_list(&raw.types),
            damages: string_list(&raw.damages),
            sealing: string_list(&raw.sealing),
            total_quantity: as_quantity(&raw.total_quantity),
            variants: raw.variants.into_iter().map(Variant::from).collect(),
        };
        group.sync_variant_refs();
        group
    }
}
