//! Merge candidate search

use shared::models::ProductGroup;

fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Groups sharing the candidate's product name (trimmed, case-insensitive), excluding itself
pub fn find_merge_candidates<'a>(
    candidate: &ProductGroup,
    all_groups: &'a [ProductGroup],
) -> Vec<&'a ProductGroup> {
    let name = normalized_name(&candidate.product_name);
    if name.is_empty() {
        return Vec::new();
    }
    all_groups
        .iter()
        .filter(|g| g.group_id != candidate.group_id)
        .filter(|g| normalized_name(&g.product_name) == name)
        .collect()
}

/// Largest total quantity wins, ties broken by variant count; first wins a full tie
pub fn select_best_merge_target<'a>(candidates: &[&'a ProductGroup]) -> Option<&'a ProductGroup> {
    let mut best: Option<&'a ProductGroup> = None;
    for &group in candidates {
        let better = match best {
            None => true,
            Some(current) => {
                (group.total_quantity, group.variants.len())
                    > (current.total_quantity, current.variants.len())
            }
        };
        if better {
            best = Some(group);
        }
    }
    best
}

/// Best merge target for a group, or `None` when no other group shares its name
pub fn suggest_merge<'a>(
    candidate: &ProductGroup,
    all_groups: &'a [ProductGroup],
) -> Option<&'a ProductGroup> {
    select_best_merge_target(&find_merge_candidates(candidate, all_groups))
}
