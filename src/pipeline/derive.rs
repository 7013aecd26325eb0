//! Pure derivation of the item collection from cached payloads
//!
//! ```text
//!   profile ──flatten──> entries ──filter──> ──enrich(catalog)──> items ──sort──> ──duplicates──>
//! ```
//!
//! Nothing here touches the network; toggling filters only re-runs these steps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{Catalog, InventoryItem, Item, ItemType, ProfileResponse, TierType};

/// User-facing filters applied during derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryFilters {
    pub category: ItemType,
    pub exclude_tier: Option<TierType>,
    pub duplicates_only: bool,
}

impl Default for InventoryFilters {
    fn default() -> Self {
        Self {
            category: ItemType::WEAPON,
            exclude_tier: None,
            duplicates_only: false,
        }
    }
}

/// Account-wide inventory, then each character's inventory and equipment
pub fn flatten(profile: &ProfileResponse) -> Vec<&InventoryItem> {
    let mut entries: Vec<&InventoryItem> = profile
        .profile_inventory
        .data
        .iter()
        .flat_map(|list| list.items.iter())
        .collect();

    // character maps are keyed by id; walk them in a stable order
    for characters in [&profile.character_inventories, &profile.character_equipment] {
        if let Some(by_character) = &characters.data {
            let mut ids: Vec<&String> = by_character.keys().collect();
            ids.sort();
            for id in ids {
                entries.extend(by_character[id].items.iter());
            }
        }
    }
    entries
}

/// Category and tier filter. Entries without a catalog definition are dropped.
pub fn filter_entries<'p>(
    entries: Vec<&'p InventoryItem>,
    catalog: &Catalog,
    filters: &InventoryFilters,
) -> Vec<&'p InventoryItem> {
    entries
        .into_iter()
        .filter(|entry| match catalog.item(entry.item_hash) {
            Some(definition) => {
                definition.item_type == filters.category
                    && !(filters.exclude_tier.is_some()
                        && definition.tier() == filters.exclude_tier)
            }
            None => false,
        })
        .collect()
}

/// Join instance/stat/perk components and compute the dimension values
pub fn enrich(entry: &InventoryItem, profile: &ProfileResponse, catalog: &Catalog) -> Option<Item> {
    let definition = catalog.item(entry.item_hash)?.clone();
    let components = &profile.item_components;

    let lookup = |id: &str| {
        (
            components.instances.data.as_ref().and_then(|m| m.get(id)).cloned(),
            components.stats.data.as_ref().and_then(|m| m.get(id)).cloned(),
            components
                .perks
                .data
                .as_ref()
                .and_then(|m| m.get(id))
                .map(|p| p.perks.clone())
                .unwrap_or_default(),
        )
    };
    let (instance, stats, perks) = match entry.item_instance_id.as_deref() {
        Some(id) => lookup(id),
        None => (None, None, Vec::new()),
    };

    let slot = definition
        .inventory
        .as_ref()
        .map(|i| i.bucket_type_hash)
        .unwrap_or(entry.bucket_hash);
    let damage_type = definition.default_damage_type_hash.unwrap_or(0);
    let sub_type = u32::try_from(definition.item_sub_type).unwrap_or(0);
    let intrinsic = definition.intrinsic_hash().unwrap_or(0);

    Some(Item {
        entry: entry.clone(),
        definition,
        instance,
        stats,
        perks,
        slot,
        damage_type,
        sub_type,
        intrinsic,
    })
}

/// Name ascending, ties broken by power descending
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| b.power().cmp(&a.power())));
}

/// Keep entries whose item hash occurs more than once, in their current order
pub fn retain_duplicates(items: &mut Vec<Item>) {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for item in items.iter() {
        *counts.entry(item.item_hash()).or_default() += 1;
    }
    items.retain(|item| counts.get(&item.item_hash()).copied().unwrap_or(0) > 1);
}

/// The full derivation in its fixed order
pub fn derive_items(
    profile: &ProfileResponse,
    catalog: &Catalog,
    filters: &InventoryFilters,
) -> Vec<Item> {
    let entries = filter_entries(flatten(profile), catalog, filters);
    let mut items: Vec<Item> = entries
        .into_iter()
        .filter_map(|entry| enrich(entry, profile, catalog))
        .collect();

    sort_items(&mut items);
    if filters.duplicates_only {
        retain_duplicates(&mut items);
    }

    tracing::debug!(
        count = items.len(),
        category = filters.category.0,
        duplicates_only = filters.duplicates_only,
        "Derived items"
    );
    items
}
