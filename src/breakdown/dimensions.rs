//! Item dimensions and their catalog-backed descriptors

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::DimensionDescriptor;
use crate::index::{DimValue, Dimensioned, Subset};
use crate::pipeline::types::{Catalog, Item};

/// The fixed set of dimensions an [`Item`] is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemDimension {
    /// Inventory bucket (kinetic / energy / power)
    #[serde(rename = "inventoryBucketHash")]
    Slot,
    #[serde(rename = "damageTypeHash")]
    DamageType,
    /// Weapon type (auto rifle, hand cannon, ...)
    #[serde(rename = "itemSubType")]
    SubType,
    /// Intrinsic archetype / frame
    #[serde(rename = "intrinsicsHash")]
    Intrinsic,
}

impl ItemDimension {
    pub const ALL: [ItemDimension; 4] = [
        ItemDimension::Slot,
        ItemDimension::DamageType,
        ItemDimension::SubType,
        ItemDimension::Intrinsic,
    ];

    /// Raw key name, also the fallback label when the catalog has no entry
    pub fn key(&self) -> &'static str {
        match self {
            ItemDimension::Slot => "inventoryBucketHash",
            ItemDimension::DamageType => "damageTypeHash",
            ItemDimension::SubType => "itemSubType",
            ItemDimension::Intrinsic => "intrinsicsHash",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ItemDimension::Slot => "Inventory Slot",
            ItemDimension::DamageType => "Damage Type",
            ItemDimension::SubType => "Weapon Type",
            ItemDimension::Intrinsic => "Intrinsic Archetype",
        }
    }
}

impl fmt::Display for ItemDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ItemDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemDimension::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| format!("Unknown dimension '{}'", s))
    }
}

impl Dimensioned<ItemDimension> for Item {
    fn dimension_value(&self, dimension: ItemDimension) -> DimValue {
        match dimension {
            ItemDimension::Slot => self.slot,
            ItemDimension::DamageType => self.damage_type,
            ItemDimension::SubType => self.sub_type,
            ItemDimension::Intrinsic => self.intrinsic,
        }
    }
}

/// Title payload of a breakdown group, handed to the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTitle {
    pub name: String,
    pub count: usize,
    pub icon: Option<String>,
    /// Instance ids of the items in the group
    pub instance_ids: Vec<String>,
}

impl GroupTitle {
    pub fn basic(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            count,
            icon: None,
            instance_ids: Vec::new(),
        }
    }

    /// "1 item" / "3 items"
    pub fn count_label(&self) -> String {
        format!(
            "{} item{}",
            self.count,
            if self.count == 1 { "" } else { "s" }
        )
    }

    /// DIM search query selecting exactly the items of this group
    pub fn dim_query(&self) -> String {
        self.instance_ids
            .iter()
            .map(|id| format!("id:{}", id))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

fn item_title(
    name: &str,
    icon: Option<String>,
    subset: &Subset<'_, Item, ItemDimension>,
) -> GroupTitle {
    GroupTitle {
        name: name.to_string(),
        count: subset.len(),
        icon,
        instance_ids: subset
            .items()
            .filter_map(|item| item.instance_id().map(str::to_string))
            .collect(),
    }
}

/// Descriptor for `dimension` whose names and icons come from `catalog`
pub fn item_descriptor(
    dimension: ItemDimension,
    catalog: Arc<Catalog>,
) -> DimensionDescriptor<'static, Item, ItemDimension> {
    let names = Arc::clone(&catalog);
    DimensionDescriptor::new(
        dimension,
        move |value| {
            names
                .dimension_properties(dimension, value)
                .map(|p| p.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| dimension.key().to_string())
        },
        move |value, name, subset| {
            let icon = catalog
                .dimension_properties(dimension, value)
                .and_then(|p| p.icon.clone());
            item_title(name, icon, subset)
        },
    )
}

/// Descriptors for `dimensions`, in the given order
pub fn item_descriptors(
    dimensions: &[ItemDimension],
    catalog: &Arc<Catalog>,
) -> Vec<DimensionDescriptor<'static, Item, ItemDimension>> {
    dimensions
        .iter()
        .map(|&d| item_descriptor(d, Arc::clone(catalog)))
        .collect()
}
