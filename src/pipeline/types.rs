//! Remote API payload types and the enriched [`Item`]
//!
//! Only the fields the pipeline reads are mapped; everything else in the
//! platform responses is ignored by serde.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::breakdown::ItemDimension;
use crate::index::DimValue;

/// Socket type of the intrinsic (frame) socket on weapons
pub const INTRINSIC_SOCKET_TYPE_HASH: u32 = 3956125808;

/// Item type discriminant (`DestinyItemType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemType(pub i32);

impl ItemType {
    pub const ARMOR: ItemType = ItemType(2);
    pub const WEAPON: ItemType = ItemType(3);
}

/// Rarity tier (`TierType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierType(pub i32);

impl TierType {
    pub const COMMON: TierType = TierType(3);
    pub const RARE: TierType = TierType(4);
    pub const LEGENDARY: TierType = TierType(5);
    pub const EXOTIC: TierType = TierType(6);
}

// =============================================================================
// Membership
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoCard {
    pub membership_id: String,
    pub membership_type: i32,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// `User/GetMembershipsForCurrentUser` payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipData {
    #[serde(default)]
    pub destiny_memberships: Vec<UserInfoCard>,
    #[serde(default)]
    pub primary_membership_id: Option<String>,
}

impl MembershipData {
    /// The primary membership id, falling back to the first Destiny membership
    pub fn primary_membership_id(&self) -> Option<&str> {
        self.primary_membership_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.destiny_memberships
                    .first()
                    .map(|m| m.membership_id.as_str())
            })
    }

    pub fn primary_membership(&self) -> Option<&UserInfoCard> {
        let id = self.primary_membership_id()?;
        self.destiny_memberships
            .iter()
            .find(|m| m.membership_id == id)
    }

    pub fn primary_membership_type(&self) -> Option<i32> {
        self.primary_membership().map(|m| m.membership_type)
    }
}

// =============================================================================
// Profile
// =============================================================================

/// A profile component; `data` is absent when privacy settings hide it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Component<T> {
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Default for Component<T> {
    fn default() -> Self {
        Self { data: None }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InventoryList {
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

/// Raw inventory entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_hash: u32,
    #[serde(default)]
    pub item_instance_id: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub bucket_hash: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub stat_hash: u32,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    #[serde(default)]
    pub primary_stat: Option<Stat>,
    #[serde(default)]
    pub damage_type_hash: Option<u32>,
    #[serde(default)]
    pub item_level: i32,
    #[serde(default)]
    pub is_equipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Perk {
    pub perk_hash: u32,
    #[serde(default)]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemPerks {
    #[serde(default)]
    pub perks: Vec<Perk>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ItemStats {
    #[serde(default)]
    pub stats: HashMap<u32, Stat>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemComponents {
    #[serde(default)]
    pub instances: Component<HashMap<String, ItemInstance>>,
    #[serde(default)]
    pub perks: Component<HashMap<String, ItemPerks>>,
    #[serde(default)]
    pub stats: Component<HashMap<String, ItemStats>>,
}

/// `Destiny2/{type}/Profile/{id}` payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(default)]
    pub profile_inventory: Component<InventoryList>,
    #[serde(default)]
    pub character_inventories: Component<HashMap<String, InventoryList>>,
    #[serde(default)]
    pub character_equipment: Component<HashMap<String, InventoryList>>,
    #[serde(default)]
    pub item_components: ItemComponents,
}

// =============================================================================
// Catalog (manifest definitions)
// =============================================================================

/// `Destiny2/Manifest` payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    /// language -> table name -> content path
    #[serde(default)]
    pub json_world_component_content_paths: HashMap<String, HashMap<String, String>>,
}

impl Manifest {
    pub fn table_path(&self, language: &str, table: &str) -> Option<&str> {
        self.json_world_component_content_paths
            .get(language)?
            .get(table)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProperties {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Any definition where only the hash and display properties matter
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedDefinition {
    pub hash: u32,
    #[serde(default)]
    pub display_properties: DisplayProperties,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategoryDefinition {
    pub hash: u32,
    #[serde(default)]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub grant_destiny_item_type: ItemType,
    #[serde(default)]
    pub grant_destiny_sub_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInventoryBlock {
    #[serde(default)]
    pub bucket_type_hash: u32,
    #[serde(default)]
    pub tier_type: TierType,
    #[serde(default)]
    pub tier_type_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketEntry {
    pub socket_type_hash: u32,
    #[serde(default)]
    pub single_initial_item_hash: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSockets {
    #[serde(default)]
    pub socket_entries: Vec<SocketEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    pub hash: u32,
    #[serde(default)]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub item_sub_type: i32,
    #[serde(default)]
    pub inventory: Option<ItemInventoryBlock>,
    #[serde(default)]
    pub default_damage_type: i32,
    #[serde(default)]
    pub default_damage_type_hash: Option<u32>,
    #[serde(default)]
    pub sockets: Option<ItemSockets>,
}

impl ItemDefinition {
    pub fn tier(&self) -> Option<TierType> {
        self.inventory.as_ref().map(|i| i.tier_type)
    }

    /// Plug initially socketed into the intrinsic socket
    pub fn intrinsic_hash(&self) -> Option<u32> {
        self.sockets
            .as_ref()?
            .socket_entries
            .iter()
            .find(|s| s.socket_type_hash == INTRINSIC_SOCKET_TYPE_HASH)
            .map(|s| s.single_initial_item_hash)
    }
}

/// The definition tables the pipeline joins against
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub version: String,
    pub items: HashMap<u32, ItemDefinition>,
    pub buckets: HashMap<u32, NamedDefinition>,
    pub damage_types: HashMap<u32, NamedDefinition>,
    pub perks: HashMap<u32, NamedDefinition>,
    pub stats: HashMap<u32, NamedDefinition>,
    pub item_categories: HashMap<u32, ItemCategoryDefinition>,
}

impl Catalog {
    pub const ITEM_TABLE: &'static str = "DestinyInventoryItemDefinition";
    pub const BUCKET_TABLE: &'static str = "DestinyInventoryBucketDefinition";
    pub const DAMAGE_TYPE_TABLE: &'static str = "DestinyDamageTypeDefinition";
    pub const PERK_TABLE: &'static str = "DestinySandboxPerkDefinition";
    pub const STAT_TABLE: &'static str = "DestinyStatDefinition";
    pub const ITEM_CATEGORY_TABLE: &'static str = "DestinyItemCategoryDefinition";

    pub fn item(&self, hash: u32) -> Option<&ItemDefinition> {
        self.items.get(&hash)
    }

    /// Item category granting the given weapon subtype
    pub fn weapon_sub_type(&self, sub_type: i32) -> Option<&ItemCategoryDefinition> {
        self.item_categories.values().find(|c| {
            c.grant_destiny_item_type == ItemType::WEAPON && c.grant_destiny_sub_type == sub_type
        })
    }

    pub fn perk_name(&self, hash: u32) -> Option<&str> {
        self.perks
            .get(&hash)
            .map(|p| p.display_properties.name.as_str())
    }

    /// Display properties describing `value` of `dimension`
    pub fn dimension_properties(
        &self,
        dimension: ItemDimension,
        value: DimValue,
    ) -> Option<&DisplayProperties> {
        match dimension {
            ItemDimension::Slot => self.buckets.get(&value).map(|d| &d.display_properties),
            ItemDimension::DamageType => {
                self.damage_types.get(&value).map(|d| &d.display_properties)
            }
            ItemDimension::SubType => self
                .weapon_sub_type(value as i32)
                .map(|c| &c.display_properties),
            ItemDimension::Intrinsic => self.items.get(&value).map(|d| &d.display_properties),
        }
    }
}

// =============================================================================
// Enriched item
// =============================================================================

/// Inventory entry joined with its definition, instance data and dimension values
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub entry: InventoryItem,
    pub definition: ItemDefinition,
    pub instance: Option<ItemInstance>,
    pub stats: Option<ItemStats>,
    pub perks: Vec<Perk>,
    pub slot: DimValue,
    pub damage_type: DimValue,
    pub sub_type: DimValue,
    pub intrinsic: DimValue,
}

impl Item {
    pub fn name(&self) -> &str {
        &self.definition.display_properties.name
    }

    pub fn item_hash(&self) -> u32 {
        self.entry.item_hash
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.entry.item_instance_id.as_deref()
    }

    /// Primary stat value (power level); 0 for uninstanced items
    pub fn power(&self) -> i32 {
        self.instance
            .as_ref()
            .and_then(|i| i.primary_stat)
            .map(|s| s.value)
            .unwrap_or(0)
    }

    pub fn tier(&self) -> Option<TierType> {
        self.definition.tier()
    }

    pub fn visible_perks(&self) -> impl Iterator<Item = &Perk> {
        self.perks.iter().filter(|p| p.visible)
    }

    pub fn stat(&self, stat_hash: u32) -> Option<i32> {
        self.stats.as_ref()?.stats.get(&stat_hash).map(|s| s.value)
    }
}
