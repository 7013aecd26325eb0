//! DataPipeline - dependent fetch orchestration and item derivation
//!
//! ```text
//!   membership ──> profile(type, id) ──> catalog
//!        │               │                  │
//!        └───────── AsyncResource each ─────┘
//!                        │
//!                 derive_items(filters) ──> AttributeIndex
//! ```
//!
//! Steps run strictly in order; a failed step ends `populate` with that
//! step's error and nothing after it is attempted.

pub mod derive;
pub mod source;
pub mod types;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::breakdown::ItemDimension;
use crate::error::{require, Error, Result};
use crate::index::AttributeIndex;
use crate::resource::{AsyncResource, Fetch, ResourceOptions};

pub use derive::{derive_items, InventoryFilters};
pub use source::{BungieSource, InventorySource};
pub use types::{Catalog, Item, ItemType, MembershipData, ProfileResponse, TierType};

// =============================================================================
// Fetchers
// =============================================================================

struct MembershipFetch {
    source: Arc<dyn InventorySource>,
}

#[async_trait]
impl Fetch<MembershipData> for MembershipFetch {
    async fn fetch(&self) -> Result<MembershipData> {
        let membership = self.source.membership().await?;
        if membership.destiny_memberships.is_empty() {
            return Err(Error::precondition(
                "We couldn't find any memberships on your account",
            ));
        }
        // the primary id has to resolve to an entry carrying the membership type
        if membership.primary_membership().is_none() {
            return Err(Error::precondition("membership not found"));
        }
        Ok(membership)
    }

    fn describe(&self) -> &str {
        "membership"
    }
}

struct ProfileFetch {
    source: Arc<dyn InventorySource>,
    membership_type: i32,
    membership_id: String,
}

#[async_trait]
impl Fetch<ProfileResponse> for ProfileFetch {
    async fn fetch(&self) -> Result<ProfileResponse> {
        self.source
            .profile(self.membership_type, &self.membership_id)
            .await
    }

    fn describe(&self) -> &str {
        "profile"
    }
}

struct CatalogFetch {
    source: Arc<dyn InventorySource>,
}

#[async_trait]
impl Fetch<Catalog> for CatalogFetch {
    async fn fetch(&self) -> Result<Catalog> {
        self.source.catalog().await
    }

    fn describe(&self) -> &str {
        "catalog"
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProfileKey {
    membership_type: i32,
    membership_id: String,
}

type ProfileSlot = Option<(ProfileKey, Arc<AsyncResource<ProfileResponse>>)>;

pub struct DataPipeline {
    source: Arc<dyn InventorySource>,
    membership: AsyncResource<MembershipData>,
    profile: Mutex<ProfileSlot>,
    catalog: Arc<AsyncResource<Catalog>>,
}

impl DataPipeline {
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        let catalog = Arc::new(AsyncResource::new(
            CatalogFetch {
                source: Arc::clone(&source),
            },
            ResourceOptions::new(),
        ));
        Self::with_catalog(source, catalog)
    }

    /// Pipeline sharing an existing catalog resource
    pub fn with_catalog(
        source: Arc<dyn InventorySource>,
        catalog: Arc<AsyncResource<Catalog>>,
    ) -> Self {
        let membership = AsyncResource::new(
            MembershipFetch {
                source: Arc::clone(&source),
            },
            ResourceOptions::new(),
        );

        Self {
            source,
            membership,
            profile: Mutex::new(None),
            catalog,
        }
    }

    /// Fetch anything not yet cached
    pub async fn populate(&self) -> Result<()> {
        self.run(false).await
    }

    /// Refetch membership and profile. The catalog is kept.
    pub async fn refresh(&self) -> Result<()> {
        self.run(true).await
    }

    async fn run(&self, force: bool) -> Result<()> {
        let membership = self.membership.get(force).await?;
        let primary = require(membership.primary_membership(), "membership not found")?;
        let membership_type = primary.membership_type;
        let membership_id = primary.membership_id.as_str();

        let profile = self.profile_resource(membership_type, membership_id);
        profile.get(force).await?;

        self.catalog.get(false).await?;

        tracing::info!(
            membership_type,
            membership_id = %membership_id,
            "Pipeline populated"
        );
        Ok(())
    }

    // a new resource whenever the identity changes
    fn profile_resource(
        &self,
        membership_type: i32,
        membership_id: &str,
    ) -> Arc<AsyncResource<ProfileResponse>> {
        let key = ProfileKey {
            membership_type,
            membership_id: membership_id.to_string(),
        };
        let mut slot = self.profile.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((current, resource)) = slot.as_ref() {
            if *current == key {
                return Arc::clone(resource);
            }
        }

        tracing::debug!(membership_type, membership_id, "Creating profile resource");
        let resource = Arc::new(AsyncResource::new(
            ProfileFetch {
                source: Arc::clone(&self.source),
                membership_type,
                membership_id: membership_id.to_string(),
            },
            ResourceOptions::new(),
        ));
        *slot = Some((key, Arc::clone(&resource)));
        resource
    }

    fn current_profile(&self) -> Option<Arc<AsyncResource<ProfileResponse>>> {
        self.profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, resource)| Arc::clone(resource))
    }

    /// First failure in dependency order: membership, profile, catalog
    pub fn error(&self) -> Option<Error> {
        self.membership
            .error()
            .or_else(|| self.current_profile().and_then(|p| p.error()))
            .or_else(|| self.catalog.error())
    }

    pub fn is_fetching(&self) -> bool {
        self.membership.is_fetching()
            || self.current_profile().is_some_and(|p| p.is_fetching())
            || self.catalog.is_fetching()
    }

    pub fn membership(&self) -> &AsyncResource<MembershipData> {
        &self.membership
    }

    pub fn catalog(&self) -> &Arc<AsyncResource<Catalog>> {
        &self.catalog
    }

    pub fn profile(&self) -> Option<Arc<ProfileResponse>> {
        self.current_profile()?.data()
    }

    /// Derived items, or `None` until profile and catalog are both cached
    pub fn items(&self, filters: &InventoryFilters) -> Option<Vec<Item>> {
        let profile = self.profile()?;
        let catalog = self.catalog.data()?;
        Some(derive_items(&profile, &catalog, filters))
    }

    pub fn index(
        &self,
        filters: &InventoryFilters,
        dimensions: &[ItemDimension],
    ) -> Option<AttributeIndex<Item, ItemDimension>> {
        self.items(filters)
            .map(|items| AttributeIndex::build(items, dimensions))
    }
}

impl std::fmt::Debug for DataPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPipeline")
            .field("fetching", &self.is_fetching())
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}
