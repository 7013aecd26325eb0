//! InventorySource trait and the live Bungie.net implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::types::{Catalog, Manifest, MembershipData, ProfileResponse};
use crate::error::{require, Result};
use crate::gateway::{ApiRequest, RequestGateway};
use crate::resource::{AsyncResource, Fetch, ResourceOptions};

/// Profile components requested: profile inventories, character inventories,
/// character equipment, item instances, item perks, item stats
pub const PROFILE_COMPONENTS: &str = "102,201,205,300,302,304";

/// Remote payloads the pipeline composes
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Memberships of the logged-in account
    async fn membership(&self) -> Result<MembershipData>;

    async fn profile(&self, membership_type: i32, membership_id: &str) -> Result<ProfileResponse>;

    /// Reference definitions joined during derivation
    async fn catalog(&self) -> Result<Catalog>;
}

// =============================================================================
// Bungie.net
// =============================================================================

struct ManifestFetch {
    gateway: Arc<RequestGateway>,
    base_url: String,
}

#[async_trait]
impl Fetch<Manifest> for ManifestFetch {
    async fn fetch(&self) -> Result<Manifest> {
        let url = format!("{}/Platform/Destiny2/Manifest/", self.base_url);
        let manifest: Manifest = self.gateway.anonymous(ApiRequest::get(url)).await?;
        if manifest.version.is_empty() {
            return Err(crate::Error::precondition(
                "could not download Destiny 2 manifest",
            ));
        }
        Ok(manifest)
    }

    fn describe(&self) -> &str {
        "manifest"
    }
}

/// Source backed by the platform API through a [`RequestGateway`]
pub struct BungieSource {
    gateway: Arc<RequestGateway>,
    base_url: String,
    language: String,
    manifest: AsyncResource<Manifest>,
}

impl BungieSource {
    pub fn new(
        gateway: Arc<RequestGateway>,
        base_url: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let manifest = AsyncResource::new(
            ManifestFetch {
                gateway: Arc::clone(&gateway),
                base_url: base_url.clone(),
            },
            ResourceOptions::new(),
        );

        Self {
            gateway,
            base_url,
            language: language.into(),
            manifest,
        }
    }

    pub fn manifest(&self) -> &AsyncResource<Manifest> {
        &self.manifest
    }

    async fn table<V: DeserializeOwned>(
        &self,
        manifest: &Manifest,
        table: &str,
    ) -> Result<HashMap<u32, V>> {
        let path = require(
            manifest.table_path(&self.language, table),
            &format!("manifest has no {} table for '{}'", table, self.language),
        )?;
        tracing::debug!(table, version = %manifest.version, "Downloading definitions");
        self.gateway
            .anonymous_json(ApiRequest::get(format!("{}{}", self.base_url, path)))
            .await
    }
}

#[async_trait]
impl InventorySource for BungieSource {
    async fn membership(&self) -> Result<MembershipData> {
        let url = format!(
            "{}/Platform/User/GetMembershipsForCurrentUser/",
            self.base_url
        );
        self.gateway.authenticated(ApiRequest::get(url)).await
    }

    async fn profile(&self, membership_type: i32, membership_id: &str) -> Result<ProfileResponse> {
        let url = format!(
            "{}/Platform/Destiny2/{}/Profile/{}/",
            self.base_url, membership_type, membership_id
        );
        self.gateway
            .authenticated(ApiRequest::get(url).param("components", PROFILE_COMPONENTS))
            .await
    }

    async fn catalog(&self) -> Result<Catalog> {
        let manifest = self.manifest.get(false).await?;

        // one table at a time; the item table alone is large
        let catalog = Catalog {
            version: manifest.version.clone(),
            items: self.table(&manifest, Catalog::ITEM_TABLE).await?,
            buckets: self.table(&manifest, Catalog::BUCKET_TABLE).await?,
            damage_types: self.table(&manifest, Catalog::DAMAGE_TYPE_TABLE).await?,
            perks: self.table(&manifest, Catalog::PERK_TABLE).await?,
            stats: self.table(&manifest, Catalog::STAT_TABLE).await?,
            item_categories: self.table(&manifest, Catalog::ITEM_CATEGORY_TABLE).await?,
        };

        tracing::info!(
            version = %catalog.version,
            items = catalog.items.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }
}

impl std::fmt::Debug for BungieSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BungieSource")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryStore, SessionManager, TokenSession};
    use crate::gateway::{ApiResponse, HttpTransport, TracingLoginRouter};
    use crate::Error;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers by URL path; records every URL requested
    struct Routes {
        routes: HashMap<String, serde_json::Value>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpTransport for Routes {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            let url = request.full_url()?;
            self.seen.lock().unwrap().push(url.to_string());
            match self.routes.get(url.path()) {
                Some(body) => Ok(ApiResponse::new(200, body.to_string())),
                None => Ok(ApiResponse::new(404, "{}")),
            }
        }
    }

    fn envelope(response: serde_json::Value) -> serde_json::Value {
        json!({"Response": response, "ErrorCode": 1, "ErrorStatus": "Success", "Message": "Ok"})
    }

    fn make_source(routes: Vec<(&str, serde_json::Value)>) -> (BungieSource, Arc<Routes>) {
        let transport = Arc::new(Routes {
            routes: routes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            seen: Mutex::new(Vec::new()),
        });
        let sessions = Arc::new(SessionManager::load(Arc::new(MemoryStore::new())));
        sessions
            .set_session(TokenSession {
                access_token: "t".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
                membership_id: "1".to_string(),
                issued_at: Utc::now(),
            })
            .unwrap();
        let gateway = Arc::new(RequestGateway::new(
            transport.clone(),
            "key",
            "vault-breakdown",
            sessions,
            Arc::new(TracingLoginRouter),
        ));
        (
            BungieSource::new(gateway, "https://www.bungie.net/", "en"),
            transport,
        )
    }

    fn manifest_paths() -> serde_json::Value {
        let tables = [
            Catalog::ITEM_TABLE,
            Catalog::BUCKET_TABLE,
            Catalog::DAMAGE_TYPE_TABLE,
            Catalog::PERK_TABLE,
            Catalog::STAT_TABLE,
            Catalog::ITEM_CATEGORY_TABLE,
        ];
        let paths: serde_json::Map<String, serde_json::Value> = tables
            .iter()
            .map(|t| (t.to_string(), json!(format!("/common/destiny2_content/json/en/{}.json", t))))
            .collect();
        json!({ "en": paths })
    }

    #[tokio::test]
    async fn test_catalog_downloads_each_table() {
        let mut routes = vec![(
            "/Platform/Destiny2/Manifest/",
            envelope(json!({
                "version": "226451.24.03.01.1730-1",
                "jsonWorldComponentContentPaths": manifest_paths()
            })),
        )];
        let item_path = format!(
            "/common/destiny2_content/json/en/{}.json",
            Catalog::ITEM_TABLE
        );
        let others: Vec<String> = [
            Catalog::BUCKET_TABLE,
            Catalog::DAMAGE_TYPE_TABLE,
            Catalog::PERK_TABLE,
            Catalog::STAT_TABLE,
            Catalog::ITEM_CATEGORY_TABLE,
        ]
        .iter()
        .map(|t| format!("/common/destiny2_content/json/en/{}.json", t))
        .collect();
        routes.push((
            item_path.as_str(),
            json!({"347366834": {"hash": 347366834u32, "displayProperties": {"name": "Ace of Spades"}, "itemType": 3}}),
        ));
        for path in &others {
            routes.push((path.as_str(), json!({})));
        }

        let (source, transport) = make_source(routes);
        let catalog = source.catalog().await.unwrap();

        assert_eq!(catalog.version, "226451.24.03.01.1730-1");
        assert_eq!(catalog.items[&347366834].display_properties.name, "Ace of Spades");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 7);
        assert!(seen[1..].iter().all(|u| u.ends_with("?cachebusting=vault-breakdown")));
    }

    #[tokio::test]
    async fn test_manifest_without_version_is_precondition() {
        let (source, _) = make_source(vec![(
            "/Platform/Destiny2/Manifest/",
            envelope(json!({"version": ""})),
        )]);

        let err = source.catalog().await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(source.manifest().error().is_some());
    }

    #[tokio::test]
    async fn test_profile_requests_components() {
        let (source, transport) = make_source(vec![(
            "/Platform/Destiny2/3/Profile/4611686018467284386/",
            envelope(json!({})),
        )]);

        source.profile(3, "4611686018467284386").await.unwrap();
        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            "https://www.bungie.net/Platform/Destiny2/3/Profile/4611686018467284386/?components=102%2C201%2C205%2C300%2C302%2C304"
        );
    }
}
