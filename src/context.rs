//! AppContext - everything the application shares, built once at startup
//!
//! ```text
//!   AppConfig ─> FileStore ─> SessionManager ─┐
//!                ReqwestTransport ────────────┼─> RequestGateway ─> BungieSource ─> DataPipeline
//!                LoginRouter ─────────────────┘                                         │
//!                                                                              InventoryView
//! ```

use std::sync::Arc;

use crate::auth::{FileStore, KeyValueStore, OAuthLogin, SessionManager};
use crate::breakdown::{breakdown, item_descriptors, BreakdownNode, ItemDimension, SortMode};
use crate::config::{AppConfig, BreakdownConfig};
use crate::error::Result;
use crate::gateway::{
    HttpTransport, LoginRouter, RequestGateway, ReqwestTransport, TracingLoginRouter,
};
use crate::index::AttributeIndex;
use crate::pipeline::{BungieSource, Catalog, DataPipeline, InventoryFilters, Item};

pub struct AppContext {
    config: AppConfig,
    sessions: Arc<SessionManager>,
    gateway: Arc<RequestGateway>,
    login: OAuthLogin,
    pipeline: DataPipeline,
}

impl AppContext {
    /// Production wiring: file-backed storage and the reqwest transport
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Arc::new(FileStore::open(&config.storage_dir)?);
        let transport = Arc::new(ReqwestTransport::new(config.timeout())?);
        Ok(Self::with_parts(
            config,
            transport,
            store,
            Arc::new(TracingLoginRouter),
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        router: Arc<dyn LoginRouter>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::load(Arc::clone(&store)));
        let gateway = Arc::new(RequestGateway::new(
            Arc::clone(&transport),
            config.api_key.clone(),
            config.app_name.clone(),
            Arc::clone(&sessions),
            router,
        ));
        let login = OAuthLogin::new(config.oauth_settings(), transport, store);
        let source = Arc::new(BungieSource::new(
            Arc::clone(&gateway),
            config.base_url.clone(),
            config.language.clone(),
        ));
        let pipeline = DataPipeline::new(source);

        tracing::info!(
            base_url = %config.base_url,
            logged_in = sessions.is_logged_in(),
            "Context ready"
        );

        Self {
            config,
            sessions,
            gateway,
            login,
            pipeline,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    pub fn login(&self) -> &OAuthLogin {
        &self.login
    }

    pub fn pipeline(&self) -> &DataPipeline {
        &self.pipeline
    }

    /// Finish an OAuth callback and install the session
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<()> {
        self.login
            .complete_login(&self.sessions, code, state)
            .await?;
        Ok(())
    }

    /// A view with the configured initial filters and grouping
    pub fn view(&self) -> InventoryView {
        InventoryView::new(self.config.filters.into(), self.config.breakdown.clone())
    }

    /// Populate the pipeline and return a view computed over it
    pub async fn load_view(&self) -> Result<InventoryView> {
        self.pipeline.populate().await?;
        let mut view = self.view();
        view.refresh(&self.pipeline);
        Ok(view)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("gateway", &self.gateway)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// InventoryView
// =============================================================================

/// Filter/grouping state plus the index derived from it.
///
/// Every mutation recomputes from the pipeline's cached payloads; nothing here
/// goes to the network.
#[derive(Debug, Clone)]
pub struct InventoryView {
    filters: InventoryFilters,
    grouping: BreakdownConfig,
    index: Option<AttributeIndex<Item, ItemDimension>>,
    catalog: Option<Arc<Catalog>>,
}

impl InventoryView {
    pub fn new(filters: InventoryFilters, grouping: BreakdownConfig) -> Self {
        Self {
            filters,
            grouping,
            index: None,
            catalog: None,
        }
    }

    /// Rebuild the index from whatever the pipeline has cached
    pub fn refresh(&mut self, pipeline: &DataPipeline) {
        self.catalog = pipeline.catalog().data();
        self.index = pipeline.index(&self.filters, &ItemDimension::ALL);
    }

    pub fn set_filters(&mut self, filters: InventoryFilters, pipeline: &DataPipeline) {
        self.filters = filters;
        self.refresh(pipeline);
    }

    pub fn set_dimensions(&mut self, dimensions: Vec<ItemDimension>) {
        self.grouping.dimensions = dimensions;
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.grouping.sort = sort;
    }

    pub fn filters(&self) -> &InventoryFilters {
        &self.filters
    }

    pub fn dimensions(&self) -> &[ItemDimension] {
        &self.grouping.dimensions
    }

    pub fn sort(&self) -> SortMode {
        self.grouping.sort
    }

    /// `None` until the pipeline has both profile and catalog
    pub fn index(&self) -> Option<&AttributeIndex<Item, ItemDimension>> {
        self.index.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Current grouping of the filtered items; empty until ready
    pub fn breakdown(&self) -> Result<Vec<BreakdownNode<'_, Item, ItemDimension>>> {
        let (Some(index), Some(catalog)) = (&self.index, &self.catalog) else {
            return Ok(Vec::new());
        };
        let descriptors = item_descriptors(&self.grouping.dimensions, catalog);
        Ok(breakdown(&index.all(), &descriptors, self.grouping.sort)?)
    }
}
