//! AsyncResource - a remote-backed value with single-flight fetching
//!
//! Wraps a [`Fetch`] implementation and caches its outcome in a tri-state
//! (data / fetching / error). Concurrent callers of [`AsyncResource::get`]
//! share one in-flight fetch:
//!
//! ```text
//!   get() ──┐
//!   get() ──┼──> in_flight: Shared<fetch> ──> settle(state) ──> Result<Arc<T>>
//!   get() ──┘         (exactly one underlying fetch)
//! ```
//!
//! The state mutex is only held for bookkeeping, never across an await.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::error::Result;

/// Produces a fresh value from the remote side
#[async_trait]
pub trait Fetch<T>: Send + Sync {
    async fn fetch(&self) -> Result<T>;

    /// Name used in logs
    fn describe(&self) -> &str {
        "resource"
    }
}

/// Construction options
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceOptions {
    /// Issue the first fetch at construction; a failure is captured into state
    pub auto_fetch: bool,
    /// Drop previously fetched data when a fetch starts or fails
    pub discard_stale_data: bool,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_fetch(mut self) -> Self {
        self.auto_fetch = true;
        self
    }

    pub fn discard_stale_data(mut self) -> Self {
        self.discard_stale_data = true;
        self
    }
}

type InFlight<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

struct ResourceState<T> {
    data: Option<Arc<T>>,
    error: Option<crate::Error>,
    in_flight: Option<InFlight<T>>,
    fetch_count: u64,
}

/// Consistent view of a resource at one instant
#[derive(Debug)]
pub struct ResourceSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub fetching: bool,
    pub error: Option<crate::Error>,
}

/// Fetch/cache wrapper with a single-flight guarantee
pub struct AsyncResource<T> {
    fetcher: Arc<dyn Fetch<T>>,
    state: Arc<Mutex<ResourceState<T>>>,
    options: ResourceOptions,
}

impl<T: Send + Sync + 'static> AsyncResource<T> {
    pub fn new(fetcher: impl Fetch<T> + 'static, options: ResourceOptions) -> Self {
        Self::from_arc(Arc::new(fetcher), options)
    }

    pub fn from_arc(fetcher: Arc<dyn Fetch<T>>, options: ResourceOptions) -> Self {
        let resource = Self {
            fetcher,
            state: Arc::new(Mutex::new(ResourceState {
                data: None,
                error: None,
                in_flight: None,
                fetch_count: 0,
            })),
            options,
        };

        if options.auto_fetch {
            let in_flight = resource.start_fetch(&mut resource.lock());
            // drive it now when a runtime is around; otherwise the first
            // get() picks up the pending fetch. Failures land in state.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = in_flight.await;
                });
            }
        }

        resource
    }

    /// Return the cached value, fetching it first if needed.
    ///
    /// A fetch starts when nothing is cached and nothing is in flight, or when
    /// `force_refresh` is set and nothing is in flight. Calls arriving while a
    /// fetch is in flight (forced or not) await that same fetch.
    ///
    /// The caller is attached to the in-flight fetch when `get` is called, not
    /// when the returned future is first polled.
    pub fn get(&self, force_refresh: bool) -> BoxFuture<'static, Result<Arc<T>>> {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight.clone() {
            return in_flight.boxed();
        }
        if force_refresh || state.data.is_none() {
            return self.start_fetch(&mut state).boxed();
        }

        let settled = match &state.error {
            Some(error) => Err(error.clone()),
            None => crate::error::require(state.data.clone(), "resource settled without data"),
        };
        future::ready(settled).boxed()
    }

    /// `get(false)`, returning the resource itself
    pub async fn populate(&self) -> Result<&Self> {
        self.get(false).await?;
        Ok(self)
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.lock().data.clone()
    }

    pub fn error(&self) -> Option<crate::Error> {
        self.lock().error.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Number of underlying fetches issued so far
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetch_count
    }

    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        let state = self.lock();
        ResourceSnapshot {
            data: state.data.clone(),
            fetching: state.in_flight.is_some(),
            error: state.error.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResourceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_fetch(&self, state: &mut ResourceState<T>) -> InFlight<T> {
        if self.options.discard_stale_data {
            state.data = None;
        }
        state.fetch_count += 1;

        let fetcher = Arc::clone(&self.fetcher);
        let shared_state = Arc::clone(&self.state);
        let discard = self.options.discard_stale_data;
        tracing::debug!(resource = fetcher.describe(), "Fetching");

        let in_flight = async move {
            let outcome = fetcher.fetch().await.map(Arc::new);

            let mut state = shared_state.lock().unwrap_or_else(PoisonError::into_inner);
            match &outcome {
                Ok(data) => {
                    state.data = Some(Arc::clone(data));
                    state.error = None;
                }
                Err(error) => {
                    tracing::warn!(resource = fetcher.describe(), error = %error, "Fetch failed");
                    state.error = Some(error.clone());
                    if discard {
                        state.data = None;
                    }
                }
            }
            state.in_flight = None;

            outcome
        }
        .boxed()
        .shared();

        state.in_flight = Some(in_flight.clone());
        in_flight
    }
}

impl<T> fmt::Debug for AsyncResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResource")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
