//! Remote asset fetching with single-flight and a persistent cache.
//!
//! Every locator is keyed by its blake3 hash. Concurrent identical
//! requests collapse into one network call whose result all callers share,
//! even across different nodes. Entry state is per-locator; unrelated
//! locators never contend on a shared lock.

mod client;
mod store;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

pub use client::{BoxFuture, FetchResponse, HttpClient, ReqwestClient};
pub use store::{AssetStore, DiskStore, MemoryStore};

use crate::core::CancelToken;
use crate::report::{Reporter, Warning};

// =============================================================================
// LocatorHash / AssetRef
// =============================================================================

/// Cache key: blake3 of the request locator
///
/// Keyed by locator, not node id, so all nodes requesting the same
/// external resource share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocatorHash(Arc<str>);

impl LocatorHash {
    pub fn of(locator: &str) -> Self {
        Self(Arc::from(blake3::hash(locator.as_bytes()).to_hex().as_str()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocatorHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a persisted payload (cache path or in-memory key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef(Arc<str>);

impl AssetRef {
    pub fn new(payload_ref: impl AsRef<str>) -> Self {
        Self(Arc::from(payload_ref.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// AssetFetcher
// =============================================================================

/// Terminal state of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchOutcome {
    /// Retrieval succeeded; `None` means the resource carried no usable
    /// payload (not an error).
    Success(Option<AssetRef>),
    Failed,
}

impl FetchOutcome {
    fn asset(&self) -> Option<AssetRef> {
        match self {
            FetchOutcome::Success(asset) => asset.clone(),
            FetchOutcome::Failed => None,
        }
    }
}

/// Per-locator cache entry
enum EntryState {
    /// A fetch is in flight; join it through the receiver.
    Pending(watch::Receiver<Option<FetchOutcome>>),
    Done(FetchOutcome),
}

/// What a caller has to do after consulting the entry table
enum Role {
    Use(Option<AssetRef>),
    Join(watch::Receiver<Option<FetchOutcome>>),
    Compute(watch::Sender<Option<FetchOutcome>>),
}

/// Remote asset fetcher with single-flight and persistent caching
///
/// Shared, longer-lived resource: referenced (never owned) by resolver
/// invocations, and reusable across builds when backed by a `DiskStore`.
pub struct AssetFetcher {
    client: Arc<dyn HttpClient>,
    store: Arc<dyn AssetStore>,
    entries: DashMap<LocatorHash, EntryState>,
    reporter: Arc<Reporter>,
}

impl AssetFetcher {
    pub fn new(
        client: Arc<dyn HttpClient>,
        store: Arc<dyn AssetStore>,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            client,
            store,
            entries: DashMap::new(),
            reporter,
        }
    }

    /// The underlying network collaborator, for resolvers that need raw
    /// (uncached) requests such as metadata lookups.
    pub fn client(&self) -> &Arc<dyn HttpClient> {
        &self.client
    }

    /// Fetch an external resource, returning `None` when unavailable.
    ///
    /// Callers must treat `None` as "asset unavailable", never fatal:
    /// a failed fetch records a `FetchError` warning and the build goes on.
    pub async fn fetch_asset(&self, locator: &str, cancel: &CancelToken) -> Option<AssetRef> {
        let hash = LocatorHash::of(locator);

        let role = match self.entries.entry(hash.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                EntryState::Done(outcome) => Role::Use(outcome.asset()),
                EntryState::Pending(rx) => Role::Join(rx.clone()),
            },
            Entry::Vacant(vacant) => {
                // Persistent hit: a prior run already fetched this locator
                if let Some(asset) = self.store.get(&hash) {
                    crate::debug!("fetch"; "cache hit for {hash}");
                    vacant.insert(EntryState::Done(FetchOutcome::Success(Some(asset.clone()))));
                    Role::Use(Some(asset))
                } else {
                    let (tx, rx) = watch::channel(None);
                    vacant.insert(EntryState::Pending(rx));
                    Role::Compute(tx)
                }
            }
        };

        match role {
            Role::Use(asset) => asset,
            Role::Join(rx) => Self::join(rx).await,
            Role::Compute(tx) => self.compute(locator, hash, tx, cancel).await,
        }
    }

    /// Await an in-flight fetch started by another caller.
    async fn join(mut rx: watch::Receiver<Option<FetchOutcome>>) -> Option<AssetRef> {
        loop {
            if let Some(outcome) = rx.borrow().clone() {
                return outcome.asset();
            }
            // Closed channel means the computing task was cancelled
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Perform the retrieval this caller won the race for.
    async fn compute(
        &self,
        locator: &str,
        hash: LocatorHash,
        tx: watch::Sender<Option<FetchOutcome>>,
        cancel: &CancelToken,
    ) -> Option<AssetRef> {
        let outcome = tokio::select! {
            outcome = self.retrieve(locator, &hash) => outcome,
            _ = cancel.cancelled() => {
                // A cancelled fetch must not leave a pending entry behind;
                // clearing it lets the next build retry cleanly.
                self.entries.remove(&hash);
                drop(tx);
                return None;
            }
        };

        self.entries
            .insert(hash, EntryState::Done(outcome.clone()));
        let _ = tx.send(Some(outcome.clone()));
        outcome.asset()
    }

    async fn retrieve(&self, locator: &str, hash: &LocatorHash) -> FetchOutcome {
        let response = match self.client.fetch(locator).await {
            Ok(response) => response,
            Err(e) => {
                self.reporter.warn(Warning::FetchError {
                    locator: locator.to_string(),
                    message: e.to_string(),
                });
                return FetchOutcome::Failed;
            }
        };

        if !response.status_ok {
            self.reporter.warn(Warning::FetchError {
                locator: locator.to_string(),
                message: format!("status {}", response.status_code),
            });
            return FetchOutcome::Failed;
        }

        // Resource exists but carries no usable content
        if response.body.is_empty() {
            return FetchOutcome::Success(None);
        }

        match self.store.put(hash, &response.body) {
            Ok(asset) => {
                crate::debug!("fetch"; "persisted {locator} as {hash}");
                FetchOutcome::Success(Some(asset))
            }
            Err(e) => {
                self.reporter.warn(Warning::FetchError {
                    locator: locator.to_string(),
                    message: format!("failed to persist payload: {e}"),
                });
                FetchOutcome::Failed
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
