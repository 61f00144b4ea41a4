//! Derived/external field computation.
//!
//! Resolvers are registered per `(type_name, field_name)` in a dispatch
//! table fixed at build start, as either a synchronous pure function of a
//! node or an asynchronous function that may consult the network and the
//! asset cache.

mod engine;

use std::sync::Arc;

use serde_json::Value;

pub use engine::ResolverEngine;

use crate::core::CancelToken;
use crate::fetch::{AssetFetcher, BoxFuture};
use crate::node::Node;

/// Everything an asynchronous resolver may consult
#[derive(Clone)]
pub struct ResolveCtx {
    pub node: Arc<Node>,
    /// Shared asset fetcher; referenced, never owned, by invocations.
    pub fetcher: Arc<AssetFetcher>,
    pub cancel: CancelToken,
}

type SyncFn = dyn Fn(&Node) -> anyhow::Result<Value> + Send + Sync;
type AsyncFn = dyn Fn(ResolveCtx) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// A registered field resolver
#[derive(Clone)]
pub enum FieldResolver {
    /// Pure function of the node; never suspends.
    Sync(Arc<SyncFn>),
    /// May suspend at network-bound operations.
    Async(Arc<AsyncFn>),
}

impl FieldResolver {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Node) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn asynchronous<F>(f: F) -> Self
    where
        F: Fn(ResolveCtx) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync + 'static,
    {
        Self::Async(Arc::new(f))
    }
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldResolver::Sync(_) => f.write_str("FieldResolver::Sync"),
            FieldResolver::Async(_) => f.write_str("FieldResolver::Async"),
        }
    }
}
