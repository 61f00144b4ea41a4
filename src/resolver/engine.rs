//! Resolver engine: memoization, single-flight, bounded concurrency.
//!
//! Each `(node id, field)` pair is computed at most once per build run.
//! Concurrent callers for the same pair join the in-flight computation;
//! independent pairs run concurrently up to the configured limit. A failed
//! resolver memoizes null and records a warning; it is never retried
//! within the run.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{Semaphore, watch};

use super::{FieldResolver, ResolveCtx};
use crate::core::CancelToken;
use crate::fetch::AssetFetcher;
use crate::node::{Node, NodeId};
use crate::report::{Reporter, Warning};

/// Memo key: `(node id, field name)`
type MemoKey = (NodeId, String);

/// State of one memoized field
enum FieldSlot {
    Pending(watch::Receiver<Option<Value>>),
    Ready(Value),
}

enum Role {
    Use(Value),
    Join(watch::Receiver<Option<Value>>),
    Compute(watch::Sender<Option<Value>>),
}

/// Dispatch table plus per-build memoization state
pub struct ResolverEngine {
    resolvers: FxHashMap<(String, String), FieldResolver>,
    memo: DashMap<MemoKey, FieldSlot>,
    /// Bounds concurrently executing resolutions (not memo lookups).
    semaphore: Arc<Semaphore>,
}

impl ResolverEngine {
    pub fn new(concurrency: usize) -> Self {
        Self {
            resolvers: FxHashMap::default(),
            memo: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Register a resolver for `(type_name, field_name)`.
    ///
    /// Later registrations for the same pair replace earlier ones, matching
    /// a dispatch table fixed before the build starts.
    pub fn register(&mut self, type_name: &str, field_name: &str, resolver: FieldResolver) {
        self.resolvers
            .insert((type_name.to_string(), field_name.to_string()), resolver);
    }

    /// Field names with a resolver registered for `type_name`.
    pub fn fields_for(&self, type_name: &str) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .resolvers
            .keys()
            .filter(|(t, _)| t == type_name)
            .map(|(_, f)| f.as_str())
            .collect();
        fields.sort_unstable();
        fields
    }

    /// Memoized value, if this field has already been resolved.
    pub fn resolved(&self, node_id: &NodeId, field: &str) -> Option<Value> {
        match self
            .memo
            .get(&(node_id.clone(), field.to_string()))
            .as_deref()
        {
            Some(FieldSlot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Resolve one field on one node.
    ///
    /// Never fails: a resolver error yields `Value::Null` plus a
    /// `ResolverError` warning. Cancellation also yields null, but without
    /// committing a memo entry, so a later run starts clean.
    pub async fn resolve_field(
        &self,
        node: &Arc<Node>,
        field: &str,
        fetcher: &Arc<AssetFetcher>,
        reporter: &Reporter,
        cancel: &CancelToken,
    ) -> Value {
        let key = (node.id().clone(), field.to_string());

        let role = match self.memo.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                FieldSlot::Ready(value) => Role::Use(value.clone()),
                FieldSlot::Pending(rx) => Role::Join(rx.clone()),
            },
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(FieldSlot::Pending(rx));
                Role::Compute(tx)
            }
        };

        match role {
            Role::Use(value) => value,
            Role::Join(rx) => Self::join(rx).await,
            Role::Compute(tx) => {
                self.compute(node, field, key, tx, fetcher, reporter, cancel)
                    .await
            }
        }
    }

    /// Await a computation already in flight for the same `(node, field)`.
    async fn join(mut rx: watch::Receiver<Option<Value>>) -> Value {
        loop {
            if let Some(value) = rx.borrow().clone() {
                return value;
            }
            // Closed channel: the computing task was cancelled
            if rx.changed().await.is_err() {
                return Value::Null;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn compute(
        &self,
        node: &Arc<Node>,
        field: &str,
        key: MemoKey,
        tx: watch::Sender<Option<Value>>,
        fetcher: &Arc<AssetFetcher>,
        reporter: &Reporter,
        cancel: &CancelToken,
    ) -> Value {
        let Some(resolver) = self
            .resolvers
            .get(&(node.type_name().to_string(), field.to_string()))
        else {
            reporter.warn(Warning::ResolverError {
                node: node.id().clone(),
                field: field.to_string(),
                message: "no resolver registered".to_string(),
            });
            return self.commit(key, tx, Value::Null);
        };

        // Bound actual execution; memoized returns never queue here
        let permit = tokio::select! {
            permit = self.semaphore.acquire() => permit,
            _ = cancel.cancelled() => {
                return self.abandon(key, tx);
            }
        };
        let _permit = match permit {
            Ok(permit) => permit,
            // Closed semaphore only happens on teardown
            Err(_) => return self.abandon(key, tx),
        };

        let result = match resolver {
            FieldResolver::Sync(f) => f(node),
            FieldResolver::Async(f) => {
                let ctx = ResolveCtx {
                    node: node.clone(),
                    fetcher: fetcher.clone(),
                    cancel: cancel.clone(),
                };
                tokio::select! {
                    result = f(ctx) => result,
                    _ = cancel.cancelled() => {
                        return self.abandon(key, tx);
                    }
                }
            }
        };

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                reporter.warn(Warning::ResolverError {
                    node: node.id().clone(),
                    field: field.to_string(),
                    message: e.to_string(),
                });
                Value::Null
            }
        };

        self.commit(key, tx, value)
    }

    /// Memoize a final value and wake joiners.
    fn commit(&self, key: MemoKey, tx: watch::Sender<Option<Value>>, value: Value) -> Value {
        self.memo.insert(key, FieldSlot::Ready(value.clone()));
        let _ = tx.send(Some(value.clone()));
        value
    }

    /// Cancelled: clear the pending slot without committing.
    fn abandon(&self, key: MemoKey, tx: watch::Sender<Option<Value>>) -> Value {
        self.memo.remove(&key);
        drop(tx);
        Value::Null
    }
}

// =============================================================================
// Tests
// =============================================================================
