//! The build pipeline: ingest -> link-resolve on demand -> field-resolve
//! -> generate.
//!
//! A build is an explicit value threaded through its phases: a `BuildPlan`
//! collects declarations (types, resolvers, page rules), `start()` freezes
//! them into a `Build`, and `run()` consumes the build and returns the
//! descriptor set. Nothing is process-wide; a second build starts from a
//! fresh plan.
//!
//! Phase concurrency: ingestion mutates the store single-threaded; the
//! field-resolution phase runs independent (node, field) pairs as tasks
//! bounded by the configured limit; generation walks the read-only store.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::BuildConfig;
use crate::core::CancelToken;
use crate::error::Result;
use crate::fetch::{AssetFetcher, AssetStore, DiskStore, HttpClient, MemoryStore, ReqwestClient};
use crate::link::{self, ResolvedLink};
use crate::node::{Node, NodeStore};
use crate::page::{PageDescriptor, PageGenerator, PageRule};
use crate::report::{Reporter, Warning};
use crate::resolver::{FieldResolver, ResolverEngine};
use crate::schema::{TypeDef, TypeRegistry};
use crate::source::RecordSource;

/// Final result of a build run
#[derive(Debug)]
pub struct BuildOutput {
    /// Ordered page descriptors for the rendering collaborator.
    pub pages: Vec<PageDescriptor>,
    /// Recoverable conditions observed along the way.
    pub warnings: Vec<Warning>,
}

// =============================================================================
// BuildPlan
// =============================================================================

/// Mutable declaration phase of a build
pub struct BuildPlan {
    config: BuildConfig,
    registry: TypeRegistry,
    engine: ResolverEngine,
    rules: Vec<PageRule>,
    standalone: Vec<PageDescriptor>,
    client: Option<Arc<dyn HttpClient>>,
    asset_store: Option<Arc<dyn AssetStore>>,
    cancel: Option<CancelToken>,
}

impl BuildPlan {
    pub fn new(config: BuildConfig) -> Self {
        let engine = ResolverEngine::new(config.concurrency);
        Self {
            config,
            registry: TypeRegistry::new(),
            engine,
            rules: Vec::new(),
            standalone: Vec::new(),
            client: None,
            asset_store: None,
            cancel: None,
        }
    }

    /// Declare a type. Must happen before ingestion of that type.
    pub fn register_type(&mut self, def: TypeDef) -> Result<()> {
        self.registry.register(def)
    }

    /// Register a field resolver for `(type_name, field_name)`.
    pub fn register_resolver(&mut self, type_name: &str, field_name: &str, resolver: FieldResolver) {
        self.engine.register(type_name, field_name, resolver);
    }

    /// Declare which nodes become pages.
    pub fn add_page_rule(&mut self, rule: PageRule) {
        self.rules.push(rule);
    }

    /// Add a standalone page with a literal path/template/context.
    pub fn add_page(&mut self, descriptor: PageDescriptor) {
        self.standalone.push(descriptor);
    }

    /// Substitute the network collaborator (tests, embedding).
    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Substitute the persistent cache store backing the asset fetcher.
    pub fn with_asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.asset_store = Some(store);
        self
    }

    /// Attach an abort signal for the resolution phase.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Freeze the plan into a runnable build.
    ///
    /// Validates all link specs up front (`UnknownLinkTarget` fails fast
    /// here rather than surfacing as silently empty relations later) and
    /// wires the default collaborators where none were substituted.
    pub fn start(self) -> anyhow::Result<Build> {
        self.registry.validate_links()?;

        let client: Arc<dyn HttpClient> = match self.client {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new(&self.config.fetch)?),
        };

        let asset_store: Arc<dyn AssetStore> = match self.asset_store {
            Some(store) => store,
            None => match &self.config.cache_dir {
                Some(dir) => Arc::new(DiskStore::open(dir)?),
                None => Arc::new(MemoryStore::new()),
            },
        };

        let reporter = Arc::new(Reporter::new());
        let fetcher = Arc::new(AssetFetcher::new(client, asset_store, reporter.clone()));

        Ok(Build {
            registry: self.registry,
            store: NodeStore::new(),
            engine: Arc::new(self.engine),
            fetcher,
            reporter,
            cancel: self.cancel.unwrap_or_else(CancelToken::never),
            rules: self.rules,
            standalone: self.standalone,
        })
    }
}

// =============================================================================
// Build
// =============================================================================

/// A build in flight; owns the node store for the duration of the run
pub struct Build {
    registry: TypeRegistry,
    store: NodeStore,
    engine: Arc<ResolverEngine>,
    fetcher: Arc<AssetFetcher>,
    reporter: Arc<Reporter>,
    cancel: CancelToken,
    rules: Vec<PageRule>,
    standalone: Vec<PageDescriptor>,
}

impl std::fmt::Debug for Build {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Build").finish_non_exhaustive()
    }
}

impl Build {
    /// Run all phases and hand back the output set.
    pub async fn run(mut self, source: &dyn RecordSource) -> anyhow::Result<BuildOutput> {
        self.ingest(source)?;
        self.resolve_fields().await;
        let pages = self.generate()?;

        Ok(BuildOutput {
            pages,
            warnings: self.reporter.warnings(),
        })
    }

    /// Ingestion phase: validate records and populate the store.
    ///
    /// Single-threaded; the only phase that mutates the store. A schema
    /// violation aborts ingestion of the offending type and surfaces as a
    /// fatal error.
    pub fn ingest(&mut self, source: &dyn RecordSource) -> anyhow::Result<()> {
        let batches = source.load()?;

        for batch in batches {
            let mut count = 0usize;
            for record in batch.records {
                self.registry.validate_record(&batch.type_name, &record)?;
                let key = self.registry.natural_key(&batch.type_name, &record)?;
                self.store
                    .upsert(Node::ingest(&batch.type_name, &key, record))?;
                count += 1;
            }
            crate::log!("ingest"; "{count} {} records", batch.type_name);
        }

        Ok(())
    }

    /// Field-resolution phase: every registered `(type, field)` pair for
    /// every node, as concurrent tasks bounded by the engine's limit.
    ///
    /// No ordering is guaranteed between completions; memoization
    /// guarantees each pair is computed exactly once.
    pub async fn resolve_fields(&self) {
        let mut tasks = JoinSet::new();

        for def in self.registry.types() {
            let fields: Vec<String> = self
                .engine
                .fields_for(&def.name)
                .into_iter()
                .map(str::to_string)
                .collect();
            if fields.is_empty() {
                continue;
            }

            for node in self.store.query_by_type(&def.name) {
                for field in &fields {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    let engine = self.engine.clone();
                    let fetcher = self.fetcher.clone();
                    let reporter = self.reporter.clone();
                    let cancel = self.cancel.clone();
                    let field = field.clone();
                    let node = node.clone();
                    tasks.spawn(async move {
                        engine
                            .resolve_field(&node, &field, &fetcher, &reporter, &cancel)
                            .await
                    });
                }
            }
        }

        let mut resolved = 0usize;
        while let Some(result) = tasks.join_next().await {
            if result.is_ok() {
                resolved += 1;
            }
        }
        crate::log!("resolve"; "{resolved} field resolutions completed");
    }

    /// Resolve a declared link on a node against the current store.
    ///
    /// An unknown link name is fatal at first use.
    pub fn resolve_link(&self, node: &Node, link_name: &str) -> Result<ResolvedLink> {
        let spec = self
            .registry
            .get(node.type_name())
            .and_then(|def| def.find_link(link_name))
            .ok_or_else(|| crate::error::BuildError::UnknownLinkTarget {
                type_name: node.type_name().to_string(),
                link: link_name.to_string(),
                what: "link",
                target: link_name.to_string(),
            })?;

        Ok(link::resolve(&self.store, node, spec, &self.reporter))
    }

    /// Generation phase: emit the descriptor set with collision detection.
    pub fn generate(&self) -> Result<Vec<PageDescriptor>> {
        PageGenerator::new(&self.store).generate(&self.rules, self.standalone.clone())
    }

    /// The node store (read-only outside ingestion).
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Memoized resolver results, for inspection after the resolve phase.
    pub fn engine(&self) -> &ResolverEngine {
        &self.engine
    }
}

// =============================================================================
// Tests
// =============================================================================
