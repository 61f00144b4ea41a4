//! Folio - a content-graph build pipeline for static site generation.
//!
//! Ingests structured records into a typed, linked content graph, computes
//! derived/external fields, and emits page descriptors (path, template,
//! context) for downstream rendering.
//!
//! # Pipeline
//!
//! ```text
//! ingest -> link-resolve (on demand) -> field-resolve (concurrent) -> generate
//! ```
//!
//! Declare types, resolvers, and page rules on a [`BuildPlan`], then
//! `start()` and `run()` it against a [`source::RecordSource`]:
//!
//! ```ignore
//! let mut plan = BuildPlan::new(BuildConfig::default());
//! plan.register_type(book_type)?;
//! plan.register_resolver("Book", "cover", cover_resolver);
//! plan.add_page_rule(PageRule::new("Book", "book", "name").grouped_by("series"));
//!
//! let output = plan.start()?.run(&source).await?;
//! for page in &output.pages {
//!     println!("{} -> {}", page.path, page.template_id);
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod link;
pub mod logger;
pub mod node;
pub mod page;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod schema;
pub mod source;

pub use config::BuildConfig;
pub use core::{CancelSource, CancelToken, UrlPath, slug};
pub use error::{BuildError, Result};
pub use fetch::{AssetFetcher, AssetRef, LocatorHash};
pub use link::ResolvedLink;
pub use node::{ContentDigest, Node, NodeId, NodeStore};
pub use page::{PageDescriptor, PageRule};
pub use pipeline::{Build, BuildOutput, BuildPlan};
pub use report::{Reporter, Warning};
pub use resolver::{FieldResolver, ResolveCtx, ResolverEngine};
pub use schema::{Cardinality, FieldDef, FieldKind, LinkSpec, TypeDef, TypeRegistry};
