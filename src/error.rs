//! Fatal build errors.
//!
//! Fatal errors stop the current phase and surface to the build invoker
//! with the offending ids/paths attached. Recoverable conditions live in
//! `report::Warning` instead and never interrupt the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::UrlPath;
use crate::node::NodeId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Top-level fatal error for all build operations
#[derive(Debug, Error)]
pub enum BuildError {
    /// A record does not satisfy its type's declared field schema.
    #[error("schema violation for type `{type_name}`: {message}")]
    SchemaViolation { type_name: String, message: String },

    /// Re-ingestion of an existing node id with a different content digest.
    #[error("identity conflict for node `{id}`: same id with differing content digest")]
    IdentityConflict { id: NodeId },

    /// A type name was registered twice.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// A link spec references an unregistered type or field.
    #[error("link `{link}` on type `{type_name}` targets unknown {what} `{target}`")]
    UnknownLinkTarget {
        type_name: String,
        link: String,
        /// "type" or "field"
        what: &'static str,
        target: String,
    },

    /// Two distinct source entities mapped to the same page path.
    #[error("path collision at `{path}`: nodes `{first}` and `{second}` both generate it")]
    PathCollision {
        path: UrlPath,
        first: NodeId,
        second: NodeId,
    },

    /// A record or page rule references a type nobody registered.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// Configuration file could not be read.
    #[error("failed to read config `{0}`")]
    ConfigIo(PathBuf, #[source] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("failed to parse config")]
    ConfigParse(#[from] toml::de::Error),
}
