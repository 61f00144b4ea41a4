//! Ingestion input boundary.
//!
//! A `RecordSource` is the external data-source collaborator: it supplies
//! ordered typed records which the pipeline validates against the
//! registered schemas and turns into nodes.

use crate::node::JsonMap;

/// One ordered batch of records for a declared type
#[derive(Debug, Clone)]
pub struct TypedRecords {
    pub type_name: String,
    pub records: Vec<JsonMap>,
}

impl TypedRecords {
    pub fn new(type_name: &str, records: Vec<JsonMap>) -> Self {
        Self {
            type_name: type_name.to_string(),
            records,
        }
    }
}

/// External data-source collaborator
pub trait RecordSource {
    /// Produce all record batches, in ingestion order.
    fn load(&self) -> anyhow::Result<Vec<TypedRecords>>;
}

/// In-memory source for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySource {
    batches: Vec<TypedRecords>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch: TypedRecords) -> &mut Self {
        self.batches.push(batch);
        self
    }
}

impl RecordSource for MemorySource {
    fn load(&self) -> anyhow::Result<Vec<TypedRecords>> {
        Ok(self.batches.clone())
    }
}
