//! Core value types shared across the pipeline.

mod cancel;
mod url;

pub use cancel::{CancelSource, CancelToken};
pub use url::{UrlPath, slug};
