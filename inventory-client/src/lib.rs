//! Inventory Client - remote document store access
//!
//! Provides the [`DocumentStore`] / [`TaxonomySource`] seams consumed by the
//! engine, an HTTP implementation and an in-process implementation.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod store;

pub use config::{ClientConfig, StorePaths};
pub use error::{ClientError, ClientResult};
pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;
pub use store::{DocumentStore, TaxonomySource};
