//! Durable document storage over an embedded ACID key-value database.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{DeleteOutcome, DocumentStore, PutOutcome, ReadSnapshot};
