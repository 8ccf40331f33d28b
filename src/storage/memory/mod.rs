//! In-memory storage implementations.
//!
//! Used by the `memory` storage type and throughout the test suites. Each
//! store exposes failure switches so callers' error paths can be exercised.

mod audit_store;
mod manifest_store;
mod store;

pub use audit_store::InMemoryAuditStore;
pub use manifest_store::InMemoryManifestStore;
pub use store::InMemoryStore;
