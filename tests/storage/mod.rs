//! Shared storage integration tests.
//!
//! Tests the LockTable, CollectionStore, AuditStore and ManifestStore
//! interfaces against all implementations. Each implementation module imports
//! these test functions and runs them.

pub mod audit_store_tests;
pub mod collection_store_tests;
pub mod lock_table_tests;
