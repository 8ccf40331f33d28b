//! Content store implementations.
//!
//! - `FsContentStore`: payloads on the local filesystem
//! - `MockContentStore`: in-memory, with failure injection for tests

mod fs;
mod mock;

pub use fs::FsContentStore;
pub use mock::MockContentStore;
