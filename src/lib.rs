//! Galley - collection lifecycle and content-locking engine
//!
//! Editors group content changes into collections. The engine:
//! - grants each content URI to at most one open collection at a time
//! - moves collections through review, approval and publish
//! - derives and applies the file operations that publish a collection,
//!   stopping at the first failure and resuming after a restart
//! - records every lifecycle step in an audit log
//!
//! Start with [`EngineBuilder`] (or [`Engine::from_config`]).

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod model;
pub mod notify;
pub mod permissions;
pub mod services;
pub mod storage;
pub mod utils;

pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, ErrorStatus, NotFound, Result};
