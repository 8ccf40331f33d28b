//! End-to-end collection lifecycle scenarios.
//!
//! Run with: cargo test --test engine


mod audit;
mod claims;
mod scheduler;
