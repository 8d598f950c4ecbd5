//! Integration test crate for the Reelfund platform.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end revenue flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p reelfund-integration-tests
//! ```
