//! # reelfund-engine
//!
//! The distribution engine: turns verified revenue entries into royalty
//! distributions and drives the per-investor claim lifecycle.
//!
//! ## Modules
//!
//! - [`distribute`] — at-most-once distribution of verified entries
//! - [`claims`] — claim release, claiming, and expiry sweeps
//! - [`summary`] — campaign-level aggregates

pub mod claims;
pub mod distribute;
pub mod summary;

/// Error types for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Database failure.
    #[error("database error: {0}")]
    Db(#[from] reelfund_db::DbError),

    /// Split or allocation math failure.
    #[error("royalty math error: {0}")]
    Royalty(#[from] reelfund_royalty::RoyaltyError),
}

/// Convenience result type for the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
