//! # reelfund-chain
//!
//! On-chain mirror of royalty distributions.
//!
//! Every distribution is recorded on a royalty contract for audit: the
//! transaction hash lands in the ledger, and royalties are only
//! released for claiming once the transaction has enough
//! confirmations.
//!
//! ## Modules
//!
//! - [`contract`] — the [`RoyaltyContract`](contract::RoyaltyContract) trait
//! - [`stub`] — deterministic in-process contract for v1 and tests
//! - [`mirror`] — the submit/confirm worker

pub mod contract;
pub mod mirror;
pub mod stub;

/// Error types for chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The contract rejected or dropped a submission.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Unknown transaction hash.
    #[error("unknown transaction: {0}")]
    UnknownTx(String),

    /// Database failure.
    #[error("database error: {0}")]
    Db(#[from] reelfund_db::DbError),
}

/// Convenience result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
