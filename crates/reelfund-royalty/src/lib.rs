//! # reelfund-royalty
//!
//! Royalty split and allocation math. Pure functions, no I/O.
//!
//! Revenue from a verified entry is split between three parties, then the
//! investor pool is allocated pro-rata across investor stakes.
//!
//! ## Modules
//!
//! - [`splits`] — three-way split configuration and 30-day timelock
//! - [`allocate`] — pro-rata investor allocation (largest remainder)

pub mod allocate;
pub mod splits;

/// Error types for royalty math.
#[derive(Debug, thiserror::Error)]
pub enum RoyaltyError {
    /// Split percentages do not sum to 10_000 bps.
    #[error("split must sum to 10000 bps, got {total}")]
    InvalidSplitTotal {
        /// The actual total.
        total: u32,
    },

    /// Amount is zero.
    #[error("revenue amount is zero")]
    ZeroAmount,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in royalty calculation")]
    Overflow,

    /// No stakes to allocate over.
    #[error("no investor stakes")]
    NoStakes,

    /// All stakes are zero.
    #[error("total stake is zero")]
    ZeroStake,

    /// Invalid split configuration.
    #[error("invalid split: {0}")]
    InvalidSplit(String),
}

/// Convenience result type for royalty math.
pub type Result<T> = std::result::Result<T, RoyaltyError>;
