//! # reelfund-types
//!
//! Shared domain types used across the Reelfund workspace.
//!
//! All money amounts are integer minor units (cents) carried as `u64`.
//! All percentages are basis points (`u16`, 10_000 = 100%). All
//! timestamps are Unix epoch seconds (`u64`).

pub mod campaign;
pub mod revenue;
pub mod royalty;

/// Common type aliases.
pub type CampaignId = u64;
pub type EntryId = u64;
pub type DistributionId = u64;
pub type RoyaltyId = u64;
pub type TxHash = [u8; 32];

/// Minor units per major currency unit (1.00 = 100 cents).
pub const CENTS_PER_UNIT: u64 = 100;

/// Basis-point denominator (10_000 bps = 100%).
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Error raised when parsing a stored status or source string fails.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// Which enum failed to parse (e.g. "entry status").
    pub kind: &'static str,
    /// The offending string.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bps_denominator() {
        assert_eq!(BPS_DENOMINATOR, 10_000);
    }

    #[test]
    fn test_parse_enum_error_display() {
        let err = ParseEnumError {
            kind: "entry status",
            value: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "unknown entry status value: bogus");
    }
}
