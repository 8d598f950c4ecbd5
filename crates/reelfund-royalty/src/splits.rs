//! Three-way revenue splits and the 30-day timelock on split changes.
//!
//! A verified revenue amount is split between:
//!
//! - **Creator**: Default 50%
//! - **Platform**: Default 10%
//! - **Investor pool**: Default 40%
//!
//! Shares are basis points and must always sum to 10_000. Changes to a
//! campaign's split require a 30-day timelock so investors cannot be
//! diluted retroactively.

use serde::{Deserialize, Serialize};

use reelfund_types::BPS_DENOMINATOR;

use crate::{Result, RoyaltyError};

/// Timelock duration for split changes (30 days in seconds).
pub const TIMELOCK_SECONDS: u64 = 30 * 24 * 3600;

/// Default creator share in basis points.
pub const DEFAULT_CREATOR_BPS: u16 = 5_000;

/// Default platform share in basis points.
pub const DEFAULT_PLATFORM_BPS: u16 = 1_000;

/// Default investor pool share in basis points.
pub const DEFAULT_INVESTOR_BPS: u16 = 4_000;

/// Revenue split configuration for a campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Creator share in basis points.
    pub creator_bps: u16,
    /// Platform share in basis points.
    pub platform_bps: u16,
    /// Investor pool share in basis points.
    pub investor_bps: u16,
}

/// Default split: creator=5000, platform=1000, investors=4000.
pub const DEFAULT_SPLIT: SplitConfig = SplitConfig {
    creator_bps: DEFAULT_CREATOR_BPS,
    platform_bps: DEFAULT_PLATFORM_BPS,
    investor_bps: DEFAULT_INVESTOR_BPS,
};

/// A proposal to change a campaign's split, subject to the timelock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplitChangeProposal {
    /// The proposed new split configuration.
    pub new_split: SplitConfig,
    /// Unix timestamp when the proposal was made.
    pub proposed_at: u64,
    /// Unix timestamp when the new split becomes effective.
    pub effective_at: u64,
}

/// Validate a split configuration.
///
/// # Errors
///
/// - [`RoyaltyError::InvalidSplitTotal`] if shares do not sum to 10_000 bps
pub fn validate_split(config: &SplitConfig) -> Result<()> {
    let total =
        config.creator_bps as u32 + config.platform_bps as u32 + config.investor_bps as u32;
    if total != BPS_DENOMINATOR as u32 {
        return Err(RoyaltyError::InvalidSplitTotal { total });
    }
    Ok(())
}

/// Propose a split change with a 30-day timelock.
///
/// # Errors
///
/// - [`RoyaltyError::InvalidSplitTotal`] if the new split does not sum to 10_000 bps
/// - [`RoyaltyError::InvalidSplit`] if the new split is identical to the current one
pub fn propose_split_change(
    current: &SplitConfig,
    new: SplitConfig,
    current_time: u64,
) -> Result<SplitChangeProposal> {
    validate_split(&new)?;

    if current == &new {
        return Err(RoyaltyError::InvalidSplit(
            "proposed split is identical to current split".to_string(),
        ));
    }

    let effective_at = current_time + TIMELOCK_SECONDS;

    tracing::info!(
        creator = new.creator_bps,
        platform = new.platform_bps,
        investor = new.investor_bps,
        effective_at,
        "split change proposed"
    );

    Ok(SplitChangeProposal {
        new_split: new,
        proposed_at: current_time,
        effective_at,
    })
}

/// Check whether a split change proposal is effective at the given time.
pub fn is_effective(proposal: &SplitChangeProposal, current_time: u64) -> bool {
    current_time >= proposal.effective_at
}

/// Split a revenue amount according to the configuration.
///
/// Returns `(creator_cents, platform_cents, investor_cents)`. Platform
/// and investor shares floor-divide; the creator absorbs the rounding
/// remainder, so the three always sum to `amount`.
///
/// # Errors
///
/// - [`RoyaltyError::ZeroAmount`] if the amount is zero
/// - [`RoyaltyError::InvalidSplitTotal`] if the split is invalid
/// - [`RoyaltyError::Overflow`] on arithmetic overflow
pub fn split(amount: u64, config: &SplitConfig) -> Result<(u64, u64, u64)> {
    if amount == 0 {
        return Err(RoyaltyError::ZeroAmount);
    }
    validate_split(config)?;

    let denom = BPS_DENOMINATOR as u64;

    let platform_cents = amount
        .checked_mul(config.platform_bps as u64)
        .ok_or(RoyaltyError::Overflow)?
        / denom;

    let investor_cents = amount
        .checked_mul(config.investor_bps as u64)
        .ok_or(RoyaltyError::Overflow)?
        / denom;

    // Creator gets the remainder to avoid rounding loss
    let creator_cents = amount - platform_cents - investor_cents;

    Ok((creator_cents, platform_cents, investor_cents))
}
