//! Pro-rata allocation of the investor pool across stakes.
//!
//! Allocations use the largest-remainder method so the per-investor
//! amounts always sum exactly to the pool. The computation is
//! deterministic: remainder ties are broken by input order.

use reelfund_types::BPS_DENOMINATOR;

use crate::{Result, RoyaltyError};

/// One investor's computed share of a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Index into the input stake slice.
    pub index: usize,
    /// The stake the share was computed from, in cents.
    pub stake_cents: u64,
    /// Floor of stake / total stake, in basis points.
    pub share_bps: u16,
    /// Allocated amount in cents.
    pub amount_cents: u64,
}

/// Allocate `pool_cents` across `stakes` pro-rata.
///
/// # Errors
///
/// - [`RoyaltyError::ZeroAmount`] if the pool is zero
/// - [`RoyaltyError::NoStakes`] if `stakes` is empty
/// - [`RoyaltyError::ZeroStake`] if all stakes are zero
/// - [`RoyaltyError::Overflow`] if the total stake overflows
pub fn allocate(pool_cents: u64, stakes: &[u64]) -> Result<Vec<Allocation>> {
    if pool_cents == 0 {
        return Err(RoyaltyError::ZeroAmount);
    }
    if stakes.is_empty() {
        return Err(RoyaltyError::NoStakes);
    }

    let mut total_stake: u64 = 0;
    for stake in stakes {
        total_stake = total_stake
            .checked_add(*stake)
            .ok_or(RoyaltyError::Overflow)?;
    }
    if total_stake == 0 {
        return Err(RoyaltyError::ZeroStake);
    }

    // u128 intermediates: pool * stake can exceed u64.
    let pool = pool_cents as u128;
    let total = total_stake as u128;

    let mut allocations = Vec::with_capacity(stakes.len());
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(stakes.len());
    let mut allocated: u64 = 0;

    for (index, &stake_cents) in stakes.iter().enumerate() {
        let product = pool * stake_cents as u128;
        let base = (product / total) as u64;
        remainders.push((index, product % total));

        let share_bps = (stake_cents as u128 * BPS_DENOMINATOR as u128 / total) as u16;

        allocated += base;
        allocations.push(Allocation {
            index,
            stake_cents,
            share_bps,
            amount_cents: base,
        });
    }

    // Hand the leftover cents to the largest remainders, earliest first
    // on ties. Leftover is strictly less than the number of stakes.
    let mut leftover = pool_cents - allocated;
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (index, _) in remainders {
        if leftover == 0 {
            break;
        }
        allocations[index].amount_cents += 1;
        leftover -= 1;
    }

    Ok(allocations)
}
