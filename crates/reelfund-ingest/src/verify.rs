//! Verification of pending revenue entries.
//!
//! An entry is only distributable once verified: its campaign must
//! exist and be funded, the currency must match the campaign, and the
//! amount must be positive. Anything else fails the entry with a
//! recorded reason; failed entries are terminal.

use rusqlite::Connection;

use reelfund_db::queries::{campaigns, revenue};
use reelfund_db::DbError;
use reelfund_types::campaign::CampaignStatus;
use reelfund_types::revenue::EntryStatus;

use crate::Result;

/// Maximum entries examined per verification sweep.
const SWEEP_LIMIT: u32 = 500;

/// Result of one verification sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub verified: usize,
    pub failed: usize,
}

/// Verify every pending entry, oldest first.
pub fn verify_pending(conn: &Connection, _now: u64) -> Result<VerifyOutcome> {
    let pending = revenue::list_by_status(conn, EntryStatus::Pending, SWEEP_LIMIT)?;
    let mut outcome = VerifyOutcome::default();

    for entry in pending {
        match check(conn, &entry) {
            Ok(()) => {
                revenue::mark_verified(conn, entry.id)?;
                tracing::info!(entry_id = entry.id, "revenue entry verified");
                outcome.verified += 1;
            }
            Err(reason) => {
                revenue::mark_failed(conn, entry.id, &reason)?;
                tracing::warn!(entry_id = entry.id, reason = %reason, "revenue entry failed verification");
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Check one entry against its campaign. Returns the failure reason.
fn check(
    conn: &Connection,
    entry: &reelfund_types::revenue::RevenueEntry,
) -> std::result::Result<(), String> {
    if entry.amount_cents == 0 {
        return Err("amount is zero".to_string());
    }

    let campaign = match campaigns::get(conn, entry.campaign_id) {
        Ok(c) => c,
        Err(DbError::NotFound(_)) => {
            return Err(format!("campaign {} not found", entry.campaign_id));
        }
        Err(e) => return Err(format!("campaign lookup failed: {e}")),
    };

    if campaign.status != CampaignStatus::Funded {
        return Err(format!(
            "campaign {} is {}, not funded",
            campaign.id,
            campaign.status.as_str()
        ));
    }

    if entry.currency != campaign.currency {
        return Err(format!(
            "currency mismatch: {} != {}",
            entry.currency, campaign.currency
        ));
    }

    Ok(())
}
