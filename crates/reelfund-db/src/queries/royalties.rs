//! Investor royalty query functions.
//!
//! Claim transitions are guarded in SQL: a royalty can only be claimed
//! while claimable, and only by its own investor.

use rusqlite::{Connection, Row};

use reelfund_types::royalty::{InvestorRoyalty, RoyaltyStatus};
use reelfund_types::{DistributionId, RoyaltyId};

use crate::{DbError, Result};

const ROYALTY_COLS: &str = "id, distribution_id, investor, nft_id, contribution_cents, \
     share_bps, amount_cents, status, claimable_at, claimed_at";

fn royalty_from_row(row: &Row<'_>) -> rusqlite::Result<InvestorRoyalty> {
    let status: String = row.get(7)?;
    Ok(InvestorRoyalty {
        id: row.get::<_, i64>(0)? as u64,
        distribution_id: row.get::<_, i64>(1)? as u64,
        investor: row.get(2)?,
        nft_id: row.get(3)?,
        contribution_cents: row.get::<_, i64>(4)? as u64,
        share_bps: row.get::<_, i64>(5)? as u16,
        amount_cents: row.get::<_, i64>(6)? as u64,
        status: status.parse::<RoyaltyStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        claimable_at: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        claimed_at: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
    })
}

/// Insert a pending investor royalty. Returns the new royalty id.
pub fn insert(
    conn: &Connection,
    distribution_id: DistributionId,
    investor: &str,
    nft_id: Option<&str>,
    contribution_cents: u64,
    share_bps: u16,
    amount_cents: u64,
) -> Result<RoyaltyId> {
    conn.execute(
        "INSERT INTO investor_royalties
             (distribution_id, investor, nft_id, contribution_cents,
              share_bps, amount_cents, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')",
        rusqlite::params![
            distribution_id as i64,
            investor,
            nft_id,
            contribution_cents as i64,
            share_bps as i64,
            amount_cents as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Get a royalty by id.
pub fn get(conn: &Connection, id: RoyaltyId) -> Result<InvestorRoyalty> {
    conn.query_row(
        &format!("SELECT {ROYALTY_COLS} FROM investor_royalties WHERE id = ?1"),
        [id as i64],
        royalty_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("royalty {id}")),
        other => DbError::Sqlite(other),
    })
}

/// List royalties belonging to a distribution, in insertion order.
pub fn list_by_distribution(
    conn: &Connection,
    distribution_id: DistributionId,
) -> Result<Vec<InvestorRoyalty>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROYALTY_COLS} FROM investor_royalties
         WHERE distribution_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([distribution_id as i64], royalty_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List an investor's royalties, newest first.
pub fn list_by_investor(
    conn: &Connection,
    investor: &str,
    limit: u32,
) -> Result<Vec<InvestorRoyalty>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROYALTY_COLS} FROM investor_royalties
         WHERE investor = ?1 ORDER BY id DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![investor, limit], royalty_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flip all pending royalties of a distribution to claimable. Returns
/// the number of royalties released.
pub fn release_for_distribution(
    conn: &Connection,
    distribution_id: DistributionId,
    now: u64,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE investor_royalties SET status = 'claimable', claimable_at = ?1
         WHERE distribution_id = ?2 AND status = 'pending'",
        rusqlite::params![now as i64, distribution_id as i64],
    )?;
    Ok(updated)
}

/// Claim a royalty. Guarded on investor identity and claimable status.
pub fn claim(conn: &Connection, id: RoyaltyId, investor: &str, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE investor_royalties SET status = 'claimed', claimed_at = ?1
         WHERE id = ?2 AND investor = ?3 AND status = 'claimable'",
        rusqlite::params![now as i64, id as i64, investor],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!(
            "royalty {id} not claimable by {investor}"
        )));
    }
    Ok(())
}

/// Expire claimable royalties whose claim window has passed. Returns
/// the number expired.
pub fn expire_stale(conn: &Connection, now: u64, window_secs: u64) -> Result<usize> {
    let cutoff = now.saturating_sub(window_secs);
    let updated = conn.execute(
        "UPDATE investor_royalties SET status = 'expired'
         WHERE status = 'claimable' AND claimable_at <= ?1",
        [cutoff as i64],
    )?;
    Ok(updated)
}

/// Sum of an investor's claimable royalties, in cents.
pub fn claimable_total(conn: &Connection, investor: &str) -> Result<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM investor_royalties
         WHERE investor = ?1 AND status = 'claimable'",
        [investor],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

/// Sum of claimed vs unclaimed royalty amounts across a campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTotals {
    pub claimed_cents: u64,
    pub unclaimed_cents: u64,
    pub expired_cents: u64,
}

/// Aggregate claim totals over every distribution of a campaign.
pub fn claim_totals(conn: &Connection, campaign_id: u64) -> Result<ClaimTotals> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN r.status = 'claimed' THEN r.amount_cents ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN r.status IN ('pending', 'claimable') THEN r.amount_cents ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN r.status = 'expired' THEN r.amount_cents ELSE 0 END), 0)
         FROM investor_royalties r
         JOIN royalty_distributions d ON d.id = r.distribution_id
         WHERE d.campaign_id = ?1",
        [campaign_id as i64],
        |row| {
            Ok(ClaimTotals {
                claimed_cents: row.get::<_, i64>(0)? as u64,
                unclaimed_cents: row.get::<_, i64>(1)? as u64,
                expired_cents: row.get::<_, i64>(2)? as u64,
            })
        },
    )
    .map_err(DbError::Sqlite)
}
