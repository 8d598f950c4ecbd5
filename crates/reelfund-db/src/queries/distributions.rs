//! Royalty distribution query functions.
//!
//! `royalty_distributions.entry_id` is UNIQUE: a revenue entry can be
//! distributed at most once, no matter how many runners race.

use rusqlite::{Connection, Row};

use reelfund_types::royalty::{DistributionStatus, RoyaltyDistribution};
use reelfund_types::{CampaignId, DistributionId, EntryId, TxHash};

use crate::{DbError, Result};

const DISTRIBUTION_COLS: &str = "id, campaign_id, entry_id, gross_cents, creator_cents, \
     platform_cents, investor_cents, status, tx_hash, distributed_at";

fn distribution_from_row(row: &Row<'_>) -> rusqlite::Result<RoyaltyDistribution> {
    let status: String = row.get(7)?;
    let tx_blob: Option<Vec<u8>> = row.get(8)?;
    let tx_hash = match tx_blob {
        Some(blob) => Some(TxHash::try_from(blob.as_slice()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Blob, Box::new(e))
        })?),
        None => None,
    };
    Ok(RoyaltyDistribution {
        id: row.get::<_, i64>(0)? as u64,
        campaign_id: row.get::<_, i64>(1)? as u64,
        entry_id: row.get::<_, i64>(2)? as u64,
        gross_cents: row.get::<_, i64>(3)? as u64,
        creator_cents: row.get::<_, i64>(4)? as u64,
        platform_cents: row.get::<_, i64>(5)? as u64,
        investor_cents: row.get::<_, i64>(6)? as u64,
        status: status.parse::<DistributionStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        tx_hash,
        distributed_at: row.get::<_, i64>(9)? as u64,
    })
}

/// Insert a pending distribution. Returns the new distribution id.
///
/// Fails with a UNIQUE violation if the entry already has one; callers
/// check [`DbError::is_unique_violation`].
#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &Connection,
    campaign_id: CampaignId,
    entry_id: EntryId,
    gross_cents: u64,
    creator_cents: u64,
    platform_cents: u64,
    investor_cents: u64,
    distributed_at: u64,
) -> Result<DistributionId> {
    conn.execute(
        "INSERT INTO royalty_distributions
             (campaign_id, entry_id, gross_cents, creator_cents,
              platform_cents, investor_cents, status, distributed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
        rusqlite::params![
            campaign_id as i64,
            entry_id as i64,
            gross_cents as i64,
            creator_cents as i64,
            platform_cents as i64,
            investor_cents as i64,
            distributed_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Get a distribution by id.
pub fn get(conn: &Connection, id: DistributionId) -> Result<RoyaltyDistribution> {
    conn.query_row(
        &format!("SELECT {DISTRIBUTION_COLS} FROM royalty_distributions WHERE id = ?1"),
        [id as i64],
        distribution_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("distribution {id}")),
        other => DbError::Sqlite(other),
    })
}

/// List distributions for a campaign, newest first.
pub fn list_by_campaign(
    conn: &Connection,
    campaign_id: CampaignId,
    limit: u32,
) -> Result<Vec<RoyaltyDistribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISTRIBUTION_COLS} FROM royalty_distributions
         WHERE campaign_id = ?1 ORDER BY distributed_at DESC, id DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![campaign_id as i64, limit],
            distribution_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List distributions awaiting on-chain submission: pending or failed,
/// with no transaction hash yet.
pub fn list_unsubmitted(conn: &Connection, limit: u32) -> Result<Vec<RoyaltyDistribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISTRIBUTION_COLS} FROM royalty_distributions
         WHERE tx_hash IS NULL AND status IN ('pending', 'failed')
         ORDER BY id LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], distribution_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List submitted distributions still awaiting confirmation.
pub fn list_awaiting_confirmation(conn: &Connection, limit: u32) -> Result<Vec<RoyaltyDistribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISTRIBUTION_COLS} FROM royalty_distributions
         WHERE tx_hash IS NOT NULL AND status = 'pending'
         ORDER BY id LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], distribution_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Record the on-chain transaction hash for a distribution. Also clears
/// a failed status back to pending for the retry path.
pub fn set_tx_hash(conn: &Connection, id: DistributionId, tx_hash: &TxHash) -> Result<()> {
    let updated = conn.execute(
        "UPDATE royalty_distributions SET tx_hash = ?1, status = 'pending'
         WHERE id = ?2 AND tx_hash IS NULL",
        rusqlite::params![tx_hash.as_slice(), id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!(
            "distribution {id} not found or already submitted"
        )));
    }
    Ok(())
}

/// Transition a distribution Pending -> Completed.
pub fn mark_completed(conn: &Connection, id: DistributionId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE royalty_distributions SET status = 'completed'
         WHERE id = ?1 AND status = 'pending'",
        [id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("distribution {id} not pending")));
    }
    Ok(())
}

/// Transition a distribution Pending -> Failed.
pub fn mark_failed(conn: &Connection, id: DistributionId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE royalty_distributions SET status = 'failed'
         WHERE id = ?1 AND status = 'pending'",
        [id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("distribution {id} not pending")));
    }
    Ok(())
}

/// Aggregate revenue totals for a campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignTotals {
    pub distributions: u64,
    pub gross_cents: u64,
    pub creator_cents: u64,
    pub platform_cents: u64,
    pub investor_cents: u64,
}

/// Sum distributed amounts for a campaign (completed and pending).
pub fn campaign_totals(conn: &Connection, campaign_id: CampaignId) -> Result<CampaignTotals> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(gross_cents), 0),
                COALESCE(SUM(creator_cents), 0),
                COALESCE(SUM(platform_cents), 0),
                COALESCE(SUM(investor_cents), 0)
         FROM royalty_distributions
         WHERE campaign_id = ?1 AND status != 'failed'",
        [campaign_id as i64],
        |row| {
            Ok(CampaignTotals {
                distributions: row.get::<_, i64>(0)? as u64,
                gross_cents: row.get::<_, i64>(1)? as u64,
                creator_cents: row.get::<_, i64>(2)? as u64,
                platform_cents: row.get::<_, i64>(3)? as u64,
                investor_cents: row.get::<_, i64>(4)? as u64,
            })
        },
    )
    .map_err(DbError::Sqlite)
}
