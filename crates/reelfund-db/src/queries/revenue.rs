//! Revenue ledger query functions.
//!
//! The UNIQUE(source, external_ref) constraint makes ingestion
//! idempotent; status guards in the UPDATE statements keep entry
//! transitions monotonic.

use rusqlite::{Connection, Row};

use reelfund_types::revenue::{EntryStatus, RevenueEntry, RevenueSource};
use reelfund_types::{CampaignId, EntryId};

use crate::{DbError, Result};

const ENTRY_COLS: &str = "id, campaign_id, source, external_ref, amount_cents, currency, \
     status, failure_reason, revenue_date, ingested_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<RevenueEntry> {
    let source: String = row.get(2)?;
    let status: String = row.get(6)?;
    Ok(RevenueEntry {
        id: row.get::<_, i64>(0)? as u64,
        campaign_id: row.get::<_, i64>(1)? as u64,
        source: source.parse::<RevenueSource>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        external_ref: row.get(3)?,
        amount_cents: row.get::<_, i64>(4)? as u64,
        currency: row.get(5)?,
        status: status.parse::<EntryStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?,
        failure_reason: row.get(7)?,
        revenue_date: row.get::<_, i64>(8)? as u64,
        ingested_at: row.get::<_, i64>(9)? as u64,
    })
}

/// Insert a pending revenue entry. Returns the new entry id.
///
/// A duplicate (source, external_ref) pair surfaces as a SQLite UNIQUE
/// violation; callers check [`DbError::is_unique_violation`].
pub fn insert(
    conn: &Connection,
    campaign_id: CampaignId,
    source: RevenueSource,
    external_ref: &str,
    amount_cents: u64,
    currency: &str,
    revenue_date: u64,
    ingested_at: u64,
) -> Result<EntryId> {
    conn.execute(
        "INSERT INTO revenue_entries
             (campaign_id, source, external_ref, amount_cents, currency,
              status, revenue_date, ingested_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
        rusqlite::params![
            campaign_id as i64,
            source.as_str(),
            external_ref,
            amount_cents as i64,
            currency,
            revenue_date as i64,
            ingested_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Get a revenue entry by id.
pub fn get(conn: &Connection, id: EntryId) -> Result<RevenueEntry> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLS} FROM revenue_entries WHERE id = ?1"),
        [id as i64],
        entry_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("revenue entry {id}")),
        other => DbError::Sqlite(other),
    })
}

/// List entries for a campaign, newest first.
pub fn list_by_campaign(
    conn: &Connection,
    campaign_id: CampaignId,
    limit: u32,
) -> Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLS} FROM revenue_entries
         WHERE campaign_id = ?1 ORDER BY ingested_at DESC, id DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![campaign_id as i64, limit], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List a campaign's entries in a given status, oldest first.
pub fn list_by_campaign_status(
    conn: &Connection,
    campaign_id: CampaignId,
    status: EntryStatus,
    limit: u32,
) -> Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLS} FROM revenue_entries
         WHERE campaign_id = ?1 AND status = ?2 ORDER BY id LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![campaign_id as i64, status.as_str(), limit],
            entry_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List entries in a given status, oldest first (processing order).
pub fn list_by_status(
    conn: &Connection,
    status: EntryStatus,
    limit: u32,
) -> Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLS} FROM revenue_entries
         WHERE status = ?1 ORDER BY id LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![status.as_str(), limit], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Transition an entry Pending -> Verified.
pub fn mark_verified(conn: &Connection, id: EntryId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE revenue_entries SET status = 'verified'
         WHERE id = ?1 AND status = 'pending'",
        [id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("entry {id} not pending")));
    }
    Ok(())
}

/// Transition an entry Pending -> Failed, recording the reason.
pub fn mark_failed(conn: &Connection, id: EntryId, reason: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE revenue_entries SET status = 'failed', failure_reason = ?1
         WHERE id = ?2 AND status = 'pending'",
        rusqlite::params![reason, id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("entry {id} not pending")));
    }
    Ok(())
}

/// Transition an entry Verified -> Processed.
pub fn mark_processed(conn: &Connection, id: EntryId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE revenue_entries SET status = 'processed'
         WHERE id = ?1 AND status = 'verified'",
        [id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("entry {id} not verified")));
    }
    Ok(())
}
