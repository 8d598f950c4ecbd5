//! Idempotent ledger writes.
//!
//! Every event lands as a pending revenue entry. A repeated
//! (source, external_ref) pair hits the schema's UNIQUE constraint and
//! is reported as [`IngestOutcome::Duplicate`] — not an error, since
//! upstream sources routinely re-deliver.

use rusqlite::Connection;

use reelfund_db::queries::revenue;
use reelfund_types::EntryId;

use crate::{dedupe_key, Result, RevenueEvent};

/// Outcome of ingesting a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new ledger entry was created.
    Inserted(EntryId),
    /// The event was already in the ledger; nothing was written.
    Duplicate,
}

/// Write one normalized event to the ledger.
pub fn ingest(conn: &Connection, event: &RevenueEvent, now: u64) -> Result<IngestOutcome> {
    let key = dedupe_key(event.source, &event.external_ref);

    match revenue::insert(
        conn,
        event.campaign_id,
        event.source,
        &event.external_ref,
        event.amount_cents,
        &event.currency,
        event.revenue_date,
        now,
    ) {
        Ok(entry_id) => {
            tracing::info!(
                entry_id,
                campaign_id = event.campaign_id,
                source = event.source.as_str(),
                external_ref = %event.external_ref,
                amount_cents = event.amount_cents,
                dedupe_key = %hex::encode(key),
                "revenue entry ingested"
            );
            Ok(IngestOutcome::Inserted(entry_id))
        }
        Err(e) if e.is_unique_violation() => {
            tracing::debug!(
                source = event.source.as_str(),
                external_ref = %event.external_ref,
                dedupe_key = %hex::encode(key),
                "duplicate revenue event skipped"
            );
            Ok(IngestOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

/// Summary of a batch ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Ingest a batch of events, tolerating duplicates.
pub fn ingest_batch(
    conn: &Connection,
    events: &[RevenueEvent],
    now: u64,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for event in events {
        match ingest(conn, event, now)? {
            IngestOutcome::Inserted(_) => outcome.inserted += 1,
            IngestOutcome::Duplicate => outcome.duplicates += 1,
        }
    }
    Ok(outcome)
}
