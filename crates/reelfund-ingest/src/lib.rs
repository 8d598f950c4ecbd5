//! # reelfund-ingest
//!
//! Revenue ingestion and verification.
//!
//! Heterogeneous revenue events arrive from external sources (box office
//! settlements, streaming statements, marketplace resales). Adapters
//! normalize raw payloads into [`RevenueEvent`]s, which are written to
//! the ledger as pending entries and verified against their campaign
//! before distribution.
//!
//! ## Modules
//!
//! - [`adapters`] — per-source payload parsers
//! - [`pipeline`] — idempotent ledger writes
//! - [`verify`] — pending-entry verification

pub mod adapters;
pub mod pipeline;
pub mod verify;

use serde::{Deserialize, Serialize};

use reelfund_types::revenue::RevenueSource;
use reelfund_types::CampaignId;

/// Error types for ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Raw payload could not be parsed.
    #[error("malformed {adapter} payload: {detail}")]
    MalformedPayload {
        /// The source whose payload failed to parse.
        adapter: &'static str,
        /// Parser detail.
        detail: String,
    },

    /// Database failure.
    #[error("database error: {0}")]
    Db(#[from] reelfund_db::DbError),
}

/// Convenience result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

/// A normalized revenue event, ready for the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevenueEvent {
    pub campaign_id: CampaignId,
    pub source: RevenueSource,
    /// Upstream identifier, unique per source.
    pub external_ref: String,
    pub amount_cents: u64,
    pub currency: String,
    /// When the revenue was earned upstream (epoch seconds).
    pub revenue_date: u64,
}

/// Stable dedupe key for a (source, external_ref) pair.
///
/// The database enforces uniqueness; this key exists for log
/// correlation across services.
pub fn dedupe_key(source: RevenueSource, external_ref: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"/");
    hasher.update(external_ref.as_bytes());
    *hasher.finalize().as_bytes()
}
