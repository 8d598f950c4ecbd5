//! Source adapters: parse raw upstream payloads into revenue events.
//!
//! Each external source delivers a different JSON shape. Adapters do no
//! I/O and no deduplication; they only normalize.

use serde::Deserialize;

use reelfund_types::revenue::RevenueSource;

use crate::{IngestError, Result, RevenueEvent};

/// A parser for one external revenue source.
pub trait SourceAdapter {
    /// The source this adapter handles.
    fn source(&self) -> RevenueSource;

    /// Parse a raw payload into zero or more normalized events.
    fn parse(&self, raw: &[u8]) -> Result<Vec<RevenueEvent>>;
}

/// Look up the adapter for a source.
pub fn adapter_for(source: RevenueSource) -> Box<dyn SourceAdapter + Send + Sync> {
    match source {
        RevenueSource::BoxOffice => Box::new(BoxOfficeAdapter),
        RevenueSource::Streaming => Box::new(StreamingAdapter),
        RevenueSource::Resale => Box::new(ResaleAdapter),
    }
}

// ------------------------------------------------------------
// Box office
// ------------------------------------------------------------

/// A theatrical settlement: one gross amount per settlement period.
#[derive(Debug, Deserialize)]
struct BoxOfficeSettlement {
    settlement_id: String,
    campaign_id: u64,
    gross_cents: u64,
    currency: String,
    period_end: u64,
}

/// Adapter for box office settlement payloads.
pub struct BoxOfficeAdapter;

impl SourceAdapter for BoxOfficeAdapter {
    fn source(&self) -> RevenueSource {
        RevenueSource::BoxOffice
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<RevenueEvent>> {
        let settlement: BoxOfficeSettlement =
            serde_json::from_slice(raw).map_err(|e| IngestError::MalformedPayload {
                adapter: "box_office",
                detail: e.to_string(),
            })?;

        Ok(vec![RevenueEvent {
            campaign_id: settlement.campaign_id,
            source: RevenueSource::BoxOffice,
            external_ref: settlement.settlement_id,
            amount_cents: settlement.gross_cents,
            currency: settlement.currency,
            revenue_date: settlement.period_end,
        }])
    }
}

// ------------------------------------------------------------
// Streaming
// ------------------------------------------------------------

/// One line of an OTT statement: net revenue for one title.
#[derive(Debug, Deserialize)]
struct StreamingLine {
    campaign_id: u64,
    net_cents: u64,
}

/// An OTT platform statement: many titles, one currency, one period.
#[derive(Debug, Deserialize)]
struct StreamingStatement {
    statement_id: String,
    currency: String,
    period_end: u64,
    lines: Vec<StreamingLine>,
}

/// Adapter for streaming statement payloads.
///
/// Each statement line becomes its own event; the external ref is
/// `{statement_id}/{line_index}` so partial re-ingestion stays
/// idempotent per line.
pub struct StreamingAdapter;

impl SourceAdapter for StreamingAdapter {
    fn source(&self) -> RevenueSource {
        RevenueSource::Streaming
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<RevenueEvent>> {
        let statement: StreamingStatement =
            serde_json::from_slice(raw).map_err(|e| IngestError::MalformedPayload {
                adapter: "streaming",
                detail: e.to_string(),
            })?;

        Ok(statement
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| RevenueEvent {
                campaign_id: line.campaign_id,
                source: RevenueSource::Streaming,
                external_ref: format!("{}/{index}", statement.statement_id),
                amount_cents: line.net_cents,
                currency: statement.currency.clone(),
                revenue_date: statement.period_end,
            })
            .collect())
    }
}

// ------------------------------------------------------------
// Marketplace resale
// ------------------------------------------------------------

/// A secondary-market sale carrying a royalty for the campaign.
#[derive(Debug, Deserialize)]
struct ResaleEvent {
    sale_id: String,
    campaign_id: u64,
    royalty_cents: u64,
    currency: String,
    sold_at: u64,
}

/// Adapter for marketplace resale payloads.
pub struct ResaleAdapter;

impl SourceAdapter for ResaleAdapter {
    fn source(&self) -> RevenueSource {
        RevenueSource::Resale
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<RevenueEvent>> {
        let sale: ResaleEvent =
            serde_json::from_slice(raw).map_err(|e| IngestError::MalformedPayload {
                adapter: "resale",
                detail: e.to_string(),
            })?;

        Ok(vec![RevenueEvent {
            campaign_id: sale.campaign_id,
            source: RevenueSource::Resale,
            external_ref: sale.sale_id,
            amount_cents: sale.royalty_cents,
            currency: sale.currency,
            revenue_date: sale.sold_at,
        }])
    }
}
