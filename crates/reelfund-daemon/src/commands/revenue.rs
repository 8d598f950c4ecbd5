//! Revenue ingestion command handlers.

use std::sync::Arc;

use serde_json::Value;

use reelfund_db::queries::revenue;
use reelfund_ingest::adapters::adapter_for;
use reelfund_ingest::{pipeline, verify};
use reelfund_types::revenue::RevenueSource;

use crate::commands::{db_error, ingest_error, unix_now};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Ingest a raw payload from one revenue source.
///
/// The payload is parsed by the source's adapter and every resulting
/// event is written to the ledger. Duplicates are counted, not errors.
pub async fn ingest_revenue(state: &Arc<DaemonState>, params: &Value) -> Result {
    let source_str = params
        .get("source")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("source required"))?;
    let source: RevenueSource = source_str
        .parse()
        .map_err(|_| RpcError::invalid_params(&format!("unknown source '{source_str}'")))?;
    let payload = params
        .get("payload")
        .ok_or_else(|| RpcError::invalid_params("payload required"))?;

    let raw = serde_json::to_vec(payload).map_err(|e| RpcError::internal_error(&e.to_string()))?;
    let events = adapter_for(source).parse(&raw).map_err(ingest_error)?;

    let now = unix_now();
    let db = state.db.lock().await;
    let outcome = pipeline::ingest_batch(&db, &events, now).map_err(ingest_error)?;
    drop(db);

    if outcome.inserted > 0 {
        state.event_bus.emit(Event {
            event_type: "RevenueIngested".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "source": source.as_str(),
                "inserted": outcome.inserted,
                "duplicates": outcome.duplicates,
            }),
        });
    }

    Ok(serde_json::json!({
        "inserted": outcome.inserted,
        "duplicates": outcome.duplicates,
    }))
}

/// Get a revenue entry by id.
pub async fn get_revenue_entry(state: &Arc<DaemonState>, params: &Value) -> Result {
    let entry_id = params
        .get("entry_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("entry_id required"))?;

    let db = state.db.lock().await;
    let entry = revenue::get(&db, entry_id).map_err(db_error)?;
    serde_json::to_value(entry).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// List a campaign's revenue entries.
pub async fn list_revenue_entries(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = params
        .get("campaign_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("campaign_id required"))?;

    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(100) as u32;

    let db = state.db.lock().await;
    let entries = revenue::list_by_campaign(&db, campaign_id, limit).map_err(db_error)?;
    serde_json::to_value(entries).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Run a verification sweep over pending entries.
pub async fn verify_revenue(state: &Arc<DaemonState>) -> Result {
    let now = unix_now();
    let db = state.db.lock().await;
    let outcome = verify::verify_pending(&db, now).map_err(ingest_error)?;
    drop(db);

    Ok(serde_json::json!({
        "verified": outcome.verified,
        "failed": outcome.failed,
    }))
}
