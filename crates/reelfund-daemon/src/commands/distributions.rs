//! Distribution command handlers.

use std::sync::Arc;

use serde_json::Value;

use reelfund_db::queries::distributions;
use reelfund_engine::distribute;
use reelfund_types::royalty::RoyaltyDistribution;

use crate::commands::{db_error, engine_error, unix_now};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Serialize a distribution with the tx hash hex-encoded.
pub(crate) fn distribution_json(d: &RoyaltyDistribution) -> Value {
    serde_json::json!({
        "id": d.id,
        "campaign_id": d.campaign_id,
        "entry_id": d.entry_id,
        "gross_cents": d.gross_cents,
        "creator_cents": d.creator_cents,
        "platform_cents": d.platform_cents,
        "investor_cents": d.investor_cents,
        "status": d.status.as_str(),
        "tx_hash": d.tx_hash.map(hex::encode),
        "distributed_at": d.distributed_at,
    })
}

/// Distribute verified revenue entries now, ahead of the scheduler.
///
/// Scoped to one campaign when `campaign_id` is given. Distributions
/// created here still wait for the mirror worker (or the next cycle)
/// before their royalties become claimable.
pub async fn run_distribution(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = params.get("campaign_id").and_then(|v| v.as_u64());

    let now = unix_now();
    let mut db = state.db.lock().await;
    let outcome = match campaign_id {
        Some(id) => distribute::run_campaign(&mut db, id, now).map_err(engine_error)?,
        None => distribute::run_all(&mut db, now).map_err(engine_error)?,
    };
    drop(db);

    if !outcome.distributions.is_empty() {
        state.event_bus.emit(Event {
            event_type: "DistributionRun".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "distributions": outcome.distributions.len(),
                "skipped_no_investors": outcome.skipped_no_investors,
            }),
        });
    }

    Ok(serde_json::json!({
        "distribution_ids": outcome.distributions,
        "skipped_no_investors": outcome.skipped_no_investors,
        "skipped_already": outcome.skipped_already,
    }))
}

/// Get a distribution by id.
pub async fn get_distribution(state: &Arc<DaemonState>, params: &Value) -> Result {
    let distribution_id = params
        .get("distribution_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("distribution_id required"))?;

    let db = state.db.lock().await;
    let distribution = distributions::get(&db, distribution_id).map_err(db_error)?;
    Ok(distribution_json(&distribution))
}

/// List a campaign's distributions, newest first.
pub async fn list_distributions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = params
        .get("campaign_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("campaign_id required"))?;
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(100) as u32;

    let db = state.db.lock().await;
    let list = distributions::list_by_campaign(&db, campaign_id, limit).map_err(db_error)?;
    Ok(Value::Array(list.iter().map(distribution_json).collect()))
}
