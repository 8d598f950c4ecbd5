//! Investor royalty command handlers.

use std::sync::Arc;

use serde_json::Value;

use reelfund_db::queries::royalties;
use reelfund_engine::claims;

use crate::commands::{db_error, unix_now};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Get a royalty by id.
pub async fn get_royalty(state: &Arc<DaemonState>, params: &Value) -> Result {
    let royalty_id = params
        .get("royalty_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("royalty_id required"))?;

    let db = state.db.lock().await;
    let royalty = royalties::get(&db, royalty_id).map_err(db_error)?;
    serde_json::to_value(royalty).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// List an investor's royalties, newest first.
pub async fn list_investor_royalties(state: &Arc<DaemonState>, params: &Value) -> Result {
    let investor = params
        .get("investor")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("investor required"))?;
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(100) as u32;

    let db = state.db.lock().await;
    let list = royalties::list_by_investor(&db, investor, limit).map_err(db_error)?;
    serde_json::to_value(list).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// List the royalties of a distribution.
pub async fn list_distribution_royalties(state: &Arc<DaemonState>, params: &Value) -> Result {
    let distribution_id = params
        .get("distribution_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("distribution_id required"))?;

    let db = state.db.lock().await;
    let list = royalties::list_by_distribution(&db, distribution_id).map_err(db_error)?;
    serde_json::to_value(list).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Claim a claimable royalty on behalf of an investor.
pub async fn claim_royalty(state: &Arc<DaemonState>, params: &Value) -> Result {
    let royalty_id = params
        .get("royalty_id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("royalty_id required"))?;
    let investor = params
        .get("investor")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("investor required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    match claims::claim(&db, royalty_id, investor, now) {
        Ok(()) => {}
        Err(reelfund_engine::EngineError::Db(reelfund_db::DbError::NotFound(detail))) => {
            return Err(RpcError::not_claimable(&detail));
        }
        Err(e) => return Err(crate::commands::engine_error(e)),
    }
    let amount = royalties::get(&db, royalty_id).map_err(db_error)?.amount_cents;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "RoyaltyClaimed".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "royalty_id": royalty_id,
            "investor": investor,
            "amount_cents": amount,
        }),
    });

    Ok(serde_json::json!({"claimed": true, "amount_cents": amount}))
}

/// Sum of an investor's claimable royalties.
pub async fn get_claimable_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let investor = params
        .get("investor")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("investor required"))?;

    let db = state.db.lock().await;
    let total = royalties::claimable_total(&db, investor).map_err(db_error)?;
    Ok(serde_json::json!({"claimable_cents": total}))
}
