//! Admin and diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use reelfund_db::queries::settings;

use crate::commands::db_error;
use crate::events::EventFilter;
use crate::rpc::RpcError;
use crate::scheduler;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Settings that may be changed over RPC.
const MUTABLE_SETTINGS: &[&str] = &[
    "claim_window_days",
    "chain_mirror_enabled",
    "confirmation_threshold",
];

/// Get daemon status.
pub async fn get_status(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let last_cycle = settings::get_u64(&db, "last_cycle", 0).map_err(db_error)?;
    let mirror_enabled = settings::get_bool(
        &db,
        "chain_mirror_enabled",
        state.config.chain.mirror_enabled,
    )
    .map_err(db_error)?;
    let threshold = settings::get_u64(
        &db,
        "confirmation_threshold",
        state.config.chain.confirmation_threshold,
    )
    .map_err(db_error)?;
    let window_days = settings::get_u64(
        &db,
        "claim_window_days",
        state.config.scheduler.claim_window_days,
    )
    .map_err(db_error)?;

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "last_cycle": last_cycle,
        "cycle_secs": state.config.scheduler.cycle_secs,
        "chain_mirror_enabled": mirror_enabled,
        "confirmation_threshold": threshold,
        "claim_window_days": window_days,
        "event_sequence": state.event_bus.sequence(),
    }))
}

/// Get a setting value.
pub async fn get_setting(state: &Arc<DaemonState>, params: &Value) -> Result {
    let key = params
        .get("key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("key required"))?;

    let db = state.db.lock().await;
    let value = settings::get(&db, key).map_err(db_error)?;
    Ok(serde_json::json!({"key": key, "value": value}))
}

/// Set a mutable setting.
pub async fn set_setting(state: &Arc<DaemonState>, params: &Value) -> Result {
    let key = params
        .get("key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("key required"))?;
    let value = params
        .get("value")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("value required"))?;

    if !MUTABLE_SETTINGS.contains(&key) {
        return Err(RpcError::invalid_params(&format!(
            "setting '{key}' is not mutable"
        )));
    }

    let db = state.db.lock().await;
    settings::set(&db, key, value).map_err(db_error)?;
    Ok(serde_json::json!({"updated": true}))
}

/// Run a pipeline cycle now, ahead of the scheduler.
pub async fn run_cycle(state: &Arc<DaemonState>) -> Result {
    let outcome = scheduler::run_cycle(state)
        .await
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    serde_json::to_value(outcome).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Parse an event subscription request.
///
/// Returns the filter to apply plus the response payload; the RPC
/// layer attaches the broadcast receiver to the connection and streams
/// matching events until the client disconnects.
pub fn subscribe_events(params: &Value) -> std::result::Result<(EventFilter, Value), RpcError> {
    let filter = match params.get("filter") {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| RpcError::invalid_params(&format!("bad filter: {e}")))?,
        None => EventFilter {
            categories: None,
            campaign_ids: None,
        },
    };

    // Generate subscription ID
    let mut sub_id = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut sub_id);

    Ok((
        filter,
        serde_json::json!({
            "subscription_id": hex::encode(sub_id),
        }),
    ))
}
