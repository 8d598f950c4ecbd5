//! Campaign and investment command handlers.

use std::sync::Arc;

use serde_json::Value;

use reelfund_db::queries::campaigns;
use reelfund_engine::{distribute, summary};
use reelfund_royalty::splits::{self, SplitConfig, DEFAULT_SPLIT};

use crate::commands::{db_error, engine_error, unix_now};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn required_u64(params: &Value, key: &str) -> std::result::Result<u64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn required_str<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn split_from_params(params: &Value, key: &str) -> std::result::Result<Option<SplitConfig>, RpcError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    let split: SplitConfig = serde_json::from_value(raw.clone())
        .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))?;
    splits::validate_split(&split).map_err(|e| RpcError::invalid_split(&e.to_string()))?;
    Ok(Some(split))
}

/// Create a campaign.
pub async fn create_campaign(state: &Arc<DaemonState>, params: &Value) -> Result {
    let title = required_str(params, "title")?;
    let creator = required_str(params, "creator")?;
    let currency = required_str(params, "currency")?;
    let goal_cents = required_u64(params, "goal_cents")?;
    let split = split_from_params(params, "split")?.unwrap_or(DEFAULT_SPLIT);

    let now = unix_now();
    let db = state.db.lock().await;
    let campaign_id = campaigns::insert(
        &db,
        title,
        creator,
        currency,
        goal_cents,
        split.creator_bps,
        split.platform_bps,
        split.investor_bps,
        now,
    )
    .map_err(db_error)?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "CampaignCreated".to_string(),
        timestamp: now,
        payload: serde_json::json!({"campaign_id": campaign_id, "title": title}),
    });

    Ok(serde_json::json!({"campaign_id": campaign_id}))
}

/// Get a campaign by id.
pub async fn get_campaign(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;
    let db = state.db.lock().await;
    let campaign = campaigns::get(&db, campaign_id).map_err(db_error)?;
    serde_json::to_value(campaign).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// List all campaigns, newest first.
pub async fn list_campaigns(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let list = campaigns::list(&db).map_err(db_error)?;
    serde_json::to_value(list).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Mark a campaign as funded.
pub async fn fund_campaign(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;

    let db = state.db.lock().await;
    campaigns::mark_funded(&db, campaign_id).map_err(db_error)?;
    let raised = campaigns::total_raised(&db, campaign_id).map_err(db_error)?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "CampaignFunded".to_string(),
        timestamp: unix_now(),
        payload: serde_json::json!({"campaign_id": campaign_id, "raised_cents": raised}),
    });

    Ok(serde_json::json!({"funded": true, "raised_cents": raised}))
}

/// Record an investor's contribution to a campaign.
pub async fn record_investment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;
    let investor = required_str(params, "investor")?;
    let amount_cents = required_u64(params, "amount_cents")?;
    if amount_cents == 0 {
        return Err(RpcError::invalid_params("amount_cents must be positive"));
    }
    let nft_id = params.get("nft_id").and_then(|v| v.as_str());

    let now = unix_now();
    let db = state.db.lock().await;
    // Campaign must exist before money is attached to it
    campaigns::get(&db, campaign_id).map_err(db_error)?;
    let investment_id =
        campaigns::insert_investment(&db, campaign_id, investor, amount_cents, nft_id, now)
            .map_err(db_error)?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "InvestmentRecorded".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "campaign_id": campaign_id,
            "investment_id": investment_id,
            "investor": investor,
            "amount_cents": amount_cents,
        }),
    });

    Ok(serde_json::json!({"investment_id": investment_id}))
}

/// List a campaign's investments.
pub async fn list_investments(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;
    let db = state.db.lock().await;
    let investments = campaigns::investments(&db, campaign_id).map_err(db_error)?;
    serde_json::to_value(investments).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Propose a timelocked split change.
pub async fn propose_split_change(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;
    let new_split = split_from_params(params, "split")?
        .ok_or_else(|| RpcError::invalid_params("split required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let proposal =
        distribute::propose_split(&db, campaign_id, new_split, now).map_err(engine_error)?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "SplitChangeProposed".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "campaign_id": campaign_id,
            "effective_at": proposal.effective_at,
        }),
    });

    Ok(serde_json::json!({
        "proposed_at": proposal.proposed_at,
        "effective_at": proposal.effective_at,
    }))
}

/// Get the split currently in force, plus any pending change.
pub async fn get_split(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;

    let now = unix_now();
    let db = state.db.lock().await;
    let split = distribute::effective_split(&db, campaign_id, now).map_err(engine_error)?;
    let pending = campaigns::pending_split(&db, campaign_id).map_err(db_error)?;

    Ok(serde_json::json!({
        "split": split,
        "pending_change": pending.map(|p| serde_json::json!({
            "creator_bps": p.creator_bps,
            "platform_bps": p.platform_bps,
            "investor_bps": p.investor_bps,
            "proposed_at": p.proposed_at,
            "effective_at": p.effective_at,
        })),
    }))
}

/// Get a campaign's revenue summary.
pub async fn get_campaign_summary(state: &Arc<DaemonState>, params: &Value) -> Result {
    let campaign_id = required_u64(params, "campaign_id")?;
    let db = state.db.lock().await;
    let summary = summary::campaign_summary(&db, campaign_id).map_err(engine_error)?;
    serde_json::to_value(summary).map_err(|e| RpcError::internal_error(&e.to_string()))
}
