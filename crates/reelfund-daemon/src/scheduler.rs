//! The pipeline scheduler.
//!
//! Every cycle runs the full revenue pipeline in order: verify pending
//! entries, distribute verified ones, mirror distributions on chain
//! (or finalize them directly when mirroring is disabled), and expire
//! stale royalties. Every step is idempotent, so an interrupted cycle
//! is simply picked up by the next one.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use reelfund_chain::mirror;
use reelfund_db::queries::{distributions, settings};
use reelfund_engine::{claims, distribute};
use reelfund_ingest::verify;
use reelfund_types::royalty::DistributionStatus;

use crate::commands::unix_now;
use crate::events::Event;
use crate::DaemonState;

/// Upper bound on distributions finalized per cycle when mirroring is
/// disabled.
const FINALIZE_LIMIT: u32 = 500;

/// Counters for one pipeline cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleOutcome {
    pub verified: usize,
    pub verify_failed: usize,
    pub distributed: usize,
    pub skipped_no_investors: usize,
    pub submitted: usize,
    pub confirmed: usize,
    pub submit_failed: usize,
    pub finalized: usize,
    pub expired: usize,
}

impl CycleOutcome {
    fn is_idle(&self) -> bool {
        self.verified == 0
            && self.verify_failed == 0
            && self.distributed == 0
            && self.submitted == 0
            && self.confirmed == 0
            && self.submit_failed == 0
            && self.finalized == 0
            && self.expired == 0
    }
}

/// Run cycles at the configured interval until shutdown.
pub async fn run(state: Arc<DaemonState>) {
    let period = Duration::from_secs(state.config.scheduler.cycle_secs.max(1));
    let mut interval = tokio::time::interval(period);
    let mut shutdown_rx = state.shutdown_tx.subscribe();

    info!("Scheduler running every {:?}", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match run_cycle(&state).await {
                    Ok(outcome) if !outcome.is_idle() => {
                        info!(?outcome, "pipeline cycle completed");
                    }
                    Ok(_) => {}
                    Err(e) => error!("pipeline cycle failed: {e}"),
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Scheduler stopping");
                break;
            }
        }
    }
}

/// Run one full pipeline cycle.
pub async fn run_cycle(state: &Arc<DaemonState>) -> anyhow::Result<CycleOutcome> {
    let now = unix_now();
    let mut outcome = CycleOutcome::default();
    let mut db = state.db.lock().await;

    let verify_outcome = verify::verify_pending(&db, now)?;
    outcome.verified = verify_outcome.verified;
    outcome.verify_failed = verify_outcome.failed;

    let dist_outcome = distribute::run_all(&mut db, now)?;
    outcome.distributed = dist_outcome.distributions.len();
    outcome.skipped_no_investors = dist_outcome.skipped_no_investors;

    let mirror_enabled = settings::get_bool(
        &db,
        "chain_mirror_enabled",
        state.config.chain.mirror_enabled,
    )?;
    if mirror_enabled {
        let threshold = settings::get_u64(
            &db,
            "confirmation_threshold",
            state.config.chain.confirmation_threshold,
        )? as u32;
        let mirror_outcome = mirror::run_cycle(&db, state.contract.as_ref(), threshold, now)?;
        outcome.submitted = mirror_outcome.submitted;
        outcome.confirmed = mirror_outcome.confirmed;
        outcome.submit_failed = mirror_outcome.failed;
    } else {
        // No mirror: distributions complete as soon as they exist.
        for distribution in distributions::list_unsubmitted(&db, FINALIZE_LIMIT)? {
            if distribution.status == DistributionStatus::Pending {
                claims::finalize(&db, distribution.id, now)?;
                outcome.finalized += 1;
            }
        }
    }

    let window_days = settings::get_u64(
        &db,
        "claim_window_days",
        state.config.scheduler.claim_window_days,
    )?;
    outcome.expired = claims::expire_stale(&db, now, window_days * 86_400)?;

    settings::set(&db, "last_cycle", &now.to_string())?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "CycleCompleted".to_string(),
        timestamp: now,
        payload: serde_json::to_value(&outcome)?,
    });

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;
    use crate::events::EventBus;
    use reelfund_chain::stub::StubContract;
    use reelfund_db::queries::{campaigns, revenue, royalties};
    use reelfund_types::revenue::RevenueSource;
    use reelfund_types::royalty::RoyaltyStatus;
    use tokio::sync::broadcast;

    fn test_state(mirror_enabled: bool) -> Arc<DaemonState> {
        let conn = reelfund_db::open_memory().expect("open test db");
        settings::set(&conn, "chain_mirror_enabled", if mirror_enabled { "true" } else { "false" })
            .expect("set");
        settings::set(&conn, "confirmation_threshold", "1").expect("set");
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(DaemonState {
            db: Arc::new(tokio::sync::Mutex::new(conn)),
            config: DaemonConfig::default(),
            event_bus: EventBus::new(16),
            contract: Arc::new(StubContract::new()),
            shutdown_tx,
        })
    }

    async fn seed_campaign(state: &Arc<DaemonState>) -> u64 {
        let db = state.db.lock().await;
        let campaign_id = campaigns::insert(
            &db, "Test Film", "creator-1", "USD", 1, 5000, 1000, 4000, 0,
        )
        .expect("insert campaign");
        campaigns::mark_funded(&db, campaign_id).expect("fund");
        campaigns::insert_investment(&db, campaign_id, "alice", 6000, None, 0).expect("invest");
        campaigns::insert_investment(&db, campaign_id, "bob", 4000, None, 0).expect("invest");
        revenue::insert(
            &db,
            campaign_id,
            RevenueSource::BoxOffice,
            "settle-1",
            100_000,
            "USD",
            0,
            0,
        )
        .expect("insert entry");
        campaign_id
    }

    #[tokio::test]
    async fn test_cycle_without_mirror_finalizes_directly() {
        let state = test_state(false);
        seed_campaign(&state).await;

        let outcome = run_cycle(&state).await.expect("cycle");
        assert_eq!(outcome.verified, 1);
        assert_eq!(outcome.distributed, 1);
        assert_eq!(outcome.finalized, 1);
        assert_eq!(outcome.submitted, 0);

        let db = state.db.lock().await;
        let claimable = royalties::claimable_total(&db, "alice").expect("total");
        assert_eq!(claimable, 24_000);
    }

    #[tokio::test]
    async fn test_cycle_with_mirror_submits_then_confirms() {
        let state = test_state(true);
        seed_campaign(&state).await;

        // Cycle 1: verify, distribute, submit on chain
        let outcome = run_cycle(&state).await.expect("cycle");
        assert_eq!(outcome.distributed, 1);
        assert_eq!(outcome.submitted, 1);
        assert_eq!(outcome.confirmed, 0);

        {
            let db = state.db.lock().await;
            let royalties = royalties::list_by_investor(&db, "alice", 10).expect("list");
            assert_eq!(royalties[0].status, RoyaltyStatus::Pending);
        }

        // Cycle 2: one poll reaches threshold 1 and releases royalties
        let outcome = run_cycle(&state).await.expect("cycle");
        assert_eq!(outcome.confirmed, 1);

        let db = state.db.lock().await;
        assert_eq!(
            royalties::claimable_total(&db, "alice").expect("total"),
            24_000
        );
    }

    #[tokio::test]
    async fn test_idle_cycle_emits_event() {
        let state = test_state(false);
        let mut rx = state.event_bus.subscribe();

        let outcome = run_cycle(&state).await.expect("cycle");
        assert!(outcome.is_idle());

        let event = rx.try_recv().expect("event");
        assert_eq!(event.event_type, "CycleCompleted");
    }
}
