//! The mirror worker: submit pending distributions, confirm submitted
//! ones, release royalties.
//!
//! One cycle does two passes:
//!
//! 1. Submit every pending or failed distribution that has no
//!    transaction hash yet. A successful submission stores the hash
//!    (and clears a failed status); a failure marks the distribution
//!    failed so the next cycle retries it.
//! 2. Poll every distribution submitted in an earlier cycle. At the
//!    confirmation threshold the distribution completes and its
//!    royalties become claimable. Submissions made in pass 1 wait for
//!    the next cycle before their first poll.

use rusqlite::Connection;

use reelfund_db::queries::{distributions, royalties};
use reelfund_types::royalty::{DistributionStatus, RoyaltyDistribution};

use crate::contract::{DistributionRecord, RoyaltyContract};
use crate::Result;

/// Maximum distributions handled per pass.
const PASS_LIMIT: u32 = 200;

/// Outcome of one mirror cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub submitted: usize,
    pub confirmed: usize,
    pub failed: usize,
}

fn record_for(distribution: &RoyaltyDistribution) -> DistributionRecord {
    DistributionRecord {
        distribution_id: distribution.id,
        campaign_id: distribution.campaign_id,
        entry_id: distribution.entry_id,
        gross_cents: distribution.gross_cents,
        creator_cents: distribution.creator_cents,
        platform_cents: distribution.platform_cents,
        investor_cents: distribution.investor_cents,
    }
}

/// Run one submit/confirm cycle against the contract.
pub fn run_cycle(
    conn: &Connection,
    contract: &dyn RoyaltyContract,
    confirmation_threshold: u32,
    now: u64,
) -> Result<MirrorOutcome> {
    let mut outcome = MirrorOutcome::default();

    // Snapshot before submitting so fresh submissions are not polled
    // in the same cycle.
    let awaiting = distributions::list_awaiting_confirmation(conn, PASS_LIMIT)?;

    // Pass 1: submit
    for distribution in distributions::list_unsubmitted(conn, PASS_LIMIT)? {
        match contract.record_distribution(&record_for(&distribution)) {
            Ok(tx_hash) => {
                distributions::set_tx_hash(conn, distribution.id, &tx_hash)?;
                tracing::info!(
                    distribution_id = distribution.id,
                    tx_hash = %hex::encode(tx_hash),
                    "distribution submitted on chain"
                );
                outcome.submitted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    distribution_id = distribution.id,
                    error = %e,
                    "on-chain submission failed"
                );
                if distribution.status == DistributionStatus::Pending {
                    distributions::mark_failed(conn, distribution.id)?;
                }
                outcome.failed += 1;
            }
        }
    }

    // Pass 2: confirm
    for distribution in awaiting {
        let Some(tx_hash) = distribution.tx_hash else {
            continue;
        };
        let depth = match contract.confirmations(&tx_hash) {
            Ok(depth) => depth,
            Err(e) => {
                tracing::warn!(
                    distribution_id = distribution.id,
                    error = %e,
                    "confirmation poll failed"
                );
                continue;
            }
        };

        if depth >= confirmation_threshold {
            distributions::mark_completed(conn, distribution.id)?;
            let released = royalties::release_for_distribution(conn, distribution.id, now)?;
            tracing::info!(
                distribution_id = distribution.id,
                confirmations = depth,
                released,
                "distribution confirmed; royalties claimable"
            );
            outcome.confirmed += 1;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubContract;
    use reelfund_db::queries::{campaigns, revenue};
    use reelfund_types::revenue::RevenueSource;
    use reelfund_types::royalty::RoyaltyStatus;

    fn setup() -> (Connection, u64) {
        let conn = reelfund_db::open_memory().expect("open");
        let campaign_id = campaigns::insert(
            &conn, "Test Film", "creator-1", "USD", 1, 5000, 1000, 4000, 0,
        )
        .expect("insert campaign");
        let entry_id = revenue::insert(
            &conn,
            campaign_id,
            RevenueSource::BoxOffice,
            "settle-1",
            100_000,
            "USD",
            0,
            0,
        )
        .expect("insert entry");
        let dist_id = distributions::insert(
            &conn, campaign_id, entry_id, 100_000, 50_000, 10_000, 40_000, 100,
        )
        .expect("insert distribution");
        royalties::insert(&conn, dist_id, "alice", None, 1000, 10_000, 40_000)
            .expect("insert royalty");
        (conn, dist_id)
    }

    #[test]
    fn test_submit_then_confirm_at_threshold() {
        let (conn, dist_id) = setup();
        let contract = StubContract::new();

        // Cycle 1: submit
        let outcome = run_cycle(&conn, &contract, 3, 1000).expect("cycle");
        assert_eq!(outcome, MirrorOutcome { submitted: 1, confirmed: 0, failed: 0 });
        assert!(distributions::get(&conn, dist_id).expect("get").tx_hash.is_some());

        // Cycles 2-3: confirmations 1, 2 — below threshold
        for _ in 0..2 {
            let outcome = run_cycle(&conn, &contract, 3, 1000).expect("cycle");
            assert_eq!(outcome.confirmed, 0);
        }

        // Cycle 4: confirmation 3 — distribution completes
        let outcome = run_cycle(&conn, &contract, 3, 2000).expect("cycle");
        assert_eq!(outcome.confirmed, 1);
        assert_eq!(
            distributions::get(&conn, dist_id).expect("get").status,
            DistributionStatus::Completed
        );

        let shares = royalties::list_by_distribution(&conn, dist_id).expect("list");
        assert_eq!(shares[0].status, RoyaltyStatus::Claimable);
        assert_eq!(shares[0].claimable_at, Some(2000));
    }

    #[test]
    fn test_fresh_submission_not_confirmed_same_cycle() {
        let (conn, dist_id) = setup();
        let contract = StubContract::new();

        // Even at threshold 1 a submission waits a full cycle
        let outcome = run_cycle(&conn, &contract, 1, 1000).expect("cycle");
        assert_eq!(outcome, MirrorOutcome { submitted: 1, confirmed: 0, failed: 0 });
        assert_eq!(
            distributions::get(&conn, dist_id).expect("get").status,
            DistributionStatus::Pending
        );
    }

    #[test]
    fn test_submission_failure_retried() {
        let (conn, dist_id) = setup();
        let contract = StubContract::new();
        contract.set_fail_submissions(true);

        let outcome = run_cycle(&conn, &contract, 1, 1000).expect("cycle");
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            distributions::get(&conn, dist_id).expect("get").status,
            DistributionStatus::Failed
        );

        // Next cycle succeeds and clears the failed status
        contract.set_fail_submissions(false);
        let outcome = run_cycle(&conn, &contract, 1, 2000).expect("cycle");
        assert_eq!(outcome.submitted, 1);
        assert_eq!(
            distributions::get(&conn, dist_id).expect("get").status,
            DistributionStatus::Pending
        );

        // And the one after confirms at threshold 1
        let outcome = run_cycle(&conn, &contract, 1, 3000).expect("cycle");
        assert_eq!(outcome.confirmed, 1);
    }

    #[test]
    fn test_completed_distribution_untouched() {
        let (conn, dist_id) = setup();
        let contract = StubContract::new();
        run_cycle(&conn, &contract, 1, 1000).expect("submit");
        run_cycle(&conn, &contract, 1, 1000).expect("confirm");

        let before = distributions::get(&conn, dist_id).expect("get");
        let outcome = run_cycle(&conn, &contract, 1, 2000).expect("idle cycle");
        assert_eq!(outcome, MirrorOutcome::default());
        let after = distributions::get(&conn, dist_id).expect("get");
        assert_eq!(before.status, after.status);
    }
}
