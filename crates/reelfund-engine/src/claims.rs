//! Claim lifecycle: release, claim, expiry.
//!
//! Royalties are inserted pending and released to claimable when their
//! distribution is finalized. Claimable royalties that outlive the
//! claim window are swept to expired.

use rusqlite::Connection;

use reelfund_db::queries::{distributions, royalties};
use reelfund_types::{DistributionId, RoyaltyId};

use crate::Result;

/// Default claim window: 90 days.
pub const DEFAULT_CLAIM_WINDOW_SECS: u64 = 90 * 24 * 3600;

/// Finalize a distribution: mark it completed and release its royalties
/// for claiming. Returns the number of royalties released.
///
/// Called by the mirror worker once the on-chain transaction confirms,
/// or directly by the engine when mirroring is disabled.
pub fn finalize(conn: &Connection, distribution_id: DistributionId, now: u64) -> Result<usize> {
    distributions::mark_completed(conn, distribution_id)?;
    let released = royalties::release_for_distribution(conn, distribution_id, now)?;
    tracing::info!(distribution_id, released, "distribution finalized");
    Ok(released)
}

/// Claim a royalty on behalf of an investor.
pub fn claim(conn: &Connection, royalty_id: RoyaltyId, investor: &str, now: u64) -> Result<()> {
    royalties::claim(conn, royalty_id, investor, now)?;
    tracing::info!(royalty_id, investor, "royalty claimed");
    Ok(())
}

/// Expire claimable royalties older than the claim window. Returns the
/// number expired.
pub fn expire_stale(conn: &Connection, now: u64, window_secs: u64) -> Result<usize> {
    let expired = royalties::expire_stale(conn, now, window_secs)?;
    if expired > 0 {
        tracing::info!(expired, window_secs, "stale royalties expired");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelfund_db::queries::{campaigns, revenue};
    use reelfund_types::revenue::RevenueSource;
    use reelfund_types::royalty::{DistributionStatus, RoyaltyStatus};

    fn setup_distribution(conn: &Connection) -> (DistributionId, RoyaltyId) {
        let campaign_id = campaigns::insert(
            conn, "Test Film", "creator-1", "USD", 1, 5000, 1000, 4000, 0,
        )
        .expect("insert campaign");
        let entry_id = revenue::insert(
            conn,
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
            conn, campaign_id, entry_id, 100_000, 50_000, 10_000, 40_000, 100,
        )
        .expect("insert distribution");
        let royalty_id =
            royalties::insert(conn, dist_id, "alice", None, 1000, 10_000, 40_000)
                .expect("insert royalty");
        (dist_id, royalty_id)
    }

    #[test]
    fn test_finalize_releases_royalties() {
        let conn = reelfund_db::open_memory().expect("open");
        let (dist_id, royalty_id) = setup_distribution(&conn);

        let released = finalize(&conn, dist_id, 500).expect("finalize");
        assert_eq!(released, 1);
        assert_eq!(
            distributions::get(&conn, dist_id).expect("get").status,
            DistributionStatus::Completed
        );
        let royalty = royalties::get(&conn, royalty_id).expect("get");
        assert_eq!(royalty.status, RoyaltyStatus::Claimable);
        assert_eq!(royalty.claimable_at, Some(500));
    }

    #[test]
    fn test_finalize_twice_fails() {
        let conn = reelfund_db::open_memory().expect("open");
        let (dist_id, _) = setup_distribution(&conn);
        finalize(&conn, dist_id, 500).expect("finalize");
        assert!(finalize(&conn, dist_id, 600).is_err());
    }

    #[test]
    fn test_claim_then_expire_sweep_ignores_claimed() {
        let conn = reelfund_db::open_memory().expect("open");
        let (dist_id, royalty_id) = setup_distribution(&conn);
        finalize(&conn, dist_id, 500).expect("finalize");
        claim(&conn, royalty_id, "alice", 600).expect("claim");

        let expired = expire_stale(&conn, 600 + DEFAULT_CLAIM_WINDOW_SECS * 2, DEFAULT_CLAIM_WINDOW_SECS)
            .expect("sweep");
        assert_eq!(expired, 0);
        assert_eq!(
            royalties::get(&conn, royalty_id).expect("get").status,
            RoyaltyStatus::Claimed
        );
    }

    #[test]
    fn test_expire_unclaimed() {
        let conn = reelfund_db::open_memory().expect("open");
        let (dist_id, royalty_id) = setup_distribution(&conn);
        finalize(&conn, dist_id, 500).expect("finalize");

        let expired = expire_stale(&conn, 500 + DEFAULT_CLAIM_WINDOW_SECS, DEFAULT_CLAIM_WINDOW_SECS)
            .expect("sweep");
        assert_eq!(expired, 1);
        assert!(claim(&conn, royalty_id, "alice", 999_999_999).is_err());
    }
}
