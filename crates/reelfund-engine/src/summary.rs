//! Campaign-level revenue aggregates.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use reelfund_db::queries::{campaigns, distributions, royalties};
use reelfund_types::CampaignId;

use crate::Result;

/// Everything the platform reports about a campaign's revenue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: CampaignId,
    pub title: String,
    pub currency: String,
    /// Total contributed by investors, in cents.
    pub raised_cents: u64,
    /// Number of non-failed distributions.
    pub distributions: u64,
    pub gross_cents: u64,
    pub creator_cents: u64,
    pub platform_cents: u64,
    pub investor_cents: u64,
    pub claimed_cents: u64,
    pub unclaimed_cents: u64,
    pub expired_cents: u64,
}

/// Assemble the revenue summary for a campaign.
pub fn campaign_summary(conn: &Connection, campaign_id: CampaignId) -> Result<CampaignSummary> {
    let campaign = campaigns::get(conn, campaign_id)?;
    let raised_cents = campaigns::total_raised(conn, campaign_id)?;
    let totals = distributions::campaign_totals(conn, campaign_id)?;
    let claims = royalties::claim_totals(conn, campaign_id)?;

    Ok(CampaignSummary {
        campaign_id,
        title: campaign.title,
        currency: campaign.currency,
        raised_cents,
        distributions: totals.distributions,
        gross_cents: totals.gross_cents,
        creator_cents: totals.creator_cents,
        platform_cents: totals.platform_cents,
        investor_cents: totals.investor_cents,
        claimed_cents: claims.claimed_cents,
        unclaimed_cents: claims.unclaimed_cents,
        expired_cents: claims.expired_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims;
    use crate::distribute;
    use reelfund_db::queries::revenue;
    use reelfund_types::revenue::RevenueSource;

    #[test]
    fn test_summary_after_full_pipeline() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_id = campaigns::insert(
            &conn,
            "Test Film",
            "creator-1",
            "USD",
            1_000_000,
            5000,
            1000,
            4000,
            0,
        )
        .expect("insert campaign");
        campaigns::mark_funded(&conn, campaign_id).expect("fund");
        campaigns::insert_investment(&conn, campaign_id, "alice", 7500, None, 0).expect("invest");
        campaigns::insert_investment(&conn, campaign_id, "bob", 2500, None, 0).expect("invest");

        let entry_id = revenue::insert(
            &conn,
            campaign_id,
            RevenueSource::Streaming,
            "stmt-1/0",
            200_000,
            "USD",
            0,
            0,
        )
        .expect("insert entry");
        revenue::mark_verified(&conn, entry_id).expect("verify");

        let outcome = distribute::run_all(&mut conn, 100).expect("distribute");
        let dist_id = outcome.distributions[0];
        claims::finalize(&conn, dist_id, 200).expect("finalize");

        // Alice claims; bob's share stays outstanding
        let shares =
            reelfund_db::queries::royalties::list_by_distribution(&conn, dist_id).expect("list");
        claims::claim(&conn, shares[0].id, "alice", 300).expect("claim");

        let summary = campaign_summary(&conn, campaign_id).expect("summary");
        assert_eq!(summary.raised_cents, 10_000);
        assert_eq!(summary.distributions, 1);
        assert_eq!(summary.gross_cents, 200_000);
        assert_eq!(summary.creator_cents, 100_000);
        assert_eq!(summary.platform_cents, 20_000);
        assert_eq!(summary.investor_cents, 80_000);
        assert_eq!(summary.claimed_cents, 60_000);
        assert_eq!(summary.unclaimed_cents, 20_000);
        assert_eq!(summary.expired_cents, 0);
    }

    #[test]
    fn test_summary_empty_campaign() {
        let conn = reelfund_db::open_memory().expect("open");
        let campaign_id = campaigns::insert(
            &conn, "Quiet Film", "creator-1", "USD", 1, 5000, 1000, 4000, 0,
        )
        .expect("insert campaign");

        let summary = campaign_summary(&conn, campaign_id).expect("summary");
        assert_eq!(summary.distributions, 0);
        assert_eq!(summary.gross_cents, 0);
        assert_eq!(summary.raised_cents, 0);
    }
}
