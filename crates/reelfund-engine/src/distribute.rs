//! At-most-once distribution of verified revenue entries.
//!
//! Each entry is processed inside its own SQLite transaction: split the
//! gross amount, allocate the investor pool across stakes, write the
//! distribution and its royalty rows, and mark the entry processed.
//! The UNIQUE constraint on `royalty_distributions.entry_id` makes the
//! whole step at-most-once even when two runners race; the loser's
//! transaction rolls back and the entry is skipped.

use rusqlite::Connection;

use reelfund_db::queries::{campaigns, distributions, revenue, royalties};
use reelfund_royalty::allocate::allocate;
use reelfund_royalty::splits::{self, SplitChangeProposal, SplitConfig};
use reelfund_types::revenue::{EntryStatus, RevenueEntry};
use reelfund_types::{CampaignId, DistributionId};

use crate::{EngineError, Result};

/// Maximum entries distributed per run.
const RUN_LIMIT: u32 = 500;

/// Outcome of a distribution run.
#[derive(Debug, Clone, Default)]
pub struct DistributeOutcome {
    /// Ids of distributions created by this run.
    pub distributions: Vec<DistributionId>,
    /// Entries left verified because their campaign has no investors.
    pub skipped_no_investors: usize,
    /// Entries that lost the at-most-once race to another runner.
    pub skipped_already: usize,
}

/// The split currently in force for a campaign.
///
/// Applies any pending split change whose timelock has expired, then
/// returns the stored configuration.
pub fn effective_split(
    conn: &Connection,
    campaign_id: CampaignId,
    now: u64,
) -> Result<SplitConfig> {
    if let Some(change) = campaigns::pending_split(conn, campaign_id)? {
        if now >= change.effective_at {
            campaigns::update_split(
                conn,
                campaign_id,
                change.creator_bps,
                change.platform_bps,
                change.investor_bps,
            )?;
            campaigns::delete_pending_split(conn, campaign_id)?;
            tracing::info!(
                campaign_id,
                creator_bps = change.creator_bps,
                platform_bps = change.platform_bps,
                investor_bps = change.investor_bps,
                "split change applied after timelock"
            );
        }
    }

    let campaign = campaigns::get(conn, campaign_id)?;
    Ok(SplitConfig {
        creator_bps: campaign.creator_bps,
        platform_bps: campaign.platform_bps,
        investor_bps: campaign.investor_bps,
    })
}

/// Propose a timelocked split change for a campaign.
pub fn propose_split(
    conn: &Connection,
    campaign_id: CampaignId,
    new: SplitConfig,
    now: u64,
) -> Result<SplitChangeProposal> {
    let current = effective_split(conn, campaign_id, now)?;
    let proposal = splits::propose_split_change(&current, new, now)?;
    campaigns::upsert_pending_split(
        conn,
        &campaigns::PendingSplitChange {
            campaign_id,
            creator_bps: proposal.new_split.creator_bps,
            platform_bps: proposal.new_split.platform_bps,
            investor_bps: proposal.new_split.investor_bps,
            proposed_at: proposal.proposed_at,
            effective_at: proposal.effective_at,
        },
    )?;
    Ok(proposal)
}

/// Distribute every verified entry, across all campaigns.
pub fn run_all(conn: &mut Connection, now: u64) -> Result<DistributeOutcome> {
    let entries = revenue::list_by_status(conn, EntryStatus::Verified, RUN_LIMIT)?;
    run_entries(conn, &entries, now)
}

/// Distribute the verified entries of a single campaign.
pub fn run_campaign(
    conn: &mut Connection,
    campaign_id: CampaignId,
    now: u64,
) -> Result<DistributeOutcome> {
    let entries =
        revenue::list_by_campaign_status(conn, campaign_id, EntryStatus::Verified, RUN_LIMIT)?;
    run_entries(conn, &entries, now)
}

fn run_entries(
    conn: &mut Connection,
    entries: &[RevenueEntry],
    now: u64,
) -> Result<DistributeOutcome> {
    let mut outcome = DistributeOutcome::default();

    for entry in entries {
        // Apply any expired split timelock outside the entry transaction
        let split = effective_split(conn, entry.campaign_id, now)?;

        match distribute_entry(conn, entry, &split, now)? {
            EntryOutcome::Distributed(id) => outcome.distributions.push(id),
            EntryOutcome::NoInvestors => outcome.skipped_no_investors += 1,
            EntryOutcome::AlreadyDistributed => outcome.skipped_already += 1,
        }
    }

    Ok(outcome)
}

enum EntryOutcome {
    Distributed(DistributionId),
    NoInvestors,
    AlreadyDistributed,
}

/// Distribute one verified entry inside a transaction.
fn distribute_entry(
    conn: &mut Connection,
    entry: &RevenueEntry,
    split: &SplitConfig,
    now: u64,
) -> Result<EntryOutcome> {
    let stakes = campaigns::investments(conn, entry.campaign_id)?;
    if stakes.is_empty() {
        // Never fabricate investor rows: the entry stays verified until
        // the campaign has real investments.
        tracing::warn!(
            entry_id = entry.id,
            campaign_id = entry.campaign_id,
            "campaign has no investments; entry left verified"
        );
        return Ok(EntryOutcome::NoInvestors);
    }

    let (creator_cents, platform_cents, investor_cents) =
        splits::split(entry.amount_cents, split)?;

    let stake_amounts: Vec<u64> = stakes.iter().map(|s| s.amount_cents).collect();
    let allocations = allocate(investor_cents, &stake_amounts)?;

    let tx = conn.transaction().map_err(reelfund_db::DbError::Sqlite)?;

    let distribution_id = match distributions::insert(
        &tx,
        entry.campaign_id,
        entry.id,
        entry.amount_cents,
        creator_cents,
        platform_cents,
        investor_cents,
        now,
    ) {
        Ok(id) => id,
        Err(e) if e.is_unique_violation() => {
            tracing::debug!(entry_id = entry.id, "entry already distributed; skipping");
            return Ok(EntryOutcome::AlreadyDistributed);
        }
        Err(e) => return Err(EngineError::Db(e)),
    };

    for allocation in &allocations {
        let stake = &stakes[allocation.index];
        royalties::insert(
            &tx,
            distribution_id,
            &stake.investor,
            stake.nft_id.as_deref(),
            allocation.stake_cents,
            allocation.share_bps,
            allocation.amount_cents,
        )?;
    }

    revenue::mark_processed(&tx, entry.id)?;

    tx.commit().map_err(reelfund_db::DbError::Sqlite)?;

    tracing::info!(
        distribution_id,
        entry_id = entry.id,
        campaign_id = entry.campaign_id,
        gross_cents = entry.amount_cents,
        creator_cents,
        platform_cents,
        investor_cents,
        investors = allocations.len(),
        "revenue entry distributed"
    );

    Ok(EntryOutcome::Distributed(distribution_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelfund_types::campaign::CampaignStatus;
    use reelfund_types::revenue::RevenueSource;

    fn funded_campaign(conn: &Connection) -> CampaignId {
        let id = campaigns::insert(
            conn,
            "Test Film",
            "creator-1",
            "USD",
            1_000_000,
            5000,
            1000,
            4000,
            1_700_000_000,
        )
        .expect("insert campaign");
        campaigns::mark_funded(conn, id).expect("fund");
        id
    }

    fn verified_entry(conn: &Connection, campaign_id: CampaignId, ext: &str, amount: u64) -> u64 {
        let id = revenue::insert(
            conn,
            campaign_id,
            RevenueSource::BoxOffice,
            ext,
            amount,
            "USD",
            0,
            0,
        )
        .expect("insert entry");
        revenue::mark_verified(conn, id).expect("verify");
        id
    }

    #[test]
    fn test_distribute_splits_and_allocates() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_id = funded_campaign(&conn);
        campaigns::insert_investment(&conn, campaign_id, "alice", 6000, Some("nft-1"), 0)
            .expect("invest");
        campaigns::insert_investment(&conn, campaign_id, "bob", 4000, None, 0).expect("invest");
        let entry_id = verified_entry(&conn, campaign_id, "settle-1", 100_000);

        let outcome = run_all(&mut conn, 500).expect("run");
        assert_eq!(outcome.distributions.len(), 1);

        let dist = distributions::get(&conn, outcome.distributions[0]).expect("get");
        assert_eq!(dist.entry_id, entry_id);
        assert_eq!(dist.creator_cents, 50_000);
        assert_eq!(dist.platform_cents, 10_000);
        assert_eq!(dist.investor_cents, 40_000);

        let shares = royalties::list_by_distribution(&conn, dist.id).expect("list");
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].investor, "alice");
        assert_eq!(shares[0].amount_cents, 24_000);
        assert_eq!(shares[0].share_bps, 6000);
        assert_eq!(shares[0].nft_id.as_deref(), Some("nft-1"));
        assert_eq!(shares[1].amount_cents, 16_000);

        assert_eq!(
            revenue::get(&conn, entry_id).expect("get").status,
            EntryStatus::Processed
        );
    }

    #[test]
    fn test_run_is_idempotent() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_id = funded_campaign(&conn);
        campaigns::insert_investment(&conn, campaign_id, "alice", 1000, None, 0).expect("invest");
        verified_entry(&conn, campaign_id, "settle-1", 100_000);

        let first = run_all(&mut conn, 500).expect("first run");
        assert_eq!(first.distributions.len(), 1);

        // The entry is now processed; a second run finds nothing.
        let second = run_all(&mut conn, 600).expect("second run");
        assert!(second.distributions.is_empty());
        assert_eq!(second.skipped_already, 0);
    }

    #[test]
    fn test_no_investors_leaves_entry_verified() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_id = funded_campaign(&conn);
        let entry_id = verified_entry(&conn, campaign_id, "settle-1", 100_000);

        let outcome = run_all(&mut conn, 500).expect("run");
        assert!(outcome.distributions.is_empty());
        assert_eq!(outcome.skipped_no_investors, 1);
        assert_eq!(
            revenue::get(&conn, entry_id).expect("get").status,
            EntryStatus::Verified
        );

        // Once an investment lands, the entry distributes.
        campaigns::insert_investment(&conn, campaign_id, "alice", 1000, None, 0).expect("invest");
        let outcome = run_all(&mut conn, 600).expect("run");
        assert_eq!(outcome.distributions.len(), 1);
    }

    #[test]
    fn test_rounding_conserved_end_to_end() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_id = funded_campaign(&conn);
        for (investor, stake) in [("a", 13u64), ("b", 29), ("c", 51), ("d", 7)] {
            campaigns::insert_investment(&conn, campaign_id, investor, stake, None, 0)
                .expect("invest");
        }
        // Gross amount chosen to exercise both rounding layers
        verified_entry(&conn, campaign_id, "settle-odd", 99_991);

        let outcome = run_all(&mut conn, 500).expect("run");
        let dist = distributions::get(&conn, outcome.distributions[0]).expect("get");
        assert_eq!(
            dist.creator_cents + dist.platform_cents + dist.investor_cents,
            dist.gross_cents
        );

        let shares = royalties::list_by_distribution(&conn, dist.id).expect("list");
        let allocated: u64 = shares.iter().map(|r| r.amount_cents).sum();
        assert_eq!(allocated, dist.investor_cents);
    }

    #[test]
    fn test_run_campaign_scoped() {
        let mut conn = reelfund_db::open_memory().expect("open");
        let campaign_a = funded_campaign(&conn);
        let campaign_b = {
            let id = campaigns::insert(
                &conn, "Other Film", "creator-2", "USD", 1, 5000, 1000, 4000, 0,
            )
            .expect("insert");
            campaigns::mark_funded(&conn, id).expect("fund");
            id
        };
        campaigns::insert_investment(&conn, campaign_a, "alice", 100, None, 0).expect("invest");
        campaigns::insert_investment(&conn, campaign_b, "bob", 100, None, 0).expect("invest");
        verified_entry(&conn, campaign_a, "a-1", 1000);
        verified_entry(&conn, campaign_b, "b-1", 1000);

        let outcome = run_campaign(&mut conn, campaign_a, 500).expect("run");
        assert_eq!(outcome.distributions.len(), 1);

        let remaining = revenue::list_by_status(&conn, EntryStatus::Verified, 10).expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].campaign_id, campaign_b);
    }

    #[test]
    fn test_effective_split_applies_timelock() {
        let conn = reelfund_db::open_memory().expect("open");
        let campaign_id = funded_campaign(&conn);
        let now = 1_700_000_000;

        let proposal = propose_split(
            &conn,
            campaign_id,
            SplitConfig {
                creator_bps: 4000,
                platform_bps: 1000,
                investor_bps: 5000,
            },
            now,
        )
        .expect("propose");

        // Before the timelock the stored split is still in force
        let split = effective_split(&conn, campaign_id, now + 1).expect("split");
        assert_eq!(split.investor_bps, 4000);

        // After the timelock the change applies and the proposal clears
        let split = effective_split(&conn, campaign_id, proposal.effective_at).expect("split");
        assert_eq!(split.investor_bps, 5000);
        assert!(campaigns::pending_split(&conn, campaign_id)
            .expect("query")
            .is_none());

        let campaign = campaigns::get(&conn, campaign_id).expect("get");
        assert_eq!(campaign.status, CampaignStatus::Funded);
        assert_eq!(campaign.investor_bps, 5000);
    }
}
