//! Integration test: delivery and distribution guarantees.
//!
//! Upstream sources re-deliver payloads and operators re-run commands;
//! neither may ever double-count money:
//! 1. Re-ingesting a payload is a no-op (UNIQUE source + external_ref)
//! 2. An entry is distributed at most once (UNIQUE entry_id)
//! 3. Resubmitting a distribution on chain yields the same transaction
//! 4. Releasing and claiming are one-shot transitions

use reelfund_chain::contract::{DistributionRecord, RoyaltyContract};
use reelfund_chain::mirror;
use reelfund_chain::stub::StubContract;
use reelfund_db::queries::{campaigns, distributions, revenue, royalties};
use reelfund_engine::{claims, distribute};
use reelfund_ingest::pipeline::{self, IngestOutcome};
use reelfund_ingest::{verify, RevenueEvent};
use reelfund_types::revenue::{EntryStatus, RevenueSource};

const BASE_TIME: u64 = 1_700_000_000;

fn setup_funded_campaign(conn: &rusqlite::Connection) -> u64 {
    let campaign_id = campaigns::insert(
        conn,
        "Midnight Reel",
        "creator-1",
        "USD",
        1_000_000,
        5000,
        1000,
        4000,
        BASE_TIME,
    )
    .expect("campaign insertion should succeed");
    campaigns::insert_investment(conn, campaign_id, "alice", 1_000, None, BASE_TIME)
        .expect("investment should succeed");
    campaigns::mark_funded(conn, campaign_id).expect("funding should succeed");
    campaign_id
}

fn event(campaign_id: u64, external_ref: &str, amount_cents: u64) -> RevenueEvent {
    RevenueEvent {
        campaign_id,
        source: RevenueSource::BoxOffice,
        external_ref: external_ref.to_string(),
        amount_cents,
        currency: "USD".to_string(),
        revenue_date: BASE_TIME,
    }
}

#[tokio::test]
async fn redelivered_payload_is_not_double_counted() {
    let conn = &mut reelfund_db::open_memory().expect("open DB");
    let campaign_id = setup_funded_campaign(conn);
    let e = event(campaign_id, "settle-1", 100_000);

    let first = pipeline::ingest(conn, &e, BASE_TIME + 100).expect("first ingest");
    assert!(matches!(first, IngestOutcome::Inserted(_)));

    // Same (source, external_ref) delivered three more times
    for _ in 0..3 {
        let repeat = pipeline::ingest(conn, &e, BASE_TIME + 200).expect("re-ingest");
        assert_eq!(repeat, IngestOutcome::Duplicate, "re-delivery must be a no-op");
    }

    let entries = revenue::list_by_campaign(conn, campaign_id, 10).expect("list");
    assert_eq!(entries.len(), 1, "exactly one ledger entry must exist");
    assert_eq!(entries[0].ingested_at, BASE_TIME + 100, "first delivery wins");
}

#[tokio::test]
async fn entry_distributed_at_most_once() {
    let conn = &mut reelfund_db::open_memory().expect("open DB");
    let campaign_id = setup_funded_campaign(conn);
    pipeline::ingest(conn, &event(campaign_id, "settle-1", 100_000), BASE_TIME)
        .expect("ingest");
    verify::verify_pending(conn, BASE_TIME + 100).expect("verify");

    let first = distribute::run_all(conn, BASE_TIME + 200).expect("first run");
    assert_eq!(first.distributions.len(), 1);

    // Repeated runs find the entry processed and create nothing
    for _ in 0..3 {
        let repeat = distribute::run_all(conn, BASE_TIME + 300).expect("re-run");
        assert!(repeat.distributions.is_empty(), "re-run must not distribute again");
    }

    let dists = distributions::list_by_campaign(conn, campaign_id, 10).expect("list");
    assert_eq!(dists.len(), 1, "exactly one distribution must exist");

    // The royalty rows were written exactly once too
    let shares = royalties::list_by_distribution(conn, dists[0].id).expect("list");
    assert_eq!(shares.len(), 1);
}

#[tokio::test]
async fn racing_runner_rolls_back_and_skips() {
    let conn = &mut reelfund_db::open_memory().expect("open DB");
    let campaign_id = setup_funded_campaign(conn);
    let outcome = pipeline::ingest(conn, &event(campaign_id, "settle-1", 100_000), BASE_TIME)
        .expect("ingest");
    let IngestOutcome::Inserted(entry_id) = outcome else {
        panic!("expected insert");
    };
    verify::verify_pending(conn, BASE_TIME + 100).expect("verify");

    // A competing runner commits this entry's distribution first
    distributions::insert(
        conn, campaign_id, entry_id, 100_000, 50_000, 10_000, 40_000, BASE_TIME + 150,
    )
    .expect("competing insert");

    let outcome = distribute::run_all(conn, BASE_TIME + 200).expect("run");
    assert!(outcome.distributions.is_empty(), "the loser must create nothing");
    assert_eq!(outcome.skipped_already, 1);

    // The loser's transaction rolled back whole: one distribution row,
    // no royalty rows written alongside it, the entry untouched
    let dists = distributions::list_by_campaign(conn, campaign_id, 10).expect("list");
    assert_eq!(dists.len(), 1);
    assert!(royalties::list_by_distribution(conn, dists[0].id)
        .expect("list")
        .is_empty());
    let entries = revenue::list_by_campaign(conn, campaign_id, 10).expect("list");
    assert_eq!(entries[0].status, EntryStatus::Verified);
}

#[tokio::test]
async fn contract_resubmission_is_deterministic() {
    let contract = StubContract::new();
    let record = DistributionRecord {
        distribution_id: 1,
        campaign_id: 1,
        entry_id: 1,
        gross_cents: 100_000,
        creator_cents: 50_000,
        platform_cents: 10_000,
        investor_cents: 40_000,
    };

    let tx1 = contract.record_distribution(&record).expect("submit");
    let tx2 = contract.record_distribution(&record).expect("resubmit");
    assert_eq!(tx1, tx2, "resubmission must reuse the same transaction");
    assert_eq!(contract.submitted_count(), 1, "only one on-chain record exists");
}

#[tokio::test]
async fn mirror_retry_after_failure_converges() {
    let conn = &mut reelfund_db::open_memory().expect("open DB");
    let campaign_id = setup_funded_campaign(conn);
    pipeline::ingest(conn, &event(campaign_id, "settle-1", 100_000), BASE_TIME)
        .expect("ingest");
    verify::verify_pending(conn, BASE_TIME + 100).expect("verify");
    distribute::run_all(conn, BASE_TIME + 200).expect("distribute");

    let contract = StubContract::new();
    contract.set_fail_submissions(true);

    // Two failing cycles; the distribution stays retriable
    for _ in 0..2 {
        let outcome = mirror::run_cycle(conn, &contract, 1, BASE_TIME + 300).expect("cycle");
        assert_eq!(outcome.failed, 1);
    }
    assert_eq!(contract.submitted_count(), 0);

    // Recovery: submit once, confirm once
    contract.set_fail_submissions(false);
    let outcome = mirror::run_cycle(conn, &contract, 1, BASE_TIME + 400).expect("cycle");
    assert_eq!(outcome.submitted, 1);
    let outcome = mirror::run_cycle(conn, &contract, 1, BASE_TIME + 500).expect("cycle");
    assert_eq!(outcome.confirmed, 1);
    assert_eq!(contract.submitted_count(), 1, "failures never duplicated the record");
}

#[tokio::test]
async fn release_and_claim_are_one_shot() {
    let conn = &mut reelfund_db::open_memory().expect("open DB");
    let campaign_id = setup_funded_campaign(conn);
    pipeline::ingest(conn, &event(campaign_id, "settle-1", 100_000), BASE_TIME)
        .expect("ingest");
    verify::verify_pending(conn, BASE_TIME + 100).expect("verify");
    let outcome = distribute::run_all(conn, BASE_TIME + 200).expect("distribute");
    let dist_id = outcome.distributions[0];

    assert_eq!(claims::finalize(conn, dist_id, BASE_TIME + 300).expect("finalize"), 1);
    // A second finalize hits the status guard
    assert!(claims::finalize(conn, dist_id, BASE_TIME + 400).is_err());

    let shares = royalties::list_by_distribution(conn, dist_id).expect("list");
    claims::claim(conn, shares[0].id, "alice", BASE_TIME + 500).expect("claim");
    assert!(
        claims::claim(conn, shares[0].id, "alice", BASE_TIME + 600).is_err(),
        "double claim must fail"
    );
}
