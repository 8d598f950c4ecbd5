//! The royalty contract interface.

use serde::{Deserialize, Serialize};

use reelfund_types::{CampaignId, DistributionId, EntryId, TxHash};

use crate::Result;

/// The fields of a distribution that go on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub distribution_id: DistributionId,
    pub campaign_id: CampaignId,
    pub entry_id: EntryId,
    pub gross_cents: u64,
    pub creator_cents: u64,
    pub platform_cents: u64,
    pub investor_cents: u64,
}

/// A royalty distribution contract.
///
/// Implementations must be deterministic per record: resubmitting the
/// same record yields the same transaction hash, so a crash between
/// submit and the tx-hash write cannot double-record.
pub trait RoyaltyContract: Send + Sync {
    /// Record a distribution on chain. Returns the transaction hash.
    fn record_distribution(&self, record: &DistributionRecord) -> Result<TxHash>;

    /// Current confirmation depth of a submitted transaction.
    fn confirmations(&self, tx_hash: &TxHash) -> Result<u32>;
}
