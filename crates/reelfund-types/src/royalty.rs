//! Distribution and investor royalty structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CampaignId, DistributionId, EntryId, ParseEnumError, RoyaltyId, TxHash};

/// Status of a royalty distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    /// Written locally; awaiting on-chain mirror confirmation.
    Pending,
    /// Finalized; investor royalties are claimable.
    Completed,
    /// On-chain submission failed; retried on the next cycle.
    Failed,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for DistributionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError {
                kind: "distribution status",
                value: other.to_string(),
            }),
        }
    }
}

/// Claim lifecycle status of an investor royalty.
///
/// `Pending -> Claimable -> {Claimed, Expired}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoyaltyStatus {
    Pending,
    Claimable,
    Claimed,
    Expired,
}

impl RoyaltyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimable => "claimable",
            Self::Claimed => "claimed",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for RoyaltyStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "claimable" => Ok(Self::Claimable),
            "claimed" => Ok(Self::Claimed),
            "expired" => Ok(Self::Expired),
            other => Err(ParseEnumError {
                kind: "royalty status",
                value: other.to_string(),
            }),
        }
    }
}

/// The split of one verified revenue entry between creator, platform,
/// and the investor pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoyaltyDistribution {
    pub id: DistributionId,
    pub campaign_id: CampaignId,
    /// The originating revenue entry. One distribution per entry, ever.
    pub entry_id: EntryId,
    pub gross_cents: u64,
    pub creator_cents: u64,
    pub platform_cents: u64,
    pub investor_cents: u64,
    pub status: DistributionStatus,
    /// On-chain mirror transaction, once submitted.
    pub tx_hash: Option<TxHash>,
    pub distributed_at: u64,
}

/// A per-investor claimable share of a distribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvestorRoyalty {
    pub id: RoyaltyId,
    pub distribution_id: DistributionId,
    pub investor: String,
    pub nft_id: Option<String>,
    /// The stake this share was computed from, in cents.
    pub contribution_cents: u64,
    /// The investor's fraction of the pool, in basis points (floor).
    pub share_bps: u16,
    pub amount_cents: u64,
    pub status: RoyaltyStatus,
    /// Set when the royalty became claimable; expiry is measured from
    /// this instant.
    pub claimable_at: Option<u64>,
    pub claimed_at: Option<u64>,
}
