//! Campaign and investment structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CampaignId, ParseEnumError};

/// Lifecycle status of a campaign.
///
/// Revenue is only attributed to funded campaigns; a campaign that never
/// reaches its goal has nothing to distribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Funded,
    Closed,
}

impl CampaignStatus {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Funded => "funded",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "funded" => Ok(Self::Funded),
            "closed" => Ok(Self::Closed),
            other => Err(ParseEnumError {
                kind: "campaign status",
                value: other.to_string(),
            }),
        }
    }
}

/// A crowdfunding campaign.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    /// Creator account identifier.
    pub creator: String,
    /// ISO-4217 alpha code. Authoritative for all revenue attributed to
    /// this campaign.
    pub currency: String,
    pub goal_cents: u64,
    pub status: CampaignStatus,
    /// Creator share of each revenue split, in basis points.
    pub creator_bps: u16,
    /// Platform share, in basis points.
    pub platform_bps: u16,
    /// Total investor share, in basis points.
    pub investor_bps: u16,
    pub created_at: u64,
}

/// An investor's stake in a campaign.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Investment {
    pub id: u64,
    pub campaign_id: CampaignId,
    /// Investor account identifier.
    pub investor: String,
    /// Contribution in cents. Stakes are weighted by this amount.
    pub amount_cents: u64,
    /// Fractional-ownership token identifier, if one was minted.
    pub nft_id: Option<String>,
    pub invested_at: u64,
}
