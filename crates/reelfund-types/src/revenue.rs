//! Revenue entry structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CampaignId, EntryId, ParseEnumError};

/// External source a revenue event originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    /// Theatrical box office settlement.
    BoxOffice,
    /// OTT streaming platform statement.
    Streaming,
    /// Marketplace resale royalty.
    Resale,
}

impl RevenueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoxOffice => "box_office",
            Self::Streaming => "streaming",
            Self::Resale => "resale",
        }
    }
}

impl FromStr for RevenueSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box_office" => Ok(Self::BoxOffice),
            "streaming" => Ok(Self::Streaming),
            "resale" => Ok(Self::Resale),
            other => Err(ParseEnumError {
                kind: "revenue source",
                value: other.to_string(),
            }),
        }
    }
}

/// Processing status of a revenue entry.
///
/// Transitions are monotonic: `Pending -> {Verified, Failed}` and
/// `Verified -> Processed`. A Processed entry has exactly one
/// distribution; a Failed entry never gets one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Verified,
    Processed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for EntryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError {
                kind: "entry status",
                value: other.to_string(),
            }),
        }
    }
}

/// A recorded unit of income attributable to a campaign.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub id: EntryId,
    pub campaign_id: CampaignId,
    pub source: RevenueSource,
    /// Upstream identifier of the event (settlement id, statement line,
    /// sale id). Unique per source; re-ingesting is a no-op.
    pub external_ref: String,
    pub amount_cents: u64,
    pub currency: String,
    pub status: EntryStatus,
    /// Populated when verification fails.
    pub failure_reason: Option<String>,
    /// When the revenue was earned upstream.
    pub revenue_date: u64,
    pub ingested_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in [
            RevenueSource::BoxOffice,
            RevenueSource::Streaming,
            RevenueSource::Resale,
        ] {
            let parsed: RevenueSource = source.as_str().parse().expect("parse");
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_entry_status_round_trip() {
        for status in [
            EntryStatus::Pending,
            EntryStatus::Verified,
            EntryStatus::Processed,
            EntryStatus::Failed,
        ] {
            let parsed: EntryStatus = status.as_str().parse().expect("parse");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_source_serde_snake_case() {
        let json = serde_json::to_string(&RevenueSource::BoxOffice).expect("serialize");
        assert_eq!(json, "\"box_office\"");
    }
}
