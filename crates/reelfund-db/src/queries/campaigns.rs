//! Campaign and investment query functions.

use rusqlite::{Connection, Row};

use reelfund_types::campaign::{Campaign, CampaignStatus, Investment};
use reelfund_types::CampaignId;

use crate::{DbError, Result};

fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get::<_, i64>(0)? as u64,
        title: row.get(1)?,
        creator: row.get(2)?,
        currency: row.get(3)?,
        goal_cents: row.get::<_, i64>(4)? as u64,
        status: parse_col::<CampaignStatus>(row, 5)?,
        creator_bps: row.get::<_, i64>(6)? as u16,
        platform_bps: row.get::<_, i64>(7)? as u16,
        investor_bps: row.get::<_, i64>(8)? as u16,
        created_at: row.get::<_, i64>(9)? as u64,
    })
}

const CAMPAIGN_COLS: &str = "id, title, creator, currency, goal_cents, status, \
     creator_bps, platform_bps, investor_bps, created_at";

/// Insert a campaign. Returns the new campaign id.
#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &Connection,
    title: &str,
    creator: &str,
    currency: &str,
    goal_cents: u64,
    creator_bps: u16,
    platform_bps: u16,
    investor_bps: u16,
    created_at: u64,
) -> Result<CampaignId> {
    conn.execute(
        "INSERT INTO campaigns (title, creator, currency, goal_cents, status,
                                creator_bps, platform_bps, investor_bps, created_at)
         VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?6, ?7, ?8)",
        rusqlite::params![
            title,
            creator,
            currency,
            goal_cents as i64,
            creator_bps as i64,
            platform_bps as i64,
            investor_bps as i64,
            created_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Get a campaign by id.
pub fn get(conn: &Connection, id: CampaignId) -> Result<Campaign> {
    conn.query_row(
        &format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"),
        [id as i64],
        campaign_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("campaign {id}")),
        other => DbError::Sqlite(other),
    })
}

/// List all campaigns, newest first.
pub fn list(conn: &Connection) -> Result<Vec<Campaign>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CAMPAIGN_COLS} FROM campaigns ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([], campaign_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Mark a campaign as funded. Only an active campaign can be funded.
pub fn mark_funded(conn: &Connection, id: CampaignId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE campaigns SET status = 'funded' WHERE id = ?1 AND status = 'active'",
        [id as i64],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("campaign {id} not active")));
    }
    Ok(())
}

/// Overwrite a campaign's split configuration.
///
/// Callers are responsible for the timelock; this is the final apply.
pub fn update_split(
    conn: &Connection,
    id: CampaignId,
    creator_bps: u16,
    platform_bps: u16,
    investor_bps: u16,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE campaigns SET creator_bps = ?1, platform_bps = ?2, investor_bps = ?3
         WHERE id = ?4",
        rusqlite::params![
            creator_bps as i64,
            platform_bps as i64,
            investor_bps as i64,
            id as i64,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("campaign {id}")));
    }
    Ok(())
}

/// Record an investment in a campaign. Returns the investment id.
pub fn insert_investment(
    conn: &Connection,
    campaign_id: CampaignId,
    investor: &str,
    amount_cents: u64,
    nft_id: Option<&str>,
    invested_at: u64,
) -> Result<u64> {
    conn.execute(
        "INSERT INTO investments (campaign_id, investor, amount_cents, nft_id, invested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            campaign_id as i64,
            investor,
            amount_cents as i64,
            nft_id,
            invested_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// List a campaign's investments in insertion order.
///
/// The order matters: investor-share allocation breaks remainder ties
/// by position, so it must be stable across runs.
pub fn investments(conn: &Connection, campaign_id: CampaignId) -> Result<Vec<Investment>> {
    let mut stmt = conn.prepare(
        "SELECT id, campaign_id, investor, amount_cents, nft_id, invested_at
         FROM investments WHERE campaign_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([campaign_id as i64], |row| {
            Ok(Investment {
                id: row.get::<_, i64>(0)? as u64,
                campaign_id: row.get::<_, i64>(1)? as u64,
                investor: row.get(2)?,
                amount_cents: row.get::<_, i64>(3)? as u64,
                nft_id: row.get(4)?,
                invested_at: row.get::<_, i64>(5)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Total contributed to a campaign, in cents.
pub fn total_raised(conn: &Connection, campaign_id: CampaignId) -> Result<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM investments WHERE campaign_id = ?1",
        [campaign_id as i64],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

/// A pending split-change row.
#[derive(Debug, Clone)]
pub struct PendingSplitChange {
    pub campaign_id: CampaignId,
    pub creator_bps: u16,
    pub platform_bps: u16,
    pub investor_bps: u16,
    pub proposed_at: u64,
    pub effective_at: u64,
}

/// Record a proposed split change. Replaces any earlier proposal for the
/// same campaign.
pub fn upsert_pending_split(conn: &Connection, change: &PendingSplitChange) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO pending_split_changes
             (campaign_id, creator_bps, platform_bps, investor_bps, proposed_at, effective_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            change.campaign_id as i64,
            change.creator_bps as i64,
            change.platform_bps as i64,
            change.investor_bps as i64,
            change.proposed_at as i64,
            change.effective_at as i64,
        ],
    )?;
    Ok(())
}

/// Get the pending split change for a campaign, if any.
pub fn pending_split(
    conn: &Connection,
    campaign_id: CampaignId,
) -> Result<Option<PendingSplitChange>> {
    let result = conn.query_row(
        "SELECT campaign_id, creator_bps, platform_bps, investor_bps, proposed_at, effective_at
         FROM pending_split_changes WHERE campaign_id = ?1",
        [campaign_id as i64],
        |row| {
            Ok(PendingSplitChange {
                campaign_id: row.get::<_, i64>(0)? as u64,
                creator_bps: row.get::<_, i64>(1)? as u16,
                platform_bps: row.get::<_, i64>(2)? as u16,
                investor_bps: row.get::<_, i64>(3)? as u16,
                proposed_at: row.get::<_, i64>(4)? as u64,
                effective_at: row.get::<_, i64>(5)? as u64,
            })
        },
    );
    match result {
        Ok(change) => Ok(Some(change)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::Sqlite(e)),
    }
}

/// Delete a pending split change (after applying it).
pub fn delete_pending_split(conn: &Connection, campaign_id: CampaignId) -> Result<()> {
    conn.execute(
        "DELETE FROM pending_split_changes WHERE campaign_id = ?1",
        [campaign_id as i64],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn insert_test_campaign(conn: &Connection) -> CampaignId {
        insert(
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
        .expect("insert campaign")
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let id = insert_test_campaign(&conn);
        let campaign = get(&conn, id).expect("get");
        assert_eq!(campaign.title, "Test Film");
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.creator_bps, 5000);
    }

    #[test]
    fn test_get_missing() {
        let conn = test_db();
        assert!(matches!(get(&conn, 99), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_mark_funded() {
        let conn = test_db();
        let id = insert_test_campaign(&conn);
        mark_funded(&conn, id).expect("fund");
        assert_eq!(get(&conn, id).expect("get").status, CampaignStatus::Funded);

        // Second funding attempt fails the status guard
        assert!(mark_funded(&conn, id).is_err());
    }

    #[test]
    fn test_investments_order_stable() {
        let conn = test_db();
        let id = insert_test_campaign(&conn);
        insert_investment(&conn, id, "alice", 6000, Some("nft-1"), 100).expect("insert");
        insert_investment(&conn, id, "bob", 3000, None, 200).expect("insert");
        insert_investment(&conn, id, "carol", 1000, None, 300).expect("insert");

        let stakes = investments(&conn, id).expect("list");
        assert_eq!(stakes.len(), 3);
        assert_eq!(stakes[0].investor, "alice");
        assert_eq!(stakes[0].nft_id.as_deref(), Some("nft-1"));
        assert_eq!(stakes[2].investor, "carol");
        assert_eq!(total_raised(&conn, id).expect("total"), 10_000);
    }

    #[test]
    fn test_pending_split_round_trip() {
        let conn = test_db();
        let id = insert_test_campaign(&conn);

        assert!(pending_split(&conn, id).expect("query").is_none());

        upsert_pending_split(
            &conn,
            &PendingSplitChange {
                campaign_id: id,
                creator_bps: 4000,
                platform_bps: 1000,
                investor_bps: 5000,
                proposed_at: 1_700_000_000,
                effective_at: 1_702_592_000,
            },
        )
        .expect("upsert");

        let change = pending_split(&conn, id).expect("query").expect("present");
        assert_eq!(change.investor_bps, 5000);

        delete_pending_split(&conn, id).expect("delete");
        assert!(pending_split(&conn, id).expect("query").is_none());
    }

    #[test]
    fn test_update_split() {
        let conn = test_db();
        let id = insert_test_campaign(&conn);
        update_split(&conn, id, 4000, 1000, 5000).expect("update");
        let campaign = get(&conn, id).expect("get");
        assert_eq!(campaign.investor_bps, 5000);
    }
}
