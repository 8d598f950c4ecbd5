//! SQL schema definitions.

/// Complete schema for the Reelfund v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Campaigns & Investments
-- ============================================================

CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    creator TEXT NOT NULL,
    currency TEXT NOT NULL,
    goal_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    creator_bps INTEGER NOT NULL DEFAULT 5000,
    platform_bps INTEGER NOT NULL DEFAULT 1000,
    investor_bps INTEGER NOT NULL DEFAULT 4000,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS investments (
    id INTEGER PRIMARY KEY,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
    investor TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    nft_id TEXT,
    invested_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_investments_campaign ON investments(campaign_id);
CREATE INDEX IF NOT EXISTS idx_investments_investor ON investments(investor);

-- ============================================================
-- Revenue Ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS revenue_entries (
    id INTEGER PRIMARY KEY,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
    source TEXT NOT NULL,
    external_ref TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    currency TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    failure_reason TEXT,
    revenue_date INTEGER NOT NULL,
    ingested_at INTEGER NOT NULL,
    UNIQUE (source, external_ref)
);

CREATE INDEX IF NOT EXISTS idx_entries_campaign ON revenue_entries(campaign_id);
CREATE INDEX IF NOT EXISTS idx_entries_pending ON revenue_entries(status) WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_entries_verified ON revenue_entries(status) WHERE status = 'verified';

-- ============================================================
-- Distributions & Investor Royalties
-- ============================================================

CREATE TABLE IF NOT EXISTS royalty_distributions (
    id INTEGER PRIMARY KEY,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
    entry_id INTEGER NOT NULL UNIQUE REFERENCES revenue_entries(id),
    gross_cents INTEGER NOT NULL,
    creator_cents INTEGER NOT NULL,
    platform_cents INTEGER NOT NULL,
    investor_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    tx_hash BLOB,
    distributed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_distributions_campaign ON royalty_distributions(campaign_id);
CREATE INDEX IF NOT EXISTS idx_distributions_unmirrored
    ON royalty_distributions(status) WHERE tx_hash IS NULL;

CREATE TABLE IF NOT EXISTS investor_royalties (
    id INTEGER PRIMARY KEY,
    distribution_id INTEGER NOT NULL REFERENCES royalty_distributions(id) ON DELETE CASCADE,
    investor TEXT NOT NULL,
    nft_id TEXT,
    contribution_cents INTEGER NOT NULL,
    share_bps INTEGER NOT NULL,
    amount_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    claimable_at INTEGER,
    claimed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_royalties_distribution ON investor_royalties(distribution_id);
CREATE INDEX IF NOT EXISTS idx_royalties_investor ON investor_royalties(investor);
CREATE INDEX IF NOT EXISTS idx_royalties_claimable
    ON investor_royalties(status) WHERE status = 'claimable';

-- ============================================================
-- Split Timelocks & Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS pending_split_changes (
    campaign_id INTEGER PRIMARY KEY REFERENCES campaigns(id) ON DELETE CASCADE,
    creator_bps INTEGER NOT NULL,
    platform_bps INTEGER NOT NULL,
    investor_bps INTEGER NOT NULL,
    proposed_at INTEGER NOT NULL,
    effective_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
