//! Deterministic in-process contract for v1.
//!
//! In the initial version no real chain is wired up. The stub contract
//! derives transaction hashes from the record contents and gains one
//! confirmation per poll, which lets the rest of the pipeline (and the
//! tests) exercise the full submit/confirm path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use reelfund_types::TxHash;

use crate::contract::{DistributionRecord, RoyaltyContract};
use crate::{ChainError, Result};

/// A stub royalty contract.
pub struct StubContract {
    /// Confirmation depth per submitted transaction.
    submitted: Mutex<HashMap<TxHash, u32>>,
    /// When set, submissions fail (for testing the retry path).
    fail_submissions: AtomicBool,
}

impl StubContract {
    pub fn new() -> Self {
        Self {
            submitted: Mutex::new(HashMap::new()),
            fail_submissions: AtomicBool::new(false),
        }
    }

    /// Make subsequent submissions fail (testing only).
    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Number of distinct transactions submitted so far.
    pub fn submitted_count(&self) -> usize {
        match self.submitted.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Derive the deterministic transaction hash for a record.
    pub fn tx_hash_for(record: &DistributionRecord) -> TxHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&record.distribution_id.to_le_bytes());
        hasher.update(&record.campaign_id.to_le_bytes());
        hasher.update(&record.entry_id.to_le_bytes());
        hasher.update(&record.gross_cents.to_le_bytes());
        hasher.update(&record.creator_cents.to_le_bytes());
        hasher.update(&record.platform_cents.to_le_bytes());
        hasher.update(&record.investor_cents.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl Default for StubContract {
    fn default() -> Self {
        Self::new()
    }
}

impl RoyaltyContract for StubContract {
    fn record_distribution(&self, record: &DistributionRecord) -> Result<TxHash> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ChainError::Submission(
                "stub contract: submissions disabled".to_string(),
            ));
        }

        let tx_hash = Self::tx_hash_for(record);
        let mut submitted = match self.submitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Resubmission of the same record is a no-op with the same hash
        submitted.entry(tx_hash).or_insert(0);

        tracing::debug!(
            distribution_id = record.distribution_id,
            tx_hash = %hex::encode(tx_hash),
            "distribution recorded on stub contract"
        );
        Ok(tx_hash)
    }

    fn confirmations(&self, tx_hash: &TxHash) -> Result<u32> {
        let mut submitted = match self.submitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match submitted.get_mut(tx_hash) {
            Some(depth) => {
                // One confirmation per poll
                *depth += 1;
                Ok(*depth)
            }
            None => Err(ChainError::UnknownTx(hex::encode(tx_hash))),
        }
    }
}
