//! # メモリ内台帳
//!
//! テストと `MOCK_MODE` 用。コントラクトと同じく先着一件で記録し、
//! 認可されていない署名者からの書き込みは拒否する。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use genproof_crypto::Commitment;
use genproof_types::LedgerRecord;

use crate::{Ledger, LedgerError, RejectReason, TxReceipt};

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// メモリ内の先着一件台帳
pub struct MemoryLedger {
    signer: String,
    authorized: RwLock<HashSet<String>>,
    records: RwLock<HashMap<Commitment, LedgerRecord>>,
    clock: Clock,
    block: AtomicU64,
}

impl MemoryLedger {
    /// 署名者を認可済みとして台帳を作成する。
    pub fn new(signer: impl Into<String>) -> Self {
        let ledger = Self::unauthorized(signer);
        let signer = ledger.signer.clone();
        ledger.authorize(&signer);
        ledger
    }

    /// 署名者を認可しない台帳を作成する。
    pub fn unauthorized(signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            authorized: RwLock::new(HashSet::new()),
            records: RwLock::new(HashMap::new()),
            clock: Box::new(unix_now),
            block: AtomicU64::new(0),
        }
    }

    /// 発行時刻の時計を差し替える。
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// プロバイダを認可する。
    pub fn authorize(&self, address: &str) {
        if let Ok(mut set) = self.authorized.write() {
            set.insert(address.to_ascii_lowercase());
        }
    }

    /// 記録件数
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_authorized(&self) -> bool {
        self.authorized
            .read()
            .map(|set| set.contains(&self.signer.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn lock_poisoned() -> LedgerError {
    LedgerError::Unavailable("メモリ台帳のロックが壊れています".to_string())
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register_attestation(
        &self,
        commitment: &Commitment,
        model_id: &str,
    ) -> Result<TxReceipt, LedgerError> {
        if !self.is_authorized() {
            return Err(LedgerError::Rejected(RejectReason::UnauthorizedProvider));
        }

        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        if records.contains_key(commitment) {
            return Err(LedgerError::Rejected(RejectReason::AlreadyAttested));
        }

        records.insert(
            *commitment,
            LedgerRecord {
                provider: self.signer.clone(),
                model_id: model_id.to_string(),
                issued_at: (self.clock)(),
            },
        );

        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;

        // 疑似トランザクションハッシュ: keccak256(commitment || block)
        let mut preimage = commitment.as_bytes().to_vec();
        preimage.extend_from_slice(&block.to_be_bytes());
        let tx_hash = genproof_crypto::format_hex32(&genproof_crypto::keccak256(&preimage));

        Ok(TxReceipt {
            tx_hash,
            block_number: Some(block),
        })
    }

    async fn lookup(&self, commitment: &Commitment) -> Result<Option<LedgerRecord>, LedgerError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(records.get(commitment).cloned())
    }

    fn provider_address(&self) -> Option<String> {
        Some(self.signer.clone())
    }
}
