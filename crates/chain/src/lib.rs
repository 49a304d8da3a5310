//! # genproof 台帳クライアント
//!
//! Attestationレジストリ（外部スマートコントラクト）への書き込みと照会を抽象化する。
//! 台帳のロジック自体は外部にあり、ここではインターフェースとして扱う。
//!
//! 現在の実装:
//! - `evm`: alloyによるEVMコントラクト呼び出し（本番用）
//! - `memory`: メモリ内の先着一件台帳（テスト・`MOCK_MODE`用）
//! - `registry`: ProviderRegistryへのプロバイダ・モデル登録（運用コマンド用）

pub mod evm;
pub mod memory;
pub mod registry;

pub use evm::{EvmLedger, EvmLedgerConfig, EvmReader};
pub use memory::MemoryLedger;

use genproof_crypto::Commitment;
use genproof_types::LedgerRecord;

/// 台帳が書き込みを拒否した理由。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 同じコミットメントのAttestationが既に存在する
    AlreadyAttested,
    /// 呼び出し元が認可されたプロバイダではない
    UnauthorizedProvider,
    /// その他のrevert
    Reverted(String),
}

/// 台帳クライアントのエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// 台帳がドメイン上の理由で書き込みを拒否した
    #[error("台帳が書き込みを拒否しました: {0:?}")]
    Rejected(RejectReason),
    /// RPC通信に失敗（呼び出し側で再試行すべき）
    #[error("台帳に接続できません: {0}")]
    Unavailable(String),
    /// 送信または承認待ちがタイムアウト
    #[error("台帳の応答がタイムアウトしました")]
    Timeout,
    /// 設定値が不正
    #[error("台帳クライアントの設定が不正です: {0}")]
    Config(String),
}

/// 承認済みトランザクションの参照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// トランザクションハッシュ（`0x` + 64 hex）
    pub tx_hash: String,
    /// 取り込まれたブロック番号
    pub block_number: Option<u64>,
}

/// Attestation台帳のトレイト。
///
/// 実装は複数リクエストから同時に呼ばれても安全でなければならない。
/// 接続は構築時に一度だけ確立し、呼び出しごとに張り直さない。
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// コミットメントとモデル識別子を台帳に書き込み、承認まで待つ。
    async fn register_attestation(
        &self,
        commitment: &Commitment,
        model_id: &str,
    ) -> Result<TxReceipt, LedgerError>;

    /// コミットメントの記録を照会する。記録がなければ `Ok(None)`。
    async fn lookup(&self, commitment: &Commitment) -> Result<Option<LedgerRecord>, LedgerError>;

    /// 書き込みに使う署名者のアドレス（EIP-55）。
    fn provider_address(&self) -> Option<String>;
}

/// `AttestationAlreadyExists()` カスタムエラー
pub const ERROR_ALREADY_EXISTS: &str = "AttestationAlreadyExists()";
/// `NotRegisteredProvider()` カスタムエラー
pub const ERROR_NOT_REGISTERED: &str = "NotRegisteredProvider()";

/// Solidityエラーシグネチャの4バイトセレクタ（小文字hex、プレフィックスなし）。
pub fn error_selector(signature: &str) -> String {
    hex::encode(&genproof_crypto::keccak256(signature.as_bytes())[..4])
}

/// RPCエラーのテキストを分類する。
///
/// ABIを持たないノードはカスタムエラー名ではなくrevertデータ（セレクタ）を返すため、
/// エラー名とセレクタの両方で判定する。
pub fn classify_ledger_error(message: &str) -> LedgerError {
    let lower = message.to_ascii_lowercase();

    let already_exists = lower.contains("attestationalreadyexists")
        || lower.contains("already exists")
        || lower.contains(&error_selector(ERROR_ALREADY_EXISTS));
    if already_exists {
        return LedgerError::Rejected(RejectReason::AlreadyAttested);
    }

    let unauthorized = lower.contains("notregisteredprovider")
        || lower.contains("not an authorized provider")
        || lower.contains(&error_selector(ERROR_NOT_REGISTERED));
    if unauthorized {
        return LedgerError::Rejected(RejectReason::UnauthorizedProvider);
    }

    if lower.contains("revert") {
        return LedgerError::Rejected(RejectReason::Reverted(message.to_string()));
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return LedgerError::Timeout;
    }

    LedgerError::Unavailable(message.to_string())
}
