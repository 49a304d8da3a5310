//! # genproof Core
//!
//! 画像コミットメントの計算と、オフライン来歴アーティファクトの構築を実装する。
//!
//! ## 処理フロー
//! 1. 画像バイト列からコミットメントを計算する（生バイトモード / ピクセルモード）
//! 2. Attestationを正規化JSONにし、Keccak-256ダイジェストを計算する
//! 3. プロバイダ秘密鍵でダイジェストに署名し、アーティファクトにまとめる

mod canonical;
mod commitment;
mod media;
mod provenance;

pub use canonical::{attestation_digest, canonical_attestation_json};
pub use commitment::{commit, CommitMode};
pub use media::detect_media_type;
pub use provenance::{build_provenance, check_provenance, ArtifactCheck};

pub use genproof_crypto::Commitment;

/// Coreモジュールのエラー型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// ピクセルモードで画像をデコードできない
    #[error("画像のデコードに失敗しました: {0}")]
    Decode(String),
    /// Attestationの正規化に失敗
    #[error("Attestationの正規化に失敗しました: {0}")]
    Canonicalize(String),
    /// 暗号処理エラー
    #[error(transparent)]
    Crypto(#[from] genproof_crypto::CryptoError),
}
