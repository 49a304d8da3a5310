//! # genproof 暗号処理
//!
//! コミットメント計算・リプレイ防止・オフライン署名に使う暗号プリミティブ。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | ハッシュ | Keccak-256 |
//! | ナリファイア | Keccak-256(32バイト乱数) |
//! | 署名 | secp256k1 ECDSA (EIP-191 personal message) |

use std::fmt;
use std::str::FromStr;

use alloy::primitives::PrimitiveSignature;
use alloy::signers::SignerSync;
use rand::RngCore;
use sha3::{Digest, Keccak256};

pub use alloy::signers::local::PrivateKeySigner;

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// hex文字列のデコードに失敗
    #[error("hexのデコードに失敗しました: {0}")]
    InvalidHex(String),
    /// バイト長が不正
    #[error("バイト長が不正です: 期待値 {expected}, 実際 {actual}")]
    InvalidLength {
        /// 期待したバイト長
        expected: usize,
        /// 実際のバイト長
        actual: usize,
    },
    /// 秘密鍵のパースに失敗
    #[error("秘密鍵が不正です: {0}")]
    InvalidKey(String),
    /// 署名に失敗
    #[error("署名に失敗しました: {0}")]
    SigningFailed(String),
    /// 署名から公開鍵を復元できない
    #[error("署名の検証に失敗しました: {0}")]
    SignatureVerifyError(String),
}

/// Keccak-256ハッシュ計算。
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// 32バイト値を「0x」プレフィックス付き小文字hex文字列に変換する。
pub fn format_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// 「0x」プレフィックスの有無を問わずhex文字列をバイト列に変換する。
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

// ---------------------------------------------------------------------------
// Commitment
// ---------------------------------------------------------------------------

/// 画像コンテンツの32バイト決定論的フィンガープリント。
///
/// 表示形式は `0x` + 64桁の小文字hex。台帳上の `bytes32` キーと1対1に対応する。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// 生の32バイトから構築する。
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// 任意のバイト列のKeccak-256をコミットメントとする。
    pub fn of(data: &[u8]) -> Self {
        Self(keccak256(data))
    }

    /// 内部バイト列を返す。
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex32(&self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({self})")
    }
}

impl FromStr for Commitment {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let actual = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidLength { expected: 32, actual })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// ナリファイア
// ---------------------------------------------------------------------------

/// OS乱数から32バイトのノンスを生成する。
pub fn random_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// ノンスからナリファイアを導出する: `keccak256(nonce)`。
pub fn nullifier_from_nonce(nonce: &[u8; 32]) -> [u8; 32] {
    keccak256(nonce)
}

// ---------------------------------------------------------------------------
// EIP-191署名
// ---------------------------------------------------------------------------

/// hex秘密鍵（`0x`の有無は問わない）から署名者を構築する。
pub fn parse_signing_key(key_hex: &str) -> Result<PrivateKeySigner, CryptoError> {
    let bytes = decode_hex(key_hex).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// 署名者のアドレスをEIP-55チェックサム付きhexで返す。
pub fn signer_address(signer: &PrivateKeySigner) -> String {
    signer.address().to_checksum(None)
}

/// 32バイトダイジェストにEIP-191 personal message署名を行う。
///
/// 署名対象はダイジェストの生バイト列（hex文字列ではない）。
/// 戻り値は `0x` + 130 hex（r || s || v）。
pub fn sign_digest(signer: &PrivateKeySigner, digest: &[u8; 32]) -> Result<String, CryptoError> {
    let raw = signer
        .sign_message_sync(digest)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?
        .as_bytes();
    let signature = PrimitiveSignature::from_raw_array(&raw)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(format!("0x{}", hex::encode(signature.as_bytes())))
}

/// EIP-191署名から署名者アドレス（EIP-55）を復元する。
pub fn recover_signer(digest: &[u8; 32], signature_hex: &str) -> Result<String, CryptoError> {
    let bytes = decode_hex(signature_hex)?;
    if bytes.len() != 65 {
        return Err(CryptoError::InvalidLength {
            expected: 65,
            actual: bytes.len(),
        });
    }
    let signature = PrimitiveSignature::try_from(bytes.as_slice())
        .map_err(|e| CryptoError::SignatureVerifyError(e.to_string()))?;
    let address = signature
        .recover_address_from_msg(digest)
        .map_err(|e| CryptoError::SignatureVerifyError(e.to_string()))?;
    Ok(address.to_checksum(None))
}
