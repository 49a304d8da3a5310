//! # Attestationの正規化
//!
//! 署名対象は固定キー順・空白なし・整数のみのJSON。
//! 他実装でも同じバイト列を再現できることが前提なので、この関数は純粋に保つ。

use genproof_types::Attestation;

use crate::CoreError;

/// Attestationを正規化JSON（UTF-8バイト列）に変換する。
///
/// キー順: `provider, modelId, issuedAt, imageCommitment, nullifier, schemaVersion`
pub fn canonical_attestation_json(attestation: &Attestation) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec(attestation).map_err(|e| CoreError::Canonicalize(e.to_string()))
}

/// 正規化JSONのKeccak-256ダイジェストを計算する。
pub fn attestation_digest(attestation: &Attestation) -> Result<[u8; 32], CoreError> {
    let canonical = canonical_attestation_json(attestation)?;
    Ok(genproof_crypto::keccak256(&canonical))
}
