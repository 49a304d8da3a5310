//! # オフライン来歴アーティファクト
//!
//! 台帳に触れずに、ピクセルモードのコミットメント・ナリファイア・署名をまとめた
//! 持ち運び可能なアーティファクトを構築する。
//! 署名は将来ゼロ知識証明で置き換える前提の暫定的な信頼モデル。

use genproof_crypto::PrivateKeySigner;
use genproof_types::{Attestation, ProvenanceArtifact, ATTESTATION_SCHEMA_VERSION};

use crate::canonical::attestation_digest;
use crate::commitment::{commit, CommitMode};
use crate::CoreError;

/// アーティファクトを構築する。
///
/// `nonce` は呼び出し側で `genproof_crypto::random_nonce()` 等から生成する。
/// ナリファイアは `keccak256(nonce)`。
pub fn build_provenance(
    signer: &PrivateKeySigner,
    image_bytes: &[u8],
    model_id: &str,
    issued_at: u64,
    nonce: &[u8; 32],
) -> Result<ProvenanceArtifact, CoreError> {
    let image_commitment = commit(image_bytes, CommitMode::Pixel)?;
    let nullifier = genproof_crypto::nullifier_from_nonce(nonce);

    let attestation = Attestation {
        provider: genproof_crypto::signer_address(signer),
        model_id: model_id.to_string(),
        issued_at,
        image_commitment: image_commitment.to_string(),
        nullifier: genproof_crypto::format_hex32(&nullifier),
        schema_version: ATTESTATION_SCHEMA_VERSION,
    };

    let digest = attestation_digest(&attestation)?;
    let signature = genproof_crypto::sign_digest(signer, &digest)?;

    Ok(ProvenanceArtifact {
        attestation,
        signature,
    })
}

/// アーティファクトの検証結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCheck {
    /// 正規化ダイジェスト（`0x` + 64 hex）
    pub digest: String,
    /// 署名から復元したアドレス
    pub recovered_signer: String,
    /// 復元したアドレスが `attestation.provider` と一致するか
    pub signature_valid: bool,
    /// 画像が与えられた場合、ピクセルコミットメントが一致するか
    pub commitment_matches: Option<bool>,
}

/// アーティファクトの署名を検証し、画像が与えられればコミットメントも照合する。
pub fn check_provenance(
    artifact: &ProvenanceArtifact,
    image_bytes: Option<&[u8]>,
) -> Result<ArtifactCheck, CoreError> {
    let digest = attestation_digest(&artifact.attestation)?;
    let recovered_signer = genproof_crypto::recover_signer(&digest, &artifact.signature)?;
    let signature_valid = recovered_signer.eq_ignore_ascii_case(&artifact.attestation.provider);

    let commitment_matches = match image_bytes {
        Some(bytes) => {
            let actual = commit(bytes, CommitMode::Pixel)?;
            let declared: genproof_crypto::Commitment =
                artifact.attestation.image_commitment.parse()?;
            Some(actual == declared)
        }
        None => None,
    };

    Ok(ArtifactCheck {
        digest: genproof_crypto::format_hex32(&digest),
        recovered_signer,
        signature_valid,
        commitment_matches,
    })
}
