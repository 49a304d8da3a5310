//! # provenance / check-artifact
//!
//! 台帳に触れずに署名付きアーティファクトを生成・検証する。

use std::path::Path;

use anyhow::Context;
use genproof_core::{build_provenance, check_provenance};
use genproof_types::ProvenanceArtifact;

fn unix_now() -> anyhow::Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("システム時刻がUNIXエポックより前です")?
        .as_secs())
}

/// 画像からアーティファクトを生成し、`out` に書き出す。
pub fn run(
    image: &Path,
    out: &Path,
    model_id: &str,
    private_key: &str,
) -> anyhow::Result<ProvenanceArtifact> {
    let signer = genproof_crypto::parse_signing_key(private_key)
        .context("PROVIDER_PRIVATE_KEYを解釈できません")?;

    let bytes = std::fs::read(image)
        .with_context(|| format!("画像を読み込めません: {}", image.display()))?;

    let nonce = genproof_crypto::random_nonce();
    let artifact = build_provenance(&signer, &bytes, model_id, unix_now()?, &nonce)?;

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("出力先ディレクトリを作成できません: {}", dir.display()))?;
    }
    std::fs::write(out, serde_json::to_vec_pretty(&artifact)?)
        .with_context(|| format!("アーティファクトを書き込めません: {}", out.display()))?;

    let att = &artifact.attestation;
    tracing::info!(
        provider = %att.provider,
        image_commitment = %att.image_commitment,
        issued_at = att.issued_at,
        nullifier = %att.nullifier,
        out = %out.display(),
        "来歴アーティファクトを生成しました"
    );

    Ok(artifact)
}

/// アーティファクトを検証する。署名またはコミットメントが一致しなければエラー。
pub fn check(artifact_path: &Path, image: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read(artifact_path)
        .with_context(|| format!("アーティファクトを読み込めません: {}", artifact_path.display()))?;
    let artifact: ProvenanceArtifact =
        serde_json::from_slice(&raw).context("アーティファクトのJSONが不正です")?;

    let image_bytes = image
        .map(|p| std::fs::read(p).with_context(|| format!("画像を読み込めません: {}", p.display())))
        .transpose()?;

    let result = check_provenance(&artifact, image_bytes.as_deref())?;

    if !result.signature_valid {
        anyhow::bail!(
            "署名者が一致しません: 宣言 {} / 復元 {}",
            artifact.attestation.provider,
            result.recovered_signer
        );
    }
    if result.commitment_matches == Some(false) {
        anyhow::bail!("画像のコミットメントがアーティファクトと一致しません");
    }

    tracing::info!(provider = %result.recovered_signer, digest = %result.digest, "アーティファクトは有効です");

    Ok(serde_json::json!({
        "valid": true,
        "digest": result.digest,
        "recovered_signer": result.recovered_signer,
        "commitment_matches": result.commitment_matches,
    }))
}
