//! # submit / lookup / register-provider
//!
//! 台帳コントラクトを直接操作する運用コマンド。

use std::path::Path;

use anyhow::Context;
use genproof_chain::registry::enroll_provider;
use genproof_chain::{EvmLedgerConfig, Ledger};
use genproof_core::{commit, Commitment, CommitMode};

use crate::{ChainArgs, RpcArgs};

fn ledger_config(contract: &str, chain: &ChainArgs) -> EvmLedgerConfig {
    EvmLedgerConfig {
        rpc_url: chain.rpc.rpc_url.clone(),
        private_key: chain.private_key.clone(),
        contract_address: contract.to_string(),
        timeout: chain.rpc.timeout(),
    }
}

fn commit_file(path: &Path, mode: CommitMode) -> anyhow::Result<Commitment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("画像を読み込めません: {}", path.display()))?;
    Ok(commit(&bytes, mode)?)
}

/// `--commitment` または `--image` から照会対象を決める。
pub fn resolve_commitment(
    commitment: Option<&str>,
    image: Option<&Path>,
    mode: CommitMode,
) -> anyhow::Result<Commitment> {
    match (commitment, image) {
        (Some(hex), _) => hex
            .parse::<Commitment>()
            .with_context(|| format!("コミットメントが不正です: {hex}")),
        (None, Some(path)) => commit_file(path, mode),
        (None, None) => anyhow::bail!("--commitment か --image のいずれかが必要です"),
    }
}

/// 画像のコミットメントを台帳に登録する。
pub async fn submit(
    image: &Path,
    model_id: &str,
    mode: CommitMode,
    contract: &str,
    chain: &ChainArgs,
) -> anyhow::Result<serde_json::Value> {
    let commitment = commit_file(image, mode)?;
    let ledger = genproof_chain::evm::connect(&ledger_config(contract, chain))?;

    tracing::info!(image_hash = %commitment, model_id, "Attestationを送信します");
    let receipt = ledger.register_attestation(&commitment, model_id).await?;

    Ok(serde_json::json!({
        "image_hash": commitment.to_string(),
        "tx_hash": receipt.tx_hash,
        "block_number": receipt.block_number,
        "provider": ledger.provider_address(),
    }))
}

/// コミットメントを照会する。署名鍵は不要で、未登録はエラーにしない。
pub async fn lookup(
    commitment: &Commitment,
    contract: &str,
    rpc: &RpcArgs,
) -> anyhow::Result<serde_json::Value> {
    let reader = genproof_chain::evm::connect_reader(&rpc.rpc_url, contract, rpc.timeout())?;

    match reader.lookup(commitment).await? {
        Some(record) => {
            tracing::info!(image_hash = %commitment, provider = %record.provider, "登録済みです");
            Ok(serde_json::json!({
                "is_verified": true,
                "image_hash": commitment.to_string(),
                "provider": record.provider,
                "model_id": record.model_id,
                "issued_at": record.issued_at,
            }))
        }
        None => {
            tracing::info!(image_hash = %commitment, "未登録です");
            Ok(serde_json::json!({
                "is_verified": false,
                "image_hash": commitment.to_string(),
            }))
        }
    }
}

/// 署名者をプロバイダとして登録し、モデルを紐付ける。
pub async fn register_provider(
    registry: &str,
    model_id: &str,
    chain: &ChainArgs,
) -> anyhow::Result<serde_json::Value> {
    let enrollment = enroll_provider(
        &chain.rpc.rpc_url,
        &chain.private_key,
        registry,
        model_id,
        chain.rpc.timeout(),
    )
    .await?;

    Ok(serde_json::json!({
        "provider": enrollment.provider,
        "model_id": model_id,
        "pub_key_hash": enrollment.pub_key_hash,
        "provider_tx": enrollment.provider_tx,
        "model_tx": enrollment.model_tx,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_commitment_from_hex() {
        let expected = Commitment::of(b"image");
        let c = resolve_commitment(Some(&expected.to_string()), None, CommitMode::Raw).unwrap();
        assert_eq!(c, expected);

        assert!(resolve_commitment(Some("0x1234"), None, CommitMode::Raw).is_err());
        assert!(resolve_commitment(None, None, CommitMode::Raw).is_err());
    }

    #[test]
    fn test_resolve_commitment_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.svg");
        std::fs::write(&path, b"<svg></svg>").unwrap();

        let c = resolve_commitment(None, Some(&path), CommitMode::Raw).unwrap();
        assert_eq!(c, Commitment::of(b"<svg></svg>"));

        // SVGはピクセルモードでは扱えない
        assert!(resolve_commitment(None, Some(&path), CommitMode::Pixel).is_err());
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.svg");
        std::fs::write(&path, b"<svg></svg>").unwrap();

        let chain = ChainArgs {
            rpc: RpcArgs {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                timeout_secs: 1,
            },
            private_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_string(),
        };
        let err = submit(&path, "m", CommitMode::Raw, "nope", &chain)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("コントラクトアドレス"), "{err:#}");
    }

    #[tokio::test]
    async fn test_lookup_rejects_bad_contract() {
        let rpc = RpcArgs {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 1,
        };
        let err = lookup(&Commitment::of(b"image"), "nope", &rpc)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("コントラクトアドレス"), "{err:#}");
    }
}
