//! # プロバイダ登録
//!
//! `ProviderRegistry` コントラクトに署名者をプロバイダとして登録し、
//! モデル識別子を公開鍵ハッシュと紐付ける。運用コマンドから一度だけ実行する。

use std::time::Duration;

use alloy::primitives::{Address, FixedBytes};
use alloy::sol;

use crate::evm::{parse_address, wallet_provider, with_timeout};
use crate::{classify_ledger_error, LedgerError};

sol! {
    #[sol(rpc)]
    interface IProviderRegistry {
        function registerProvider() external;
        function registerModel(string modelId, bytes32 pubKeyHash) external;
    }
}

/// プロバイダ登録の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// 登録した署名者アドレス（EIP-55）
    pub provider: String,
    /// `keccak256(address)`（20バイトのpacked表現）
    pub pub_key_hash: String,
    /// `registerProvider` のトランザクション。既に登録済みで失敗した場合は `None`
    pub provider_tx: Option<String>,
    /// `registerModel` のトランザクション
    pub model_tx: String,
}

/// モデル登録に使う公開鍵ハッシュを計算する。
pub fn pub_key_hash(address: &Address) -> [u8; 32] {
    genproof_crypto::keccak256(address.as_slice())
}

/// 署名者をプロバイダとして登録し、モデルを紐付ける。
///
/// `registerProvider` の失敗（登録済みなど）は警告に留め、モデル登録は続行する。
pub async fn enroll_provider(
    rpc_url: &str,
    private_key: &str,
    registry_address: &str,
    model_id: &str,
    timeout: Duration,
) -> Result<Enrollment, LedgerError> {
    let registry = parse_address(registry_address)?;
    let (provider, signer) = wallet_provider(rpc_url, private_key)?;
    let contract = IProviderRegistry::new(registry, &provider);

    let register_provider = contract.registerProvider().from(signer);
    let provider_tx = with_timeout(timeout, async {
        let gas = register_provider
            .estimate_gas()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        let register_provider = register_provider.gas(gas);
        let pending = register_provider
            .send()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        Ok(genproof_crypto::format_hex32(&receipt.transaction_hash.0))
    })
    .await;

    let provider_tx = match provider_tx {
        Ok(tx) => {
            tracing::info!(provider = %signer, tx_hash = %tx, "プロバイダを登録しました");
            Some(tx)
        }
        Err(LedgerError::Rejected(reason)) => {
            tracing::warn!(provider = %signer, reason = ?reason, "プロバイダ登録をスキップしました（登録済みの可能性）");
            None
        }
        Err(e) => return Err(e),
    };

    let hash = pub_key_hash(&signer);
    let register_model = contract
        .registerModel(model_id.to_string(), FixedBytes::from(hash))
        .from(signer);
    let model_tx = with_timeout(timeout, async {
        let gas = register_model
            .estimate_gas()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        let register_model = register_model.gas(gas);
        let pending = register_model
            .send()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))?;
        Ok(genproof_crypto::format_hex32(&receipt.transaction_hash.0))
    })
    .await?;

    tracing::info!(model_id = %model_id, tx_hash = %model_tx, "モデルを登録しました");

    Ok(Enrollment {
        provider: signer.to_checksum(None),
        pub_key_hash: genproof_crypto::format_hex32(&hash),
        provider_tx,
        model_tx,
    })
}
