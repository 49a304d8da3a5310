//! # EVM台帳クライアント
//!
//! `ImageAttestationRegistry` コントラクトへの書き込み・照会をalloyで行う。
//! プロバイダ（RPC接続と署名ウォレット）は `connect` で一度だけ構築し、
//! 以降のリクエストで共有する。

use std::future::Future;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, FixedBytes};
use alloy::providers::fillers::{CachedNonceManager, ChainIdFiller, NonceFiller};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use genproof_crypto::Commitment;
use genproof_types::LedgerRecord;

use crate::{classify_ledger_error, Ledger, LedgerError, RejectReason, TxReceipt};

sol! {
    #[sol(rpc)]
    interface IImageAttestationRegistry {
        function registerAttestation(bytes32 imageCommitment, string modelId) external;
        function attestations(bytes32 imageCommitment) external view returns (address provider, string modelId, uint64 issuedAt);
    }
}

/// 書き込み・照会の既定タイムアウト
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(120);

/// EVM台帳の接続設定
#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    /// JSON-RPCエンドポイント
    pub rpc_url: String,
    /// 署名鍵（hex、`0x` 任意）
    pub private_key: String,
    /// レジストリコントラクトのアドレス
    pub contract_address: String,
    /// 送信から承認までの上限
    pub timeout: Duration,
}

/// EVM台帳クライアント
#[derive(Debug, Clone)]
pub struct EvmLedger<P> {
    provider: P,
    contract: Address,
    signer: Address,
    timeout: Duration,
}

/// 署名ウォレット付きのプロバイダを構築する。ネットワークアクセスは発生しない。
///
/// nonceはプロバイダ内でキャッシュして払い出すため、同じプロバイダを共有する
/// 並行送信が同じnonceを使うことはない。
pub(crate) fn wallet_provider(
    rpc_url: &str,
    private_key: &str,
) -> Result<(impl Provider<Http<Client>> + Clone + 'static, Address), LedgerError> {
    let signer = genproof_crypto::parse_signing_key(private_key)
        .map_err(|e| LedgerError::Config(e.to_string()))?;
    let address = signer.address();

    let url: Url = rpc_url
        .parse()
        .map_err(|e| LedgerError::Config(format!("RPC URLが不正です: {e}")))?;

    let provider = ProviderBuilder::new()
        .with_gas_estimation()
        .filler(NonceFiller::new(CachedNonceManager::default()))
        .filler(ChainIdFiller::default())
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    Ok((provider, address))
}

/// コントラクトアドレスを解釈する。
pub(crate) fn parse_address(value: &str) -> Result<Address, LedgerError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| LedgerError::Config(format!("コントラクトアドレスが不正です: {e}")))
}

/// 設定からEVM台帳クライアントを構築する。
pub fn connect(
    config: &EvmLedgerConfig,
) -> Result<EvmLedger<impl Provider<Http<Client>> + Clone + 'static>, LedgerError> {
    let contract = parse_address(&config.contract_address)?;
    let (provider, signer) = wallet_provider(&config.rpc_url, &config.private_key)?;

    tracing::info!(
        contract = %contract,
        signer = %signer,
        "EVM台帳クライアントを初期化しました"
    );

    Ok(EvmLedger {
        provider,
        contract,
        signer,
        timeout: config.timeout,
    })
}

/// 台帳呼び出しにタイムアウトを適用する。
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, LedgerError>>,
) -> Result<T, LedgerError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| LedgerError::Timeout)?
}

fn to_bytes32(commitment: &Commitment) -> FixedBytes<32> {
    FixedBytes::from(*commitment.as_bytes())
}

/// `attestations` を照会する。未登録のスロットはゼロアドレスで返る。
async fn read_attestation<P>(
    provider: &P,
    contract: Address,
    commitment: &Commitment,
    timeout: Duration,
) -> Result<Option<LedgerRecord>, LedgerError>
where
    P: Provider<Http<Client>>,
{
    let contract = IImageAttestationRegistry::new(contract, provider);
    let call = contract.attestations(to_bytes32(commitment));

    let result = with_timeout(timeout, async {
        call.call()
            .await
            .map_err(|e| classify_ledger_error(&e.to_string()))
    })
    .await?;

    if result.provider == Address::ZERO {
        return Ok(None);
    }

    Ok(Some(LedgerRecord {
        provider: result.provider.to_checksum(None),
        model_id: result.modelId,
        issued_at: result.issuedAt,
    }))
}

/// 署名鍵を持たない照会専用クライアント
#[derive(Debug, Clone)]
pub struct EvmReader<P> {
    provider: P,
    contract: Address,
    timeout: Duration,
}

/// 照会専用クライアントを構築する。ネットワークアクセスは発生しない。
pub fn connect_reader(
    rpc_url: &str,
    contract_address: &str,
    timeout: Duration,
) -> Result<EvmReader<impl Provider<Http<Client>> + Clone + 'static>, LedgerError> {
    let contract = parse_address(contract_address)?;
    let url: Url = rpc_url
        .parse()
        .map_err(|e| LedgerError::Config(format!("RPC URLが不正です: {e}")))?;

    Ok(EvmReader {
        provider: ProviderBuilder::new().on_http(url),
        contract,
        timeout,
    })
}

impl<P> EvmReader<P>
where
    P: Provider<Http<Client>>,
{
    /// コミットメントの登録内容を返す。未登録は `None`。
    pub async fn lookup(&self, commitment: &Commitment) -> Result<Option<LedgerRecord>, LedgerError> {
        read_attestation(&self.provider, self.contract, commitment, self.timeout).await
    }
}

#[async_trait]
impl<P> Ledger for EvmLedger<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    async fn register_attestation(
        &self,
        commitment: &Commitment,
        model_id: &str,
    ) -> Result<TxReceipt, LedgerError> {
        let contract = IImageAttestationRegistry::new(self.contract, &self.provider);
        let call = contract
            .registerAttestation(to_bytes32(commitment), model_id.to_string())
            .from(self.signer);

        let receipt = with_timeout(self.timeout, async {
            // revertするトランザクションはnonceを払い出す前にここで弾く
            let gas = call
                .estimate_gas()
                .await
                .map_err(|e| classify_ledger_error(&e.to_string()))?;
            let call = call.gas(gas);

            let pending = call
                .send()
                .await
                .map_err(|e| classify_ledger_error(&e.to_string()))?;

            tracing::info!(tx_hash = %pending.tx_hash(), commitment = %commitment, "トランザクションを送信しました");

            pending
                .get_receipt()
                .await
                .map_err(|e| classify_ledger_error(&e.to_string()))
        })
        .await?;

        let tx_hash = genproof_crypto::format_hex32(&receipt.transaction_hash.0);
        if !receipt.status() {
            return Err(LedgerError::Rejected(RejectReason::Reverted(format!(
                "トランザクションがrevertされました: {tx_hash}"
            ))));
        }

        tracing::info!(
            tx_hash = %tx_hash,
            block = receipt.block_number.unwrap_or(0),
            "Attestationを記録しました"
        );

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number,
        })
    }

    async fn lookup(&self, commitment: &Commitment) -> Result<Option<LedgerRecord>, LedgerError> {
        read_attestation(&self.provider, self.contract, commitment, self.timeout).await
    }

    fn provider_address(&self) -> Option<String> {
        Some(self.signer.to_checksum(None))
    }
}
