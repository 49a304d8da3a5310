//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 必須の値が欠けている場合は起動時に失敗させ、リクエスト単位のエラーにはしない。

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use genproof_chain::{EvmLedgerConfig, Ledger, MemoryLedger};
use genproof_types::MAX_UPLOAD_BYTES;

use crate::generator::gemini::GeminiGenerator;
use crate::generator::mock::MockGenerator;
use crate::generator::openrouter::OpenRouterGenerator;
use crate::generator::ImageGenerator;

/// 既定の待ち受けポート
pub const DEFAULT_PORT: u16 = 3000;
/// 既定のブロックエクスプローラ
pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";
/// 外部呼び出しの既定タイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// 画像生成AIの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProviderKind {
    OpenRouter,
    Gemini,
}

impl AiProviderKind {
    /// APIキーを読む環境変数
    pub fn api_key_var(self) -> &'static str {
        match self {
            AiProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            AiProviderKind::Gemini => "GOOGLE_API_KEY",
        }
    }
}

impl FromStr for AiProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(AiProviderKind::OpenRouter),
            "gemini" | "google" => Ok(AiProviderKind::Gemini),
            other => anyhow::bail!("AI_PROVIDERが不正です: {other}（openrouter または gemini）"),
        }
    }
}

/// 画像生成AIの設定
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProviderKind,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Gatewayの設定
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 待ち受けポート
    pub port: u16,
    /// 台帳に記録するモデル識別子
    pub model_id: String,
    /// トランザクション参照URLのベース
    pub explorer_url: String,
    /// 外部AI呼び出しのタイムアウト
    pub ai_timeout: Duration,
    /// モックモード（メモリ台帳で起動）
    pub mock_mode: bool,
    /// 画像生成AI。モックモードでキー未設定なら `None`
    pub ai: Option<AiConfig>,
    /// EVM台帳。モックモードでは `None`
    pub ledger: Option<EvmLedgerConfig>,
}

impl GatewayConfig {
    /// 環境変数から読み込む。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み込む。空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            get(name).with_context(|| format!("環境変数 {name} が設定されていません"))
        };
        let secs = |name: &str| -> anyhow::Result<Duration> {
            match get(name) {
                Some(v) => {
                    let n: u64 = v
                        .trim()
                        .parse()
                        .with_context(|| format!("{name} は秒数（整数）である必要があります: {v}"))?;
                    Ok(Duration::from_secs(n))
                }
                None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            }
        };

        let mock_mode = get("MOCK_MODE").map(|v| v == "true").unwrap_or(false);
        let model_id = required("MODEL_ID")?;

        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORTが不正です: {v}"))?,
            None => DEFAULT_PORT,
        };

        let explorer_url = get("EXPLORER_URL")
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let provider: AiProviderKind = get("AI_PROVIDER")
            .as_deref()
            .unwrap_or("openrouter")
            .parse()?;
        let api_key = if mock_mode {
            get(provider.api_key_var())
        } else {
            Some(required(provider.api_key_var())?)
        };
        let ai = api_key.map(|api_key| AiConfig {
            provider,
            api_key,
            model: get("AI_MODEL"),
            base_url: get("AI_BASE_URL"),
        });

        let ledger = if mock_mode {
            None
        } else {
            Some(EvmLedgerConfig {
                rpc_url: required("RPC_URL")?,
                private_key: required("PRIVATE_KEY")?,
                contract_address: required("CONTRACT_ADDRESS")?,
                timeout: secs("LEDGER_TIMEOUT_SECS")?,
            })
        };

        Ok(Self {
            port,
            model_id,
            explorer_url,
            ai_timeout: secs("AI_TIMEOUT_SECS")?,
            mock_mode,
            ai,
            ledger,
        })
    }
}

/// Gatewayの共有状態。
///
/// 生成AIクライアントと台帳クライアントは起動時に一度だけ構築し、
/// 全リクエストで共有する。
pub struct GatewayState {
    /// 画像生成AI
    pub generator: Arc<dyn ImageGenerator>,
    /// Attestation台帳
    pub ledger: Arc<dyn Ledger>,
    /// 台帳に記録するモデル識別子
    pub model_id: String,
    /// トランザクション参照URLのベース
    pub explorer_url: String,
    /// アップロード最大サイズ（バイト）
    pub max_upload_bytes: usize,
}

impl GatewayState {
    /// 設定からクライアントを構築する。
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.ai_timeout)
            .build()
            .context("HTTPクライアントの構築に失敗")?;

        let generator: Arc<dyn ImageGenerator> = match &config.ai {
            Some(ai) => match ai.provider {
                AiProviderKind::OpenRouter => Arc::new(OpenRouterGenerator::new(
                    http_client,
                    ai.api_key.clone(),
                    ai.model.clone(),
                    ai.base_url.clone(),
                )),
                AiProviderKind::Gemini => Arc::new(GeminiGenerator::new(
                    http_client,
                    ai.api_key.clone(),
                    ai.model.clone(),
                    ai.base_url.clone(),
                )),
            },
            None => {
                tracing::warn!("AIプロバイダのAPIキーが未設定です。MockGeneratorを使用します（開発環境用）");
                Arc::new(MockGenerator)
            }
        };

        let ledger: Arc<dyn Ledger> = match &config.ledger {
            Some(evm) => Arc::new(genproof_chain::evm::connect(evm)?),
            None => {
                let signer = genproof_crypto::PrivateKeySigner::random();
                let address = genproof_crypto::signer_address(&signer);
                tracing::warn!(provider = %address, "MemoryLedgerで起動します（開発環境用）");
                Arc::new(MemoryLedger::new(address))
            }
        };

        tracing::info!(
            generator = generator.name(),
            provider = ?ledger.provider_address(),
            model_id = %config.model_id,
            "Gatewayの状態を初期化しました"
        );

        Ok(Self {
            generator,
            ledger,
            model_id: config.model_id.clone(),
            explorer_url: config.explorer_url.clone(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }
}
