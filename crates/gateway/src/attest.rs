//! # Attestationの登録・照会
//!
//! 画像バイト列を生バイトモードでコミットし、台帳に書き込む（または照会する）。
//! 登録と照会は必ず同じモードを使う。

use genproof_core::{commit, detect_media_type, Commitment, CommitMode};
use genproof_types::LedgerRecord;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// 登録と照会で共有するコミットメントモード
pub const GATEWAY_COMMIT_MODE: CommitMode = CommitMode::Raw;

/// 登録結果
#[derive(Debug, Clone)]
pub struct RegisteredImage {
    pub prompt: String,
    pub image: Vec<u8>,
    pub media_type: &'static str,
    pub commitment: Commitment,
    pub tx_hash: String,
    pub attestation_url: String,
    pub model_id: String,
}

/// 照会結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// 台帳に記録がある
    Registered {
        commitment: Commitment,
        record: LedgerRecord,
    },
    /// 記録がない（エラーではない）
    Unregistered { commitment: Commitment },
}

impl GatewayState {
    /// プロンプトから画像を生成し、コミットメントを台帳に登録する。
    ///
    /// 空白のみのプロンプトは拒否するが、受理したプロンプトは加工せずに渡す。
    pub async fn register(&self, prompt: Option<&str>) -> Result<RegisteredImage, GatewayError> {
        let prompt = prompt.unwrap_or_default();
        if prompt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("Prompt is required".to_string()));
        }

        let generated = self.generator.generate(prompt).await?;
        tracing::info!(
            generator = self.generator.name(),
            strategy = generated.strategy,
            size = generated.bytes.len(),
            "画像を生成しました"
        );

        let commitment = commit(&generated.bytes, GATEWAY_COMMIT_MODE)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let receipt = self
            .ledger
            .register_attestation(&commitment, &self.model_id)
            .await?;
        tracing::info!(image_hash = %commitment, tx_hash = %receipt.tx_hash, "Attestationを登録しました");

        Ok(RegisteredImage {
            prompt: prompt.to_string(),
            media_type: detect_media_type(&generated.bytes),
            image: generated.bytes,
            commitment,
            attestation_url: format!("{}/tx/{}", self.explorer_url, receipt.tx_hash),
            tx_hash: receipt.tx_hash,
            model_id: self.model_id.clone(),
        })
    }

    /// アップロードされた画像のコミットメントを台帳で照会する。
    pub async fn verify(&self, image: &[u8]) -> Result<VerifyOutcome, GatewayError> {
        if image.is_empty() {
            return Err(GatewayError::InvalidRequest("No image file uploaded.".to_string()));
        }
        if image.len() > self.max_upload_bytes {
            return Err(GatewayError::PayloadTooLarge(format!(
                "{} bytes (上限 {} bytes)",
                image.len(),
                self.max_upload_bytes
            )));
        }

        let commitment = commit(image, GATEWAY_COMMIT_MODE)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        match self.ledger.lookup(&commitment).await? {
            Some(record) => {
                tracing::info!(image_hash = %commitment, provider = %record.provider, "登録済みの画像です");
                Ok(VerifyOutcome::Registered { commitment, record })
            }
            None => {
                tracing::info!(image_hash = %commitment, "未登録の画像です");
                Ok(VerifyOutcome::Unregistered { commitment })
            }
        }
    }
}
