//! # Gateway エラー型
//!
//! すべての失敗はリクエスト境界で `ErrorResponse` に変換される。
//! ハンドラ内でpanicさせない。

use axum::http::StatusCode;
use axum::Json;
use genproof_chain::{LedgerError, RejectReason};
use genproof_types::ErrorResponse;

use crate::generator::GenerationError;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    InvalidRequest(String),
    /// アップロードが上限を超えた
    #[error("ペイロードが大きすぎます: {0}")]
    PayloadTooLarge(String),
    /// 画像生成に失敗
    #[error("画像生成に失敗: {0}")]
    GenerationFailed(String),
    /// 画像をデコードできない
    #[error("画像のデコードに失敗: {0}")]
    Decode(String),
    /// 台帳が書き込みを拒否した
    #[error("台帳が書き込みを拒否しました: {0:?}")]
    LedgerRejected(RejectReason),
    /// 台帳に到達できない
    #[error("台帳に接続できません: {0}")]
    LedgerUnavailable(String),
    /// 外部呼び出しがタイムアウト
    #[error("タイムアウト: {0}")]
    Timeout(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
    /// 照会処理中のサーバー側エラー
    #[error("照会に失敗: {0}")]
    VerificationFailed(Box<GatewayError>),
}

impl GatewayError {
    /// HTTPステータス
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            // サーバー側の失敗は分類を `code` に載せ、ステータスは500に揃える
            GatewayError::GenerationFailed(_)
            | GatewayError::Decode(_)
            | GatewayError::LedgerRejected(_)
            | GatewayError::LedgerUnavailable(_)
            | GatewayError::Timeout(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::VerificationFailed(inner) => inner.status(),
        }
    }

    /// 安定したエラー分類コード
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            GatewayError::GenerationFailed(_) => "GENERATION_FAILED",
            GatewayError::Decode(_) => "DECODE_ERROR",
            GatewayError::LedgerRejected(_) => "LEDGER_REJECTED",
            GatewayError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            GatewayError::Timeout(_) => "TIMEOUT",
            GatewayError::Internal(_) => "INTERNAL",
            GatewayError::VerificationFailed(inner) => inner.code(),
        }
    }

    /// クライアント向けのメッセージ
    fn public_message(&self) -> String {
        match self {
            GatewayError::InvalidRequest(msg) => msg.clone(),
            GatewayError::PayloadTooLarge(_) => "File too large. Maximum size is 5MB.".to_string(),
            GatewayError::Decode(_) => "Image could not be decoded.".to_string(),
            GatewayError::LedgerRejected(RejectReason::AlreadyAttested) => {
                "Image already exists on chain.".to_string()
            }
            GatewayError::LedgerRejected(RejectReason::UnauthorizedProvider) => {
                "Provider wallet not registered.".to_string()
            }
            GatewayError::LedgerUnavailable(_) => {
                "Ledger is unavailable. Please retry later.".to_string()
            }
            GatewayError::Timeout(_) => "Upstream request timed out.".to_string(),
            GatewayError::VerificationFailed(_) => {
                "Verification failed due to server error.".to_string()
            }
            GatewayError::GenerationFailed(_)
            | GatewayError::LedgerRejected(RejectReason::Reverted(_))
            | GatewayError::Internal(_) => "Internal Server Error".to_string(),
        }
    }

    /// 診断用の詳細
    fn details(&self) -> Option<String> {
        match self {
            GatewayError::InvalidRequest(_) => None,
            GatewayError::VerificationFailed(inner) => Some(inner.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// 照会経路のサーバー側エラーを照会失敗として包む。
    pub fn for_verification(self) -> Self {
        if self.status().is_server_error() {
            GatewayError::VerificationFailed(Box::new(self))
        } else {
            self
        }
    }

    /// レスポンスボディを構築する。
    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            code: self.code().to_string(),
            error: self.public_message(),
            details: self.details(),
        }
    }
}

impl From<LedgerError> for GatewayError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(reason) => GatewayError::LedgerRejected(reason),
            LedgerError::Unavailable(msg) => GatewayError::LedgerUnavailable(msg),
            LedgerError::Timeout => GatewayError::Timeout(e.to_string()),
            LedgerError::Config(msg) => GatewayError::Internal(msg),
        }
    }
}

impl From<GenerationError> for GatewayError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Timeout => GatewayError::Timeout(e.to_string()),
            other => GatewayError::GenerationFailed(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "リクエスト処理に失敗");
        } else {
            tracing::warn!(code = self.code(), error = %self, "リクエストを拒否");
        }
        (status, Json(self.to_body())).into_response()
    }
}
