//! # genproof 共有型定義
//!
//! Gateway・CLI・チェーンクライアントで共有するデータ構造を提供する。
//!
//! ## エンコーディング規則
//! - Hex (`0x`プレフィックス付き): コミットメント、ナリファイア、署名、トランザクションハッシュ
//! - Base64: 画像バイナリ（HTTPレスポンス内）
//! - アドレス: EIP-55チェックサム付きhex

use serde::{Deserialize, Serialize};

/// オフライン来歴アーティファクトのスキーマバージョン。
pub const ATTESTATION_SCHEMA_VERSION: u32 = 1;

/// /verify にアップロードできる画像の最大サイズ（5 MiB）。
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Attestation / 来歴アーティファクト
// ---------------------------------------------------------------------------

/// コミットメントをプロバイダとモデルに結びつける主張。
///
/// フィールドの宣言順がそのまま正規化JSONのキー順になる。
/// 数値はすべて整数で表現する（浮動小数点は使わない）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// プロバイダのアドレス（EIP-55チェックサム付きhex）
    pub provider: String,
    /// モデル識別子
    pub model_id: String,
    /// 発行時刻（UNIX秒）
    pub issued_at: u64,
    /// 画像コミットメント（`0x` + 64 hex）
    pub image_commitment: String,
    /// リプレイ防止用ナリファイア（`0x` + 64 hex）
    pub nullifier: String,
    /// スキーマバージョン
    pub schema_version: u32,
}

/// 署名付きのオフライン来歴アーティファクト。
/// `provenance.json` としてファイルに保存される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceArtifact {
    /// 正規化済みAttestation
    pub attestation: Attestation,
    /// 正規化ダイジェストに対するEIP-191署名（`0x` + 130 hex）
    pub signature: String,
}

/// 台帳に記録されたAttestation。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// 書き込みを行ったプロバイダのアドレス
    pub provider: String,
    /// 登録時に宣言されたモデル識別子
    pub model_id: String,
    /// 台帳が記録した発行時刻（UNIX秒）
    pub issued_at: u64,
}

// ---------------------------------------------------------------------------
// POST /generate
// ---------------------------------------------------------------------------

/// POST /generate リクエスト。
///
/// `prompt` が欠落していてもデシリアライズは成功させ、
/// 検証はハンドラ側で `InvalidRequest` として扱う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// 画像生成プロンプト
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /generate の成功データ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateData {
    /// 入力プロンプト
    pub prompt: String,
    /// Base64エンコードされた画像バイト列
    pub image_base64: String,
    /// 画像のMIMEタイプ（マジックバイトから推定、参考情報）
    pub image_type: String,
    /// 画像コミットメント
    pub image_hash: String,
    /// 登録トランザクションのハッシュ
    pub tx_hash: String,
    /// ブロックエクスプローラ上のトランザクションURL
    pub attestation_url: String,
    /// 宣言したモデル識別子
    pub model_id: String,
}

// ---------------------------------------------------------------------------
// POST /verify
// ---------------------------------------------------------------------------

/// POST /verify の成功データ（台帳に記録が存在する場合）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyData {
    /// 常に `true`
    pub is_verified: bool,
    /// 再計算した画像コミットメント
    pub image_hash: String,
    /// 台帳に記録されたプロバイダアドレス
    pub provider: String,
    /// 台帳に記録されたモデル識別子
    pub model_id: String,
    /// 台帳に記録された発行時刻（UNIX秒）
    pub timestamp: Option<u64>,
}

/// POST /verify で記録が見つからなかった場合のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotAttestedResponse {
    /// 常に `false`
    pub success: bool,
    /// 利用者向けメッセージ
    pub error: String,
    /// 照会に使ったコミットメント
    pub debug_hash: String,
}

// ---------------------------------------------------------------------------
// 共通レスポンス
// ---------------------------------------------------------------------------

/// 成功レスポンスの外殻。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    /// 常に `true`
    pub success: bool,
    /// 本体
    pub data: T,
}

impl<T> SuccessResponse<T> {
    /// `success: true` で包む。
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// エラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 常に `false`
    pub success: bool,
    /// 安定したエラー分類コード（例: `LEDGER_REJECTED`）
    pub code: String,
    /// 利用者向けメッセージ
    pub error: String,
    /// 診断用の生の詳細
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// GET /health レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 常に `"ok"`
    pub status: String,
    /// 宣言したモデル識別子
    pub model_id: String,
    /// 台帳書き込みに使うアドレス（設定されている場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}
