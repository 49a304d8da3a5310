//! # POST /generate
//!
//! プロンプトから画像を生成し、コミットメントを台帳に登録する。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use base64::Engine;
use genproof_types::{GenerateData, GenerateRequest, SuccessResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /generate: 画像生成 + Attestation登録。
///
/// 登録トランザクションの承認まで待ってから応答する。
pub async fn handle_generate(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<GenerateData>>, GatewayError> {
    let Json(req) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let registered = state.register(req.prompt.as_deref()).await?;

    Ok(Json(SuccessResponse::new(GenerateData {
        prompt: registered.prompt,
        image_base64: base64::engine::general_purpose::STANDARD.encode(&registered.image),
        image_type: registered.media_type.to_string(),
        image_hash: registered.commitment.to_string(),
        tx_hash: registered.tx_hash,
        attestation_url: registered.attestation_url,
        model_id: registered.model_id,
    })))
}
