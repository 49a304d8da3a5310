//! # POST /verify
//!
//! アップロードされた画像のコミットメントを再計算し、台帳で照会する。

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use genproof_types::{NotAttestedResponse, SuccessResponse, VerifyData};

use crate::attest::VerifyOutcome;
use crate::config::GatewayState;
use crate::error::GatewayError;

/// 画像を受け取るmultipartフィールド名
pub const IMAGE_FIELD: &str = "image";

fn multipart_error(e: MultipartError) -> GatewayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(e.body_text())
    } else {
        GatewayError::InvalidRequest(e.body_text())
    }
}

/// multipartから画像フィールドを読み出す。
async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }
    Err(GatewayError::InvalidRequest("No image file uploaded.".to_string()))
}

/// POST /verify: 画像の登録状態を照会する。
///
/// 未登録は `200 { success: false, error, debug_hash }` として返し、エラー扱いしない。
pub async fn handle_verify(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GatewayError> {
    let mut multipart =
        multipart.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let image = read_image_field(&mut multipart).await?;

    let outcome = state
        .verify(&image)
        .await
        .map_err(GatewayError::for_verification)?;

    let response = match outcome {
        VerifyOutcome::Registered { commitment, record } => Json(SuccessResponse::new(VerifyData {
            is_verified: true,
            image_hash: commitment.to_string(),
            provider: record.provider,
            model_id: record.model_id,
            timestamp: Some(record.issued_at),
        }))
        .into_response(),
        VerifyOutcome::Unregistered { commitment } => Json(NotAttestedResponse {
            success: false,
            error: "This image has not been attested on the blockchain.".to_string(),
            debug_hash: commitment.to_string(),
        })
        .into_response(),
    };

    Ok(response)
}
