//! # GET /health

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use genproof_types::HealthResponse;

use crate::config::GatewayState;

/// GET /health: 稼働状態と署名者アドレスを返す。
pub async fn handle_health(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_id: state.model_id.clone(),
        provider: state.ledger.provider_address(),
    })
}
