//! # genproof Gateway
//!
//! 生成AIで画像を作り、そのコミットメントをEVM上のAttestationレジストリに記録する。
//!
//! ## 役割
//! - 生成AIの呼び出しと応答からの画像抽出
//! - 画像コミットメントの計算（生バイトモード）
//! - 台帳への登録と照会
//!
//! ## API エンドポイント
//! - `POST /generate`: 画像生成 + Attestation登録
//! - `POST /verify`: アップロード画像の登録状態照会
//! - `GET /health`: 稼働状態

mod attest;
mod config;
mod endpoints;
mod error;
mod generator;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use genproof_types::MAX_UPLOAD_BYTES;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, GatewayState};

/// multipartの境界・ヘッダ分の余裕（バイト）
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// ルーターを構築する。
fn build_router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/generate", axum::routing::post(endpoints::handle_generate))
        .route("/verify", axum::routing::post(endpoints::handle_verify))
        .route("/health", axum::routing::get(endpoints::handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    if config.mock_mode {
        tracing::info!("MOCK_MODEで起動します");
    }

    let state = Arc::new(GatewayState::from_config(&config)?);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Gatewayを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use genproof_chain::{Ledger, LedgerError, MemoryLedger, TxReceipt};
    use genproof_crypto::Commitment;
    use genproof_types::LedgerRecord;
    use serde_json::{json, Value};

    use crate::generator::mock::MockGenerator;
    use crate::generator::openrouter::OpenRouterGenerator;
    use crate::generator::ImageGenerator;

    const PROVIDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    /// RPCに到達できない台帳
    struct DownLedger;

    #[async_trait::async_trait]
    impl Ledger for DownLedger {
        async fn register_attestation(
            &self,
            _commitment: &Commitment,
            _model_id: &str,
        ) -> Result<TxReceipt, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".into()))
        }

        async fn lookup(&self, _commitment: &Commitment) -> Result<Option<LedgerRecord>, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".into()))
        }

        fn provider_address(&self) -> Option<String> {
            None
        }
    }

    fn test_state(
        generator: Arc<dyn ImageGenerator>,
        ledger: impl Ledger + 'static,
    ) -> Arc<GatewayState> {
        Arc::new(GatewayState {
            generator,
            ledger: Arc::new(ledger),
            model_id: "gemini-2.5-flash".to_string(),
            explorer_url: "https://etherscan.io".to_string(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }

    /// Gatewayを127.0.0.1のランダムポートで起動し、ベースURLを返す
    async fn start_gateway(state: Arc<GatewayState>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        format!("http://{addr}")
    }

    async fn post_image(base: &str, bytes: Vec<u8>) -> (u16, Value) {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("image.bin");
        let form = reqwest::multipart::Form::new().part("image", part);
        let resp = reqwest::Client::new()
            .post(format!("{base}/verify"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_generate(base: &str, body: Value) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}/generate"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// 生成→照会の往復で登録内容が返ることを確認
    #[tokio::test]
    async fn test_generate_then_verify() {
        let ledger = MemoryLedger::new(PROVIDER).with_clock(|| 1_735_689_600);
        let base = start_gateway(test_state(Arc::new(MockGenerator), ledger)).await;

        let (status, body) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["success"], true);

        let data = &body["data"];
        assert_eq!(data["prompt"], "a red circle");
        assert_eq!(data["image_type"], "image/svg+xml");
        assert_eq!(data["model_id"], "gemini-2.5-flash");

        // image_hash は image_base64 をデコードしたバイト列のハッシュと一致する
        let image = base64::engine::general_purpose::STANDARD
            .decode(data["image_base64"].as_str().unwrap())
            .unwrap();
        assert!(image.starts_with(b"<svg"));
        assert_eq!(data["image_hash"], Commitment::of(&image).to_string());

        let tx_hash = data["tx_hash"].as_str().unwrap();
        assert_eq!(
            data["attestation_url"],
            format!("https://etherscan.io/tx/{tx_hash}")
        );

        let (status, body) = post_image(&base, image).await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["is_verified"], true);
        assert_eq!(body["data"]["image_hash"], data["image_hash"]);
        assert_eq!(body["data"]["provider"], PROVIDER);
        assert_eq!(body["data"]["model_id"], "gemini-2.5-flash");
        assert_eq!(body["data"]["timestamp"], 1_735_689_600u64);
    }

    /// 同じ画像の二重登録はLEDGER_REJECTEDになる
    #[tokio::test]
    async fn test_duplicate_generate_rejected() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, _) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 200);

        let (status, body) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "LEDGER_REJECTED");
        assert_eq!(body["error"], "Image already exists on chain.");
    }

    #[tokio::test]
    async fn test_unregistered_provider() {
        let base = start_gateway(test_state(
            Arc::new(MockGenerator),
            MemoryLedger::unauthorized(PROVIDER),
        ))
        .await;

        let (status, body) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 500);
        assert_eq!(body["code"], "LEDGER_REJECTED");
        assert_eq!(body["error"], "Provider wallet not registered.");
    }

    #[tokio::test]
    async fn test_generate_echoes_prompt_verbatim() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_generate(&base, json!({"prompt": "  a red circle  "})).await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["data"]["prompt"], "  a red circle  ");
    }

    /// 台帳に到達できない場合、分類はcodeに載り、ステータスは500
    #[tokio::test]
    async fn test_ledger_unavailable_is_500() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), DownLedger)).await;

        let (status, body) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 500);
        assert_eq!(body["code"], "LEDGER_UNAVAILABLE");
        assert!(body["details"].as_str().unwrap().contains("connection refused"));

        let (status, body) = post_image(&base, b"any image".to_vec()).await;
        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "LEDGER_UNAVAILABLE");
        assert_eq!(body["error"], "Verification failed due to server error.");
    }

    #[tokio::test]
    async fn test_generate_missing_prompt() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        for body in [json!({}), json!({"prompt": ""}), json!({"prompt": "   "})] {
            let (status, resp) = post_generate(&base, body).await;
            assert_eq!(status, 400);
            assert_eq!(resp["code"], "INVALID_REQUEST");
            assert_eq!(resp["error"], "Prompt is required");
        }
    }

    #[tokio::test]
    async fn test_generate_malformed_json() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/generate"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    /// AIプロバイダのエラーはGENERATION_FAILEDとして詳細付きで返る
    #[tokio::test]
    async fn test_generate_provider_failure() {
        let mock_ai = axum::Router::new().route(
            "/chat/completions",
            axum::routing::post(|| async {
                (axum::http::StatusCode::UNAUTHORIZED, "invalid api key")
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ai_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, mock_ai).await.unwrap();
        });

        let generator = OpenRouterGenerator::new(
            reqwest::Client::new(),
            "bad-key".to_string(),
            None,
            Some(format!("http://{ai_addr}")),
        );
        let base = start_gateway(test_state(Arc::new(generator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_generate(&base, json!({"prompt": "a red circle"})).await;
        assert_eq!(status, 500);
        assert_eq!(body["code"], "GENERATION_FAILED");
        assert_eq!(body["error"], "Internal Server Error");
        let details = body["details"].as_str().unwrap();
        assert!(details.contains("HTTP 401"), "{details}");
        assert!(details.contains("invalid api key"), "{details}");
    }

    #[tokio::test]
    async fn test_verify_unregistered_image() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_image(&base, b"some other image".to_vec()).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "This image has not been attested on the blockchain.");
        assert_eq!(
            body["debug_hash"],
            Commitment::of(b"some other image").to_string()
        );
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_verify_missing_file() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let form = reqwest::multipart::Form::new().text("note", "no image here");
        let resp = reqwest::Client::new()
            .post(format!("{base}/verify"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert_eq!(body["error"], "No image file uploaded.");
    }

    #[tokio::test]
    async fn test_verify_not_multipart() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/verify"))
            .json(&json!({"image": "abc"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }

    /// 5 MiB + 1 バイトは413で拒否される
    #[tokio::test]
    async fn test_verify_payload_too_large() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_image(&base, vec![0u8; MAX_UPLOAD_BYTES + 1]).await;
        assert_eq!(status, 413);
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    }

    /// ボディ上限を超えるアップロードも413として返る
    #[tokio::test]
    async fn test_verify_body_over_limit() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_image(&base, vec![0u8; 8 * 1024 * 1024]).await;
        assert_eq!(status, 413);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    }

    /// ちょうど 5 MiB は受け付ける
    #[tokio::test]
    async fn test_verify_exact_limit_accepted() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let (status, body) = post_image(&base, vec![7u8; MAX_UPLOAD_BYTES]).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let base = start_gateway(test_state(Arc::new(MockGenerator), MemoryLedger::new(PROVIDER))).await;

        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_id"], "gemini-2.5-flash");
        assert_eq!(body["provider"], PROVIDER);
    }
}
