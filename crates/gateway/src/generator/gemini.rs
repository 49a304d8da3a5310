//! # Gemini クライアント
//!
//! Google Generative Language APIの `generateContent` を直接呼び出す。

use serde_json::json;

use super::{image_from_response, send_json, GeneratedImage, GenerationError, ImageGenerator};

/// 既定のAPIベースURL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// 既定のモデル
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Gemini APIによる画像生成
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl ImageGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::info!(model = %self.model, prompt_len = prompt.len(), "Geminiに画像生成を要求");

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
            }));
        let response = send_json(request).await?;

        image_from_response(&self.client, &response).await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Json;
    use serde_json::Value;

    #[tokio::test]
    async fn test_generate_inline_data() {
        let app = axum::Router::new().route(
            "/models/{model}",
            post(
                |axum::extract::Path(model): axum::extract::Path<String>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    assert_eq!(model, "test-image:generateContent");
                    assert_eq!(
                        headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                        Some("g-key")
                    );
                    assert_eq!(body["contents"][0]["parts"][0]["text"], "a red circle");
                    Json(json!({"candidates": [{"content": {"parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]}}]}))
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let gen = GeminiGenerator::new(
            reqwest::Client::new(),
            "g-key".into(),
            Some("test-image".into()),
            Some(format!("http://{addr}")),
        );
        let image = gen.generate("a red circle").await.unwrap();
        assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(image.strategy, "gemini_inline_data");
    }
}
