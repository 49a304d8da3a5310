//! # OpenRouter クライアント
//!
//! OpenAI互換の `chat/completions` に画像モダリティを指定して呼び出す。

use serde_json::json;

use super::{image_from_response, send_json, GeneratedImage, GenerationError, ImageGenerator};

/// 既定のAPIベースURL
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// 既定のモデル
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image";

/// OpenRouter経由の画像生成
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
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

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": format!("Generate an image of: {prompt}")}
            ],
            "modalities": ["image", "text"],
        })
    }
}

#[async_trait::async_trait]
impl ImageGenerator for OpenRouterGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(model = %self.model, prompt_len = prompt.len(), "OpenRouterに画像生成を要求");

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt));
        let response = send_json(request).await?;

        image_from_response(&self.client, &response).await
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
