//! # 画像生成クライアント
//!
//! 外部の生成AI APIを呼び出し、応答から画像バイト列を取り出す。
//! 応答の形はプロバイダやモデルごとに揺れるため、
//! 取り出し方は `extract` の順序付き戦略に任せる。

pub mod extract;
pub mod gemini;
pub mod mock;
pub mod openrouter;

use base64::Engine;

pub use extract::ImageLocator;

/// エラー詳細に含める応答テキストの上限（文字数）
const DETAIL_PREVIEW_CHARS: usize = 200;

/// 生成された画像
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// 画像バイト列
    pub bytes: Vec<u8>,
    /// 取り出しに成功した戦略名
    pub strategy: &'static str,
}

/// 画像生成のエラー型
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// プロバイダがエラーを返した
    #[error("HTTP {status} - {body}")]
    Provider { status: u16, body: String },
    /// どの戦略でも画像を取り出せなかった
    #[error("no image data found in response: {0}")]
    NoImage(String),
    /// 画像参照の取得・デコードに失敗
    #[error("画像の取得に失敗: {0}")]
    Fetch(String),
    /// 通信エラー
    #[error("AIプロバイダとの通信に失敗: {0}")]
    Transport(String),
    /// タイムアウト
    #[error("AIプロバイダの応答がタイムアウトしました")]
    Timeout,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

/// 画像生成AIのトレイト。
///
/// 実装は単一の `reqwest::Client` を共有し、同時呼び出しに対して安全であること。
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// プロンプトから画像を生成する。
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError>;

    /// プロバイダ名（ログ・ヘルスチェック用）
    fn name(&self) -> &'static str;
}

/// JSONリクエストを送り、2xx以外はプロバイダエラーとして返す。
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, GenerationError> {
    let resp = request.send().await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GenerationError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| GenerationError::Transport(format!("応答のJSONパースに失敗: {e}")))
}

/// 応答から画像を取り出し、バイト列に解決する。
pub(crate) async fn image_from_response(
    client: &reqwest::Client,
    response: &serde_json::Value,
) -> Result<GeneratedImage, GenerationError> {
    let Some((strategy, locator)) = extract::extract_image(response) else {
        let text = extract::response_text(response);
        let preview: String = text.chars().take(DETAIL_PREVIEW_CHARS).collect();
        return Err(GenerationError::NoImage(preview));
    };

    tracing::debug!(strategy, "応答から画像参照を取り出しました");

    let bytes = resolve_locator(client, locator).await?;
    if bytes.is_empty() {
        return Err(GenerationError::Fetch("画像データが空です".to_string()));
    }

    Ok(GeneratedImage { bytes, strategy })
}

/// 画像参照をバイト列に解決する。
///
/// `data:` URIはその場でデコードし、それ以外はHTTP GETで取得する。
pub async fn resolve_locator(
    client: &reqwest::Client,
    locator: ImageLocator,
) -> Result<Vec<u8>, GenerationError> {
    match locator {
        ImageLocator::Inline(bytes) => Ok(bytes),
        ImageLocator::Base64(data) => decode_base64(&data),
        ImageLocator::Uri(uri) => {
            if let Some(payload) = uri.strip_prefix("data:") {
                return decode_data_uri(payload);
            }

            let resp = client.get(&uri).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(GenerationError::Fetch(format!("HTTP {status} - {uri}")));
            }
            let bytes = resp.bytes().await?;
            Ok(bytes.to_vec())
        }
    }
}

/// `data:<mime>;base64,<payload>` の `data:` 以降をデコードする。
fn decode_data_uri(rest: &str) -> Result<Vec<u8>, GenerationError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| GenerationError::Fetch("data URIにペイロードがありません".to_string()))?;

    if meta.ends_with(";base64") {
        decode_base64(payload)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, GenerationError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GenerationError::Fetch(format!("base64デコードに失敗: {e}")))
}
