//! # モック画像生成
//!
//! `MOCK_MODE=true` とテスト用。外部APIを呼ばず、プロンプトを描いたSVGを返す。
//! 同じプロンプトからは常に同じバイト列が得られる。

use super::{GeneratedImage, GenerationError, ImageGenerator};

pub struct MockGenerator;

/// プロンプトを埋め込んだSVG文書を生成する。
pub fn render_svg(prompt: &str) -> String {
    let escaped = prompt
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"256\" height=\"256\">\
         <rect width=\"256\" height=\"256\" fill=\"white\"/>\
         <text x=\"16\" y=\"128\">{escaped}</text></svg>"
    )
}

#[async_trait::async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        Ok(GeneratedImage {
            bytes: render_svg(prompt).into_bytes(),
            strategy: "mock",
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let a = MockGenerator.generate("a red circle").await.unwrap();
        let b = MockGenerator.generate("a red circle").await.unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_ne!(a.bytes, MockGenerator.generate("a blue square").await.unwrap().bytes);
    }

    #[test]
    fn test_render_svg_escapes() {
        let svg = render_svg("<b> & \"q\"");
        assert!(svg.contains("&lt;b&gt; &amp; &quot;q&quot;"));
        assert!(svg.starts_with("<svg"));
    }
}
