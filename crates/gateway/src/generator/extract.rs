//! # 応答からの画像抽出
//!
//! 純粋な抽出関数を優先順に並べ、最初に値を返したものを採用する。
//! 各関数は対象外の形なら `None` を返す。

use serde_json::Value;

/// 応答中の画像の所在
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocator {
    /// そのまま使えるバイト列
    Inline(Vec<u8>),
    /// base64文字列
    Base64(String),
    /// `data:` URIまたは取得先URL
    Uri(String),
}

/// 抽出戦略
pub struct Strategy {
    /// 戦略名（ログ用）
    pub name: &'static str,
    /// 抽出関数
    pub extract: fn(&Value) -> Option<ImageLocator>,
}

/// 抽出戦略（優先順）
pub const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "gemini_inline_data",
        extract: gemini_inline_data,
    },
    Strategy {
        name: "images_array",
        extract: images_array,
    },
    Strategy {
        name: "markdown_link",
        extract: markdown_link,
    },
    Strategy {
        name: "inline_svg",
        extract: inline_svg,
    },
];

/// 戦略を順に試し、最初に成功した戦略名と所在を返す。
pub fn extract_image(response: &Value) -> Option<(&'static str, ImageLocator)> {
    STRATEGIES
        .iter()
        .find_map(|s| (s.extract)(response).map(|locator| (s.name, locator)))
}

/// 応答中のテキスト部分を連結する（エラー詳細用）。
pub fn response_text(response: &Value) -> String {
    let mut text = String::new();

    if let Some(content) = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        text.push_str(content);
    }

    if let Some(parts) = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
    {
        for part in parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                text.push_str(t);
            }
        }
    }

    text
}

/// Gemini形式: `candidates[0].content.parts[*].inlineData.data`
fn gemini_inline_data(response: &Value) -> Option<ImageLocator> {
    let parts = response
        .pointer("/candidates/0/content/parts")?
        .as_array()?;

    parts.iter().find_map(|part| {
        let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
        let data = inline.get("data")?.as_str()?;
        (!data.is_empty()).then(|| ImageLocator::Base64(data.to_string()))
    })
}

/// OpenRouter形式: `choices[0].message.images[0]`
fn images_array(response: &Value) -> Option<ImageLocator> {
    let image = response.pointer("/choices/0/message/images/0")?;

    let url = image
        .pointer("/image_url/url")
        .or_else(|| image.pointer("/imageUrl/url"))
        .or_else(|| image.get("url"))
        .and_then(Value::as_str)
        .or_else(|| image.as_str())?;

    (!url.is_empty()).then(|| ImageLocator::Uri(url.to_string()))
}

/// メッセージ本文中の最初の `![alt](uri)`
fn markdown_link(response: &Value) -> Option<ImageLocator> {
    let content = response
        .pointer("/choices/0/message/content")?
        .as_str()?;
    find_markdown_image(content).map(|uri| ImageLocator::Uri(uri.to_string()))
}

fn find_markdown_image(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(start) = rest.find("![") {
        let after = &rest[start + 2..];
        let Some(close) = after.find("](") else {
            return None;
        };
        let target = &after[close + 2..];
        if let Some(end) = target.find(')') {
            let uri = target[..end].trim();
            if !uri.is_empty() {
                return Some(uri);
            }
        }
        rest = after;
    }
    None
}

/// メッセージ本文中の `<svg ...>...</svg>` 文書
fn inline_svg(response: &Value) -> Option<ImageLocator> {
    let text = response_text(response);
    let start = text.find("<svg")?;
    let end = text[start..].rfind("</svg>")? + start + "</svg>".len();
    Some(ImageLocator::Inline(text[start..end].as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_inline_data() {
        let response = json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is your image"},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
            ]}}]
        });
        assert_eq!(
            extract_image(&response),
            Some(("gemini_inline_data", ImageLocator::Base64("iVBORw0KGgo=".to_string())))
        );
    }

    #[test]
    fn test_images_array_shapes() {
        let snake = json!({"choices": [{"message": {"images": [
            {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
        ]}}]});
        let camel = json!({"choices": [{"message": {"images": [
            {"imageUrl": {"url": "https://cdn.example/a.png"}}
        ]}}]});
        let flat = json!({"choices": [{"message": {"images": [
            {"url": "https://cdn.example/b.png"}
        ]}}]});
        let bare = json!({"choices": [{"message": {"images": ["https://cdn.example/c.png"]}}]});

        for (response, expected) in [
            (snake, "data:image/png;base64,AAAA"),
            (camel, "https://cdn.example/a.png"),
            (flat, "https://cdn.example/b.png"),
            (bare, "https://cdn.example/c.png"),
        ] {
            assert_eq!(
                extract_image(&response),
                Some(("images_array", ImageLocator::Uri(expected.to_string())))
            );
        }
    }

    #[test]
    fn test_markdown_link() {
        let response = json!({"choices": [{"message": {
            "content": "Sure! ![a red circle](https://cdn.example/circle.png) enjoy"
        }}]});
        assert_eq!(
            extract_image(&response),
            Some(("markdown_link", ImageLocator::Uri("https://cdn.example/circle.png".to_string())))
        );
    }

    #[test]
    fn test_find_markdown_image_skips_empty_target() {
        assert_eq!(find_markdown_image("![x]() then ![y](u.png)"), Some("u.png"));
        assert_eq!(find_markdown_image("[not an image](u.png)"), None);
        assert_eq!(find_markdown_image("![broken"), None);
    }

    #[test]
    fn test_inline_svg() {
        let response = json!({"choices": [{"message": {
            "content": "```xml\n<svg xmlns=\"http://www.w3.org/2000/svg\"><circle r=\"5\" fill=\"red\"/></svg>\n```"
        }}]});
        let (name, locator) = extract_image(&response).unwrap();
        assert_eq!(name, "inline_svg");
        assert_eq!(
            locator,
            ImageLocator::Inline(
                b"<svg xmlns=\"http://www.w3.org/2000/svg\"><circle r=\"5\" fill=\"red\"/></svg>".to_vec()
            )
        );
    }

    #[test]
    fn test_strategy_order() {
        // images配列とmarkdownの両方があればimages配列が優先される
        let response = json!({"choices": [{"message": {
            "content": "![alt](https://cdn.example/md.png) <svg></svg>",
            "images": [{"image_url": {"url": "https://cdn.example/images.png"}}]
        }}]});
        assert_eq!(
            extract_image(&response),
            Some(("images_array", ImageLocator::Uri("https://cdn.example/images.png".to_string())))
        );

        // markdownとSVGの両方があればmarkdownが優先される
        let response = json!({"choices": [{"message": {
            "content": "![alt](https://cdn.example/md.png) <svg></svg>"
        }}]});
        assert_eq!(extract_image(&response).map(|(n, _)| n), Some("markdown_link"));
    }

    #[test]
    fn test_no_strategy_applies() {
        assert_eq!(extract_image(&json!({"choices": [{"message": {"content": "no"}}]})), None);
        assert_eq!(extract_image(&json!({})), None);
        assert_eq!(
            extract_image(&json!({"choices": [{"message": {"images": [{"url": ""}]}}]})),
            None
        );
    }

    #[test]
    fn test_response_text() {
        let response = json!({"candidates": [{"content": {"parts": [
            {"text": "a"}, {"inlineData": {"data": ""}}, {"text": "b"}
        ]}}]});
        assert_eq!(response_text(&response), "ab");
    }
}
