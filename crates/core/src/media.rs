//! # メディアタイプ推定
//!
//! レスポンスの `image_type` を埋めるための参考情報。ハッシュ計算には使わない。

/// SVG判定でルート要素を探す先頭範囲（バイト）
const SVG_SNIFF_WINDOW: usize = 1024;

/// コンテンツのMIMEタイプをマジックバイトから推定する。
pub fn detect_media_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.len() >= 12 && data[8..12] == *b"WEBP" {
        "image/webp"
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        "image/gif"
    } else if looks_like_svg(data) {
        "image/svg+xml"
    } else {
        "application/octet-stream"
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let window = String::from_utf8_lossy(&data[..data.len().min(SVG_SNIFF_WINDOW)]);
    let head = window.trim_start();
    (head.starts_with("<svg") || head.starts_with("<?xml")) && head.contains("<svg")
}
