//! # コミットメントエンジン
//!
//! 画像バイト列から32バイトの決定論的コミットメントを導出する。
//! ネットワーク状態には一切依存しない純粋関数。

use genproof_crypto::Commitment;
use image::ImageFormat;

use crate::CoreError;

/// コミットメントの計算モード。
///
/// 登録時と照合時で同じモードを使わなければ照合は必ず失敗する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// ファイルのバイト列をそのままハッシュする。再エンコードに弱いが失敗しない。
    Raw,
    /// PNGをデコードし、寸法とRGBA画素列だけをハッシュする。
    /// 圧縮パラメータ・チャンク分割・テキストチャンク等のコンテナ情報は無視される。
    Pixel,
}

/// 画像バイト列のコミットメントを計算する。
///
/// - `Raw`: `keccak256(payload)`
/// - `Pixel`: `keccak256(u32be(width) || u32be(height) || rgba_pixels)`
pub fn commit(payload: &[u8], mode: CommitMode) -> Result<Commitment, CoreError> {
    match mode {
        CommitMode::Raw => Ok(Commitment::of(payload)),
        CommitMode::Pixel => {
            let canonical = pixel_canonical_bytes(payload)?;
            Ok(Commitment::of(&canonical))
        }
    }
}

/// ピクセルモードの正規化バイト列を構築する。
fn pixel_canonical_bytes(payload: &[u8]) -> Result<Vec<u8>, CoreError> {
    let decoded = image::load_from_memory_with_format(payload, ImageFormat::Png)
        .map_err(|e| CoreError::Decode(format!("PNGとして解釈できません: {e}")))?;

    // 色深度・カラータイプの差を吸収するため8bit RGBAに正規化する
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba.into_raw();

    let mut canonical = Vec::with_capacity(8 + pixels.len());
    canonical.extend_from_slice(&width.to_be_bytes());
    canonical.extend_from_slice(&height.to_be_bytes());
    canonical.extend_from_slice(&pixels);
    Ok(canonical)
}
