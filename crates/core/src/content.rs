//! # ファイル種別ポリシー
//!
//! 受け付けるMIMEタイプの許可リスト、種別ごとのサイズ上限、
//! ブロブ名の組み立て。

use chrono::{DateTime, Utc};
use xeroq_types::Otp;

use crate::error::LifecycleError;

/// 許可する文書のMIMEタイプ（PDF, DOCX）
pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// 許可する画像のMIMEタイプ
pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

/// 拡張子が取れない場合のブロブ拡張子
const FALLBACK_EXTENSION: &str = "bin";

/// アップロードファイルの種別。サイズ上限と有効な印刷オプションが異なる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Image,
}

/// 種別ごとのサイズ上限を持つ受付ポリシー。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentPolicy {
    max_document_bytes: u64,
    max_image_bytes: u64,
}

impl ContentPolicy {
    /// 文書の上限（10 MiB）
    pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
    /// 画像の上限（15 MiB）
    pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 15 * 1024 * 1024;

    pub fn new(max_document_bytes: u64, max_image_bytes: u64) -> Self {
        Self {
            max_document_bytes,
            max_image_bytes,
        }
    }

    /// MIMEタイプを種別に分類する。許可リストにない場合は `None`。
    ///
    /// `; charset=...` 等のパラメータと大文字小文字の違いは無視する。
    pub fn classify(content_type: &str) -> Option<FileKind> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if DOCUMENT_TYPES.contains(&essence.as_str()) {
            Some(FileKind::Document)
        } else if IMAGE_TYPES.contains(&essence.as_str()) {
            Some(FileKind::Image)
        } else {
            None
        }
    }

    pub fn max_bytes(&self, kind: FileKind) -> u64 {
        match kind {
            FileKind::Document => self.max_document_bytes,
            FileKind::Image => self.max_image_bytes,
        }
    }

    /// 種別を問わない最大サイズ。HTTPボディ上限の算出に使う。
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_document_bytes.max(self.max_image_bytes)
    }

    /// 種別とサイズを検証する。種別の判定がサイズより先に行われる。
    pub fn check(&self, content_type: &str, size: u64) -> Result<FileKind, LifecycleError> {
        let kind = Self::classify(content_type)
            .ok_or_else(|| LifecycleError::UnsupportedType(content_type.to_string()))?;
        let limit = self.max_bytes(kind);
        if size > limit {
            return Err(LifecycleError::TooLarge { size, limit });
        }
        Ok(kind)
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_DOCUMENT_BYTES,
            Self::DEFAULT_MAX_IMAGE_BYTES,
        )
    }
}

/// ブロブ名 `{otp}_{UNIXミリ秒}.{拡張子}` を組み立てる。
pub fn blob_name(otp: &Otp, filename: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.{}", otp, at.timestamp_millis(), extension(filename))
}

/// 元のファイル名から拡張子を取り出す。
/// オブジェクトキーに使うため英数字以外を含む拡張子は採用しない。
fn extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_classify_allow_list() {
        assert_eq!(ContentPolicy::classify("application/pdf"), Some(FileKind::Document));
        assert_eq!(
            ContentPolicy::classify(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(FileKind::Document)
        );
        assert_eq!(ContentPolicy::classify("IMAGE/PNG"), Some(FileKind::Image));
        assert_eq!(
            ContentPolicy::classify("image/jpeg; charset=binary"),
            Some(FileKind::Image)
        );
        assert_eq!(ContentPolicy::classify("application/zip"), None);
        assert_eq!(ContentPolicy::classify("image/svg+xml"), None);
        assert_eq!(ContentPolicy::classify(""), None);
    }

    #[test]
    fn test_check_size_ceilings() {
        let policy = ContentPolicy::default();

        assert!(policy.check("image/png", 14 * MIB).is_ok());
        assert!(policy.check("image/png", 15 * MIB).is_ok());
        assert!(matches!(
            policy.check("image/png", 16 * MIB),
            Err(LifecycleError::TooLarge { limit, .. }) if limit == 15 * MIB
        ));

        assert!(policy.check("application/pdf", 10 * MIB).is_ok());
        assert!(matches!(
            policy.check("application/pdf", 11 * MIB),
            Err(LifecycleError::TooLarge { limit, .. }) if limit == 10 * MIB
        ));
    }

    #[test]
    fn test_check_type_before_size() {
        let policy = ContentPolicy::default();
        assert!(matches!(
            policy.check("application/zip", 100 * MIB),
            Err(LifecycleError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_max_upload_bytes() {
        assert_eq!(ContentPolicy::default().max_upload_bytes(), 15 * MIB);
        assert_eq!(ContentPolicy::new(50 * MIB, 15 * MIB).max_upload_bytes(), 50 * MIB);
    }

    #[test]
    fn test_blob_name() {
        let otp = Otp::parse("QW12ER").unwrap();
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        assert_eq!(blob_name(&otp, "Thesis.Final.PDF", at), "QW12ER_1700000000123.pdf");
        assert_eq!(blob_name(&otp, "noext", at), "QW12ER_1700000000123.bin");
        assert_eq!(blob_name(&otp, "trailing.", at), "QW12ER_1700000000123.bin");
        assert_eq!(blob_name(&otp, "evil.p/../x", at), "QW12ER_1700000000123.bin");
    }
}
