//! # Gatewayエンドポイント
//!
//! - `POST /upload` — ファイル登録、OTP発行
//! - `GET /admin/lookup` — OTPでジョブ情報を取得
//! - `GET /admin/download` — ファイル本体を取得
//! - `POST /admin/complete` — 印刷完了を記録
//! - `GET /health` — 死活監視

pub mod complete;
pub mod download;
pub mod health;
pub mod lookup;
pub mod upload;

pub use complete::handle_complete;
pub use download::handle_download;
pub use health::handle_health;
pub use lookup::handle_lookup;
pub use upload::handle_upload;

use xeroq_core::LifecycleError;
use xeroq_types::Otp;

use crate::error::GatewayError;

pub const UPLOAD_PATH: &str = "/upload";
pub const LOOKUP_PATH: &str = "/admin/lookup";
pub const DOWNLOAD_PATH: &str = "/admin/download";
pub const COMPLETE_PATH: &str = "/admin/complete";
pub const HEALTH_PATH: &str = "/health";

/// リクエストのOTPを検証する。
///
/// 未指定は400。形式が不正なOTPは該当ジョブなしとして404を返し、ストアには問い合わせない。
pub(crate) fn parse_otp(raw: Option<&str>) -> Result<Otp, GatewayError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("OTPが指定されていません".to_string()))?;
    Otp::parse(raw).ok_or_else(|| LifecycleError::NotFound.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_otp() {
        assert_eq!(parse_otp(Some(" ab12cd ")).unwrap().as_str(), "AB12CD");
        assert!(matches!(parse_otp(None), Err(GatewayError::BadRequest(_))));
        assert!(matches!(parse_otp(Some("  ")), Err(GatewayError::BadRequest(_))));
        assert!(matches!(
            parse_otp(Some("AB12CD'),or(")),
            Err(GatewayError::NotFound(_))
        ));
    }
}
