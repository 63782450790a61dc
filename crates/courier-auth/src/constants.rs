//! Courier API signing-scheme constants
//!
//! These values are baked into the Android client build this library
//! impersonates. The signature scheme id is an opaque version tag the server
//! matches, not something computed. The per-identity values (device id,
//! device name, coordinates) live in the credential store instead.

/// Shared HMAC secret compiled into the client build.
pub const HMAC_SECRET: &str = "18aaaabd-7299-4be8-a943-166a5fe0753f";

/// Opaque signature-scheme version tag, sent as `X-SIGNATURE-VERSION`.
pub const SIGNATURE_SCHEME: &str = "6f8f8ea7-0773-4cde-a70e";

/// App version string of the client build the signing scheme was taken from.
pub const DEFAULT_APP_VERSION: &str = "4.91.2";

/// Device label used when the caller doesn't supply one.
pub const DEFAULT_DEVICE_NAME: &str = "huawei p30 pro";

/// Fallback coordinates for records created without a position fix.
pub const DEFAULT_LATITUDE: f64 = 59.772022;
pub const DEFAULT_LONGITUDE: f64 = 39.576505;

/// Device type discriminator in login/validate/logout bodies.
pub const DEVICE_TYPE: &str = "DEVICE_ANDROID";

/// Client-library identifier the Android build sends.
pub const USER_AGENT: &str = "okhttp/4.12.0";

/// Default API origin.
pub const DEFAULT_BASE_URL: &str = "https://r-point.wb.ru";

/// Control-plane endpoint paths.
pub const LOGIN_PATH: &str = "/wbc/api/v1/login";
pub const VALIDATE_PATH: &str = "/wbc/api/v1/courier/validate";
pub const REFRESH_PATH: &str = "/wbc/api/v1/courier/refresh";
pub const LOGOUT_PATH: &str = "/wbc/api/v1/logout";

/// Accept header sent on every call, auth-mode and bearer-mode alike.
pub const ACCEPT: &str = "application/json, text/plain";

/// Content type for all JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
