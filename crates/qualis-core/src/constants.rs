/// User agent sent on every outbound HTTP request
pub const USER_AGENT: &str = concat!("Qualis/", env!("CARGO_PKG_VERSION"));

/// Default timeout for calls to the Qualis web API
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
