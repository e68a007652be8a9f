//! Small text and time helpers shared by config, remote and CLI code.

/// Longest error-body excerpt kept in messages.
pub const ERROR_EXCERPT_CHARS: usize = 180;

/// Trimmed copy of `value`, or `None` when nothing but whitespace is left.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Whether `url` names an `http` or `https` endpoint.
pub fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Normalize a backend base URL: trimmed, without trailing slashes.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    non_blank(raw).map(|url| url.trim_end_matches('/').to_string())
}

/// First [`ERROR_EXCERPT_CHARS`] characters of a trimmed response body.
pub fn excerpt(body: &str) -> String {
    body.trim().chars().take(ERROR_EXCERPT_CHARS).collect()
}

/// Wall-clock Unix time in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
