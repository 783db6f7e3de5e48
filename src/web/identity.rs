// Client identity for rate limiting.
//
// Taken from the first (client-most) entry of `x-forwarded-for`, as set by
// the reverse proxy in front of the relay. Requests without the header all
// share the `anon` identity.

use axum::http::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identity used when no forwarded address is present.
pub const ANONYMOUS: &str = "anon";

pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}
