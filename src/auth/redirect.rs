use url::Url;

const SAFE_SCHEMES: [&str; 2] = ["http", "https"];

/// Decides whether a caller-supplied post-login destination may be redirected
/// to. The candidate is resolved against the configured origin, so a bare
/// path stays same-origin; anything that resolves to another scheme, host, or
/// port is refused. Parse failures and empty candidates are refused too.
pub fn is_safe_redirect(origin: &Url, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let Ok(resolved) = origin.join(candidate) else {
        return false;
    };
    SAFE_SCHEMES.contains(&resolved.scheme())
        && resolved.host_str() == origin.host_str()
        && resolved.port_or_known_default() == origin.port_or_known_default()
}
