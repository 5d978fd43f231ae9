use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a candidate link is refused before it can reach a feed card.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL points at a loopback or private address.
    #[error("Internal address not allowed: {0}")]
    InternalHost(String),
    /// The URL points at a site root rather than an article.
    #[error("Not a deep link: {0}")]
    NotDeepLink(String),
}

/// Validates a link taken from untrusted model output.
///
/// Accepts only public `http`/`https` URLs. Loopback and private
/// addresses are rejected, since a generated card must never send the
/// reader into their own network.
///
/// # Examples
///
/// ```
/// use bytes_feed::util::validate_link;
///
/// assert!(validate_link("https://example.com/2025/story").is_ok());
/// assert!(validate_link("javascript:alert(1)").is_err());
/// assert!(validate_link("http://192.168.1.1/admin").is_err());
/// ```
pub fn validate_link(url_str: &str) -> Result<Url, LinkError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(LinkError::UnsupportedScheme(scheme.to_owned())),
    }

    if let Some(host) = url.host_str() {
        if host.eq_ignore_ascii_case("localhost") {
            return Err(LinkError::InternalHost(host.to_owned()));
        }

        let host_for_parse = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
            if is_internal_ip(&ip) {
                return Err(LinkError::InternalHost(ip.to_string()));
            }
        }
    }

    Ok(url)
}

/// Validates a link and additionally requires it to address a specific
/// document: a non-root path or a query string.
pub fn validate_deep_link(url_str: &str) -> Result<Url, LinkError> {
    let url = validate_link(url_str)?;
    if !is_deep_link(&url) {
        return Err(LinkError::NotDeepLink(url.to_string()));
    }
    Ok(url)
}

/// Returns true when the URL points below the site root.
///
/// `https://www.reuters.com/` is a homepage; `https://www.reuters.com/world/x`
/// and `https://example.com/?id=42` are not.
pub fn is_deep_link(url: &Url) -> bool {
    let path = url.path().trim_end_matches('/');
    !path.is_empty() || url.query().is_some_and(|q| !q.is_empty())
}

/// Returns true when `base` targets the local machine over plain HTTP.
///
/// Used to allow non-HTTPS API base URLs for test servers only.
pub fn is_local_http(base: &str) -> bool {
    base.starts_with("http://127.0.0.1") || base.starts_with("http://localhost")
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // fc00::/7 and fe80::/10
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}
