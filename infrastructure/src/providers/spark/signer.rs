//! HMAC-signed connection URL builder
//!
//! Spark rejects unauthenticated WebSocket connections. Each connection
//! URL carries an `authorization` parameter derived from an HMAC-SHA256
//! signature over the host, an RFC 1123 date, and the request line. The
//! date is part of the signature, so a URL is only valid for a few
//! minutes and must be built fresh for every connection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Errors building a signed URL
///
/// Only URL handling can fail here; the HMAC primitive accepts keys of
/// any length and a failure in it would be a programmer error.
#[derive(Error, Debug)]
pub enum SignError {
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Provider URL has no host")]
    MissingHost,
}

/// Build a signed connection URL for `base_url`, dated now.
pub fn signed_ws_url(base_url: &str, api_key: &str, api_secret: &str) -> Result<String, SignError> {
    signed_ws_url_at(base_url, api_key, api_secret, &rfc1123_now())
}

/// Signature-scheme worker with an injectable date, so the
/// time-dependence is testable.
fn signed_ws_url_at(
    base_url: &str,
    api_key: &str,
    api_secret: &str,
    date: &str,
) -> Result<String, SignError> {
    let mut url = Url::parse(base_url)?;
    let host = url.host_str().ok_or(SignError::MissingHost)?.to_string();
    let path = url.path().to_string();

    let canonical = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{api_key}\", algorithm=\"hmac-sha256\", \
         headers=\"host date request-line\", signature=\"{signature}\""
    );
    let authorization = BASE64.encode(authorization_origin.as_bytes());

    url.query_pairs_mut()
        .append_pair("authorization", &authorization)
        .append_pair("date", date)
        .append_pair("host", &host);

    Ok(url.to_string())
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
