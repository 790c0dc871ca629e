//! AWS Signature Version 2 verification.
//!
//! A SigV2 client sends `Authorization: AWS <access-key>:<signature>`, where
//! the signature is the base64 HMAC-SHA1 of a canonical string assembled
//! from the request: the verb, the `Content-MD5` and `Content-Type` headers,
//! the request date, every `x-amz-*` header in sorted order, and the
//! resource path with its signed sub-resources. The server rebuilds that
//! string, recomputes the MAC with the stored secret, and compares in
//! constant time.
//!
//! The request date (`Date`, or `x-amz-date` when present) must fall within
//! a configurable clock-skew window; a skewed request is rejected before
//! any storage work happens.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::credentials::CredentialProvider;
use crate::error::AuthError;

type HmacSha1 = Hmac<Sha1>;

/// Default clock-skew window: +/- 15 minutes.
pub const DEFAULT_MAX_SKEW: Duration = Duration::from_secs(15 * 60);

/// Sub-resource query keys that participate in the canonicalized resource.
const SIGNED_SUB_RESOURCES: &[&str] = &[
    "acl",
    "location",
    "logging",
    "policy",
    "torrent",
    "uploadId",
    "uploads",
    "versioning",
];

/// The outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The access key the request was signed with.
    pub access_key_id: String,
}

/// Verify an AWS SigV2-signed HTTP request.
///
/// Checks, in order: header shape, the date-skew window, and the HMAC-SHA1
/// signature (compared in constant time).
///
/// # Errors
///
/// Returns an [`AuthError`] if the header is malformed, the request date is
/// missing or skewed, the access key is unknown, or the signature does not
/// match.
pub fn verify_sigv2(
    parts: &http::request::Parts,
    credential_provider: &dyn CredentialProvider,
    max_skew: Duration,
) -> Result<AuthResult, AuthError> {
    let auth_header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (access_key_id, claimed_signature) = split_auth_header(auth_header)?;

    debug!(access_key_id, "verifying SigV2 signature");

    check_date_skew(parts, max_skew, Utc::now())?;

    let secret_key = credential_provider.get_secret_key(access_key_id)?;

    let string_to_sign = build_string_to_sign(parts);

    debug!(string_to_sign = ?string_to_sign, "built SigV2 string to sign");

    let expected = compute_sigv2_signature(&secret_key, &string_to_sign);

    let matches: bool = claimed_signature
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into();
    if !matches {
        debug!(access_key_id, "SigV2 signature mismatch");
        return Err(AuthError::SignatureDoesNotMatch);
    }

    debug!(access_key_id, "SigV2 verification succeeded");
    Ok(AuthResult {
        access_key_id: access_key_id.to_owned(),
    })
}

/// Split an `Authorization` header into access key and signature.
///
/// The only accepted shape is `AWS <access-key>:<signature>`, both parts
/// non-empty.
fn split_auth_header(header: &str) -> Result<(&str, &str), AuthError> {
    let Some(credentials) = header.strip_prefix("AWS ") else {
        return Err(AuthError::InvalidAuthHeader);
    };

    match credentials.split_once(':') {
        Some((access_key_id, signature)) if !access_key_id.is_empty() && !signature.is_empty() => {
            Ok((access_key_id, signature))
        }
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Validate the request date against the clock-skew window.
///
/// Uses `x-amz-date` when present, otherwise `Date`. Absent or unparsable
/// dates are [`AuthError::MissingDateHeader`]; dates outside
/// `now +/- max_skew` are [`AuthError::RequestTimeTooSkewed`].
fn check_date_skew(
    parts: &http::request::Parts,
    max_skew: Duration,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let raw = parts
        .headers
        .get("x-amz-date")
        .or_else(|| parts.headers.get(http::header::DATE))
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingDateHeader)?;

    let request_time = parse_http_date(raw).ok_or(AuthError::MissingDateHeader)?;

    let skew = (now - request_time).abs().to_std().unwrap_or(Duration::MAX);
    if skew > max_skew {
        return Err(AuthError::RequestTimeTooSkewed);
    }

    Ok(())
}

/// Parse an HTTP date: RFC 1123 (`Sun, 02 Aug 2026 10:00:00 GMT`) with an
/// ISO 8601 fallback for clients that send `x-amz-date` in that form.
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Assemble the SigV2 string to sign.
///
/// Verb, `Content-MD5`, `Content-Type`, and the date on their own lines,
/// followed by the canonical `x-amz-*` block and the canonical resource.
fn build_string_to_sign(parts: &http::request::Parts) -> String {
    let headers = &parts.headers;

    // When x-amz-date is present the Date slot signs empty; the header
    // itself is covered by the canonical x-amz block instead.
    let date = if headers.contains_key("x-amz-date") {
        ""
    } else {
        signed_header(headers, "date")
    };

    let mut out = String::with_capacity(128);
    out.push_str(parts.method.as_str());
    out.push('\n');
    out.push_str(signed_header(headers, "content-md5"));
    out.push('\n');
    out.push_str(signed_header(headers, "content-type"));
    out.push('\n');
    out.push_str(date);
    out.push('\n');
    out.push_str(&canonical_amz_headers(headers));
    out.push_str(&canonical_resource(parts));
    out
}

/// Canonicalize the `x-amz-*` headers.
///
/// One `name:value\n` line per header name, sorted. Header names are
/// already lowercase in the `http` model; repeated names have their values
/// joined with commas in arrival order.
fn canonical_amz_headers(headers: &http::HeaderMap) -> String {
    let mut lines: BTreeMap<&str, String> = BTreeMap::new();

    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with("x-amz-") {
            continue;
        }
        let value = value.to_str().unwrap_or("").trim();
        match lines.entry(name) {
            btree_map::Entry::Occupied(mut line) => {
                let joined = line.get_mut();
                joined.push(',');
                joined.push_str(value);
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value.to_owned());
            }
        }
    }

    lines
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect()
}

/// Canonicalize the resource: the URI path, plus the signed sub-resources
/// sorted by name (`/bucket/key?acl&uploads`).
fn canonical_resource(parts: &http::request::Parts) -> String {
    let mut resource = parts.uri.path().to_owned();

    let mut signed: Vec<String> = Vec::new();
    for pair in parts
        .uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty())
    {
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (pair, None),
        };
        if !SIGNED_SUB_RESOURCES.contains(&name) {
            continue;
        }

        // A sub-resource with an empty value signs the same as a bare name.
        let decoded = value
            .map(|v| {
                percent_encoding::percent_decode_str(v)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .filter(|v| !v.is_empty());
        signed.push(match decoded {
            Some(v) => format!("{name}={v}"),
            None => name.to_owned(),
        });
    }

    if !signed.is_empty() {
        signed.sort();
        resource.push('?');
        resource.push_str(&signed.join("&"));
    }

    resource
}

/// `Base64(HMAC-SHA1(secret, string_to_sign))`.
///
/// HMAC accepts keys of any length, so constructing the MAC cannot fail.
#[must_use]
pub fn compute_sigv2_signature(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
        .expect("HMAC-SHA1 accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Sign request parts the way a SigV2 client would.
///
/// Produces the `Authorization` header value for the given credentials.
/// Primarily for tests and local tooling; the server side only verifies.
#[must_use]
pub fn sign_request(parts: &http::request::Parts, access_key_id: &str, secret_key: &str) -> String {
    let string_to_sign = build_string_to_sign(parts);
    let signature = compute_sigv2_signature(secret_key, &string_to_sign);
    format!("AWS {access_key_id}:{signature}")
}

/// Fetch a header for the string to sign; absent headers sign as empty.
fn signed_header<'a>(headers: &'a http::HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}
