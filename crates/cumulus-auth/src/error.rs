//! Error types for request authentication.
//!
//! All verification failures are represented by [`AuthError`], with a variant
//! per failure mode. The HTTP layer folds most of them into `AccessDenied`;
//! the date-skew variants surface as `RequestTimeTooSkewed`.

/// Errors that can occur during AWS Signature V2 verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed as `AWS AKID:Signature`.
    #[error("invalid Authorization header format")]
    InvalidAuthHeader,

    /// The access key ID was not found in the credential store.
    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// Neither `Date` nor `x-amz-date` is present, or the value is unparsable.
    #[error("missing or malformed Date header")]
    MissingDateHeader,

    /// The request date lies outside the allowed clock-skew window.
    #[error("request time differs from server time by more than the allowed skew")]
    RequestTimeTooSkewed,
}
