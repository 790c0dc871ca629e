//! Wire-level error type and the driver-error mapper.
//!
//! [`ApiError`] is what handlers return; it carries the S3 error code, the
//! HTTP status, a client-safe message, and the resource path for the error
//! body. The `From<DriverError>` impl is the total mapping from the driver
//! vocabulary onto the wire: every kind lands on a specific code, and
//! anything unrecognized collapses to `InternalError` so backend detail
//! never reaches a client.

use std::fmt;

use cumulus_auth::AuthError;
use cumulus_driver::DriverError;

/// Well-known S3 error codes emitted by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// AccessDenied error.
    AccessDenied,
    /// BadDigest error.
    BadDigest,
    /// BucketAlreadyExists error.
    BucketAlreadyExists,
    /// InternalError error.
    InternalError,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidBucketName error.
    InvalidBucketName,
    /// InvalidRange error.
    InvalidRange,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchKey error.
    NoSuchKey,
    /// NotImplemented error.
    NotImplemented,
    /// RequestTimeTooSkewed error.
    RequestTimeTooSkewed,
}

impl ApiErrorCode {
    /// Returns the error code as the string serialized into `<Code>`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::BadDigest => "BadDigest",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidRange => "InvalidRange",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NotImplemented => "NotImplemented",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::BadDigest | Self::InvalidArgument | Self::InvalidBucketName => {
                http::StatusCode::BAD_REQUEST
            }
            Self::AccessDenied | Self::RequestTimeTooSkewed => http::StatusCode::FORBIDDEN,
            Self::NoSuchBucket | Self::NoSuchKey => http::StatusCode::NOT_FOUND,
            Self::BucketAlreadyExists => http::StatusCode::CONFLICT,
            Self::InvalidRange => http::StatusCode::RANGE_NOT_SATISFIABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Returns the client-facing message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied.",
            Self::BadDigest => "The Content-MD5 you specified did not match what we received.",
            Self::BucketAlreadyExists => "The requested bucket name is not available.",
            Self::InternalError => "We encountered an internal error, please try again.",
            Self::InvalidArgument => "Invalid Argument.",
            Self::InvalidBucketName => "The specified bucket is not valid.",
            Self::InvalidRange => "The requested range cannot be satisfied.",
            Self::NoSuchBucket => "The specified bucket does not exist.",
            Self::NoSuchKey => "The specified key does not exist.",
            Self::NotImplemented => {
                "A header you provided implies functionality that is not implemented."
            }
            Self::RequestTimeTooSkewed => {
                "The difference between the request time and the server's time is too large."
            }
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error response in the making.
#[derive(Debug)]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// The client-facing message.
    pub message: String,
    /// The resource that caused the error (`/bucket/key`).
    pub resource: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create an error carrying the code's default message.
    #[must_use]
    pub fn new(code: ApiErrorCode) -> Self {
        Self {
            message: code.default_message().to_owned(),
            code,
            resource: None,
        }
    }

    /// Create an error with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
        }
    }

    /// Set the resource path reported in the error body.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.code.status_code()
    }

    /// Create a NotImplemented error.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::new(ApiErrorCode::NotImplemented)
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InvalidArgument, message)
    }

    /// Create an AccessDenied error.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::new(ApiErrorCode::AccessDenied)
    }

    /// Create an InvalidRange error.
    #[must_use]
    pub fn invalid_range() -> Self {
        Self::new(ApiErrorCode::InvalidRange)
    }
}

impl From<DriverError> for ApiError {
    /// Total mapping from the driver error vocabulary onto the wire.
    ///
    /// Driver messages are not forwarded: the client sees only the stable
    /// per-code message, backend detail stays in the logs.
    fn from(err: DriverError) -> Self {
        let code = match err {
            DriverError::BucketNameInvalid { .. } => ApiErrorCode::InvalidBucketName,
            DriverError::BucketNotFound { .. } => ApiErrorCode::NoSuchBucket,
            DriverError::BucketExists { .. } => ApiErrorCode::BucketAlreadyExists,
            DriverError::ObjectNameInvalid { .. } | DriverError::ObjectNotFound { .. } => {
                ApiErrorCode::NoSuchKey
            }
            DriverError::BadDigest { .. } => ApiErrorCode::BadDigest,
            DriverError::InvalidRange => ApiErrorCode::InvalidRange,
            DriverError::AccessDenied => ApiErrorCode::AccessDenied,
            DriverError::NotImplemented => ApiErrorCode::NotImplemented,
            // ObjectExists has no wire code of its own: a driver refusing an
            // overwrite is an internal inconsistency for this service.
            DriverError::ObjectExists { .. }
            | DriverError::BackendCorrupted
            | DriverError::Internal(_) => ApiErrorCode::InternalError,
        };
        Self::new(code)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::MissingDateHeader | AuthError::RequestTimeTooSkewed => {
                ApiErrorCode::RequestTimeTooSkewed
            }
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::AccessKeyNotFound(_)
            | AuthError::SignatureDoesNotMatch => ApiErrorCode::AccessDenied,
        };
        Self::new(code)
    }
}

/// Convenience result type for handler functions.
pub type ApiResult<T> = Result<T, ApiError>;
