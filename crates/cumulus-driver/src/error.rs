//! The canonical driver error vocabulary.
//!
//! Every storage backend maps its failures into [`DriverError`] before they
//! cross the driver boundary. The HTTP core translates each kind into a
//! specific S3 error code and status; anything a backend cannot express with
//! a dedicated variant travels as [`DriverError::Internal`] and surfaces as
//! a generic `InternalError` without leaking backend detail to clients.

/// Errors a storage driver may return.
///
/// This is a closed vocabulary: the HTTP core matches on it exhaustively.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The bucket name violates the S3 naming rules.
    #[error("invalid bucket name: {name}: {reason}")]
    BucketNameInvalid {
        /// The offending bucket name.
        name: String,
        /// The rule that was violated.
        reason: String,
    },

    /// The bucket does not exist.
    #[error("bucket not found: {bucket}")]
    BucketNotFound {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// A bucket with this name already exists.
    #[error("bucket already exists: {bucket}")]
    BucketExists {
        /// The bucket name that already exists.
        bucket: String,
    },

    /// The object key violates the S3 key rules.
    #[error("invalid object name: {key}: {reason}")]
    ObjectNameInvalid {
        /// The offending key.
        key: String,
        /// The rule that was violated.
        reason: String,
    },

    /// The object does not exist.
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound {
        /// The bucket that was searched.
        bucket: String,
        /// The key that was not found.
        key: String,
    },

    /// The object already exists and the backend does not overwrite.
    #[error("object already exists: {bucket}/{key}")]
    ObjectExists {
        /// The bucket holding the object.
        bucket: String,
        /// The key that already exists.
        key: String,
    },

    /// The client-supplied `Content-MD5` disagrees with the computed digest.
    #[error("digest mismatch: expected {expected}, computed {computed}")]
    BadDigest {
        /// The digest the client declared (base64).
        expected: String,
        /// The hex digest of the bytes actually received.
        computed: String,
    },

    /// The requested byte range is outside the object.
    #[error("requested range is not satisfiable")]
    InvalidRange,

    /// The caller is not allowed to perform this operation.
    #[error("access denied")]
    AccessDenied,

    /// The backend does not implement this operation.
    #[error("operation not implemented by this driver")]
    NotImplemented,

    /// The backend's on-disk or in-memory state is damaged.
    #[error("backend state is corrupted")]
    BackendCorrupted,

    /// Any other failure. Collapses to `InternalError` on the wire.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
