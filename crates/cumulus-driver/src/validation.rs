//! Validation for bucket names and object keys.
//!
//! Follows the
//! [Amazon S3 naming rules](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html):
//! drivers call these before touching their backing store so every backend
//! rejects the same names the same way.

use std::net::Ipv4Addr;

use crate::error::DriverError;

/// Minimum bucket name length.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length.
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Maximum object key length in bytes.
const MAX_KEY_BYTES: usize = 1024;

/// Validate an S3 bucket name.
///
/// Names are 3-63 characters drawn from lowercase letters, digits, hyphens,
/// and dots; they begin and end alphanumeric, never contain `..`, and are
/// never shaped like an IPv4 address.
///
/// # Errors
///
/// Returns [`DriverError::BucketNameInvalid`] naming the violated rule.
///
/// # Examples
///
/// ```
/// use cumulus_driver::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-valid-bucket").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), DriverError> {
    let invalid = |reason: &str| DriverError::BucketNameInvalid {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(invalid("bucket name must be between 3 and 63 characters"));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "bucket name must only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    let first = name.as_bytes()[0];
    let last = name.as_bytes()[len - 1];
    if !(first.is_ascii_lowercase() || first.is_ascii_digit())
        || !(last.is_ascii_lowercase() || last.is_ascii_digit())
    {
        return Err(invalid(
            "bucket name must start and end with a letter or number",
        ));
    }

    if name.contains("..") {
        return Err(invalid("bucket name must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("bucket name must not be formatted as an IP address"));
    }

    Ok(())
}

/// Validate an S3 object key.
///
/// Keys are 1-1024 bytes of UTF-8 (enforced by the `&str` type) and may
/// contain `/`.
///
/// # Errors
///
/// Returns [`DriverError::ObjectNameInvalid`] if the key is empty or exceeds
/// 1024 bytes.
pub fn validate_object_key(key: &str) -> Result<(), DriverError> {
    if key.is_empty() {
        return Err(DriverError::ObjectNameInvalid {
            key: key.to_owned(),
            reason: "object key must not be empty".to_owned(),
        });
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(DriverError::ObjectNameInvalid {
            key: key.to_owned(),
            reason: "object key must not exceed 1024 bytes".to_owned(),
        });
    }

    Ok(())
}
