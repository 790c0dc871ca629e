//! Object operation handlers: CreateObject, GetObject, HeadObject.
//!
//! Bodies stream in both directions. A PUT feeds the request body into the
//! driver through [`body_reader`]; a GET spawns the driver write onto a
//! duplex pipe whose read half becomes the response body, so a disconnecting
//! client severs the pipe and stops the backend read.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use cumulus_driver::Driver;

use crate::body::{body_reader, ResponseBody, STREAM_PIPE_SIZE};
use crate::error::{ApiError, ApiResult};
use crate::handlers::HandlerContext;
use crate::range::HttpRange;
use crate::response::format_http_date;

/// `PUT /{bucket}/{key}` -- store an object from the request body stream.
pub(crate) async fn create_object<D, B>(
    driver: &D,
    parts: &http::request::Parts,
    body: B,
    bucket: &str,
    key: &str,
) -> ApiResult<http::Response<ResponseBody>>
where
    D: Driver,
    B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    // A missing bucket is reported before the body is consumed.
    driver.get_bucket_metadata(bucket).await?;

    let content_type = header_str(parts, "content-type");
    let expected_md5 = header_str(parts, "content-md5");

    let mut reader = body_reader(body);
    let metadata = driver
        .create_object(bucket, key, content_type, expected_md5, &mut reader)
        .await?;

    debug!(bucket, key, size = metadata.size, "stored object");

    Ok(http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::ETAG, metadata.etag())
        .body(ResponseBody::empty())
        .expect("static response should be valid"))
}

/// `GET /{bucket}/{key}` and `HEAD /{bucket}/{key}`.
///
/// Fetches bucket metadata (404 if missing), gates anonymous access on the
/// bucket ACL, fetches object metadata (404 if missing), then serves the
/// whole object (200) or a validated byte range (206). HEAD emits the same
/// headers with no body.
pub(crate) async fn get_object<D: Driver>(
    driver: &Arc<D>,
    ctx: &HandlerContext,
    parts: &http::request::Parts,
    bucket: &str,
    key: &str,
    head: bool,
) -> ApiResult<http::Response<ResponseBody>> {
    let bucket_meta = driver.get_bucket_metadata(bucket).await?;

    if !ctx.authenticated && !bucket_meta.acl.is_public_read() {
        return Err(ApiError::access_denied());
    }

    let metadata = driver.get_object_metadata(bucket, key, "").await?;

    let mut builder = http::Response::builder()
        .header(http::header::LAST_MODIFIED, format_http_date(&metadata.created))
        .header(http::header::CONTENT_TYPE, metadata.content_type.as_str())
        .header(http::header::ETAG, metadata.etag())
        .header(http::header::ACCEPT_RANGES, "bytes");

    let range = match header_opt(parts, "range") {
        Some(raw) => Some(HttpRange::parse(raw, metadata.size)?),
        None => None,
    };

    let (status, length) = match range {
        Some(range) => {
            builder = builder.header(http::header::CONTENT_RANGE, range.content_range());
            (http::StatusCode::PARTIAL_CONTENT, range.length)
        }
        None => (http::StatusCode::OK, metadata.size),
    };
    builder = builder.status(status).header(http::header::CONTENT_LENGTH, length);

    let body = if head {
        ResponseBody::empty()
    } else {
        stream_object(driver, bucket, key, range)
    };

    builder
        .body(body)
        .map_err(|_| ApiError::new(crate::error::ApiErrorCode::InternalError))
}

/// Spawn the driver read onto a pipe and hand back the streaming body.
fn stream_object<D: Driver>(
    driver: &Arc<D>,
    bucket: &str,
    key: &str,
    range: Option<HttpRange>,
) -> ResponseBody {
    let (client, mut server) = tokio::io::duplex(STREAM_PIPE_SIZE);
    let driver = Arc::clone(driver);
    let bucket = bucket.to_owned();
    let key = key.to_owned();

    tokio::spawn(async move {
        let result = match range {
            Some(range) => {
                driver
                    .get_partial_object(&mut server, &bucket, &key, range.offset, range.length)
                    .await
            }
            None => driver.get_object(&mut server, &bucket, &key).await,
        };

        match result {
            Ok(written) => debug!(bucket = %bucket, key = %key, written, "streamed object body"),
            // The headers are already on the wire; all we can do is cut the
            // stream short and log. A severed pipe here usually means the
            // client went away.
            Err(e) => warn!(bucket = %bucket, key = %key, error = %e, "object body stream aborted"),
        }

        let _ = server.shutdown().await;
    });

    ResponseBody::streaming(client)
}

/// A header value as `&str`, empty when absent or non-UTF-8.
fn header_str<'a>(parts: &'a http::request::Parts, name: &str) -> &'a str {
    header_opt(parts, name).unwrap_or("")
}

/// A header value as `Option<&str>`.
fn header_opt<'a>(parts: &'a http::request::Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}
