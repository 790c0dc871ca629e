//! Bucket operation handlers: ListBuckets, CreateBucket, HeadBucket,
//! ListObjects.

use cumulus_driver::{BucketAcl, BucketResources, Driver, DEFAULT_MAX_KEYS};
use tracing::debug;

use crate::body::ResponseBody;
use crate::error::{ApiError, ApiResult};
use crate::handlers::HandlerContext;
use crate::response::{document_response, ListAllMyBucketsResult, ListBucketResult};
use crate::router::query_value;

/// `GET /` -- list all buckets, ascending by name.
pub(crate) async fn list_buckets<D: Driver>(
    driver: &D,
    ctx: &HandlerContext,
) -> ApiResult<http::Response<ResponseBody>> {
    let buckets = driver.list_buckets().await?;
    debug!(count = buckets.len(), "listed buckets");

    let document = ListAllMyBucketsResult::from_buckets(&buckets);
    let xml = document.to_xml();
    Ok(document_response(&document, xml, ctx.format))
}

/// `PUT /{bucket}` -- create a bucket.
///
/// Reads `x-amz-acl` (default `private`); an unrecognized tag is answered
/// with `NotImplemented` before the driver is consulted. Any request body
/// (e.g. a `LocationConstraint` document) is accepted and ignored.
pub(crate) async fn create_bucket<D: Driver>(
    driver: &D,
    parts: &http::request::Parts,
    bucket: &str,
) -> ApiResult<http::Response<ResponseBody>> {
    let acl = match parts.headers.get("x-amz-acl") {
        None => BucketAcl::default(),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<BucketAcl>().ok())
            .ok_or_else(ApiError::not_implemented)?,
    };

    driver.create_bucket(bucket, acl).await?;
    debug!(bucket, %acl, "created bucket");

    Ok(http::Response::builder()
        .status(http::StatusCode::OK)
        .body(ResponseBody::empty())
        .expect("static response should be valid"))
}

/// `HEAD /{bucket}` -- 200 if the bucket exists, 404 otherwise.
pub(crate) async fn head_bucket<D: Driver>(
    driver: &D,
    bucket: &str,
) -> ApiResult<http::Response<ResponseBody>> {
    driver.get_bucket_metadata(bucket).await?;

    Ok(http::Response::builder()
        .status(http::StatusCode::OK)
        .body(ResponseBody::empty())
        .expect("static response should be valid"))
}

/// `GET /{bucket}` -- list objects.
pub(crate) async fn list_objects<D: Driver>(
    driver: &D,
    ctx: &HandlerContext,
    bucket: &str,
    query: &[(String, String)],
) -> ApiResult<http::Response<ResponseBody>> {
    let resources = parse_bucket_resources(query)?;

    // A missing bucket is reported before any listing work happens.
    driver.get_bucket_metadata(bucket).await?;

    let (objects, resources) = driver.list_objects(bucket, resources).await?;
    debug!(
        bucket,
        count = objects.len(),
        truncated = resources.is_truncated,
        "listed objects"
    );

    let document = ListBucketResult::from_listing(bucket, &objects, &resources);
    let xml = document.to_xml();
    Ok(document_response(&document, xml, ctx.format))
}

/// Parse listing parameters from the query string.
///
/// `max-keys` defaults to 1000 when omitted and clamps silently to 1000;
/// a negative or non-numeric value is an `InvalidArgument` error.
fn parse_bucket_resources(query: &[(String, String)]) -> ApiResult<BucketResources> {
    let mut resources = BucketResources::default();

    if let Some(prefix) = query_value(query, "prefix") {
        resources.prefix = prefix.to_owned();
    }
    if let Some(marker) = query_value(query, "marker") {
        resources.marker = marker.to_owned();
    }
    if let Some(delimiter) = query_value(query, "delimiter") {
        resources.delimiter = delimiter.to_owned();
    }
    if let Some(raw) = query_value(query, "max-keys") {
        let max_keys: i64 = raw
            .parse()
            .map_err(|_| ApiError::invalid_argument("max-keys must be a non-negative integer"))?;
        if max_keys < 0 {
            return Err(ApiError::invalid_argument(
                "max-keys must be a non-negative integer",
            ));
        }
        resources.max_keys = usize::try_from(max_keys)
            .unwrap_or(DEFAULT_MAX_KEYS)
            .min(DEFAULT_MAX_KEYS);
    }

    Ok(resources)
}
