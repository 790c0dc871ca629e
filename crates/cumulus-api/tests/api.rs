//! End-to-end tests: signed requests through the full pipeline (router,
//! SigV2 verification, handlers, response writer) against the in-memory
//! driver.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use md5::{Digest, Md5};

use cumulus_api::{ResponseBody, S3Service, ServiceConfig};
use cumulus_auth::{sign_request, StaticCredentialProvider};
use cumulus_driver::MemoryDriver;

const ACCESS_KEY: &str = "AC5NH40NQLTL4D2W92PM";
const SECRET_KEY: &str = "H+AVh8q5G7hEH2r3WxFP135+Q19Aw8yXWel8IGh/HrEjZyTNx/n4Xw==";

fn service() -> S3Service<MemoryDriver> {
    S3Service::new(
        "",
        MemoryDriver::new(),
        Arc::new(StaticCredentialProvider::new(vec![(
            ACCESS_KEY.to_owned(),
            SECRET_KEY.to_owned(),
        )])),
        ServiceConfig::default(),
    )
}

fn http_date_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build a request signed the way a SigV2 client would sign it.
fn signed_request(
    method: http::Method,
    uri: &str,
    body: &[u8],
    headers: &[(&str, &str)],
) -> http::Request<Full<Bytes>> {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::DATE, http_date_now());
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = builder
        .body(Full::new(Bytes::copy_from_slice(body)))
        .expect("valid request");

    let (mut parts, body) = request.into_parts();
    let authorization = sign_request(&parts, ACCESS_KEY, SECRET_KEY);
    parts.headers.insert(
        http::header::AUTHORIZATION,
        authorization.parse().expect("valid header value"),
    );
    http::Request::from_parts(parts, body)
}

/// Build an unsigned (anonymous) request.
fn anonymous_request(method: http::Method, uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::DATE, http_date_now())
        .body(Full::new(Bytes::new()))
        .expect("valid request")
}

async fn body_bytes(response: http::Response<ResponseBody>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body collect should succeed")
        .to_bytes()
}

async fn create_bucket(service: &S3Service<MemoryDriver>, bucket: &str, acl: &str) {
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            &format!("/{bucket}"),
            b"",
            &[("x-amz-acl", acl)],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK, "create {bucket}");
}

async fn put_object(service: &S3Service<MemoryDriver>, bucket: &str, key: &str, body: &[u8]) {
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            &format!("/{bucket}/{key}"),
            body,
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK, "put {bucket}/{key}");
}

fn header<'a>(response: &'a http::Response<ResponseBody>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_return_404_for_nonexistent_bucket() {
    let service = service();
    let response = service
        .handle(signed_request(http::Method::HEAD, "/bucket", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_should_head_existing_bucket() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let response = service
        .handle(signed_request(http::Method::HEAD, "/bucket", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn test_should_reject_unknown_acl_with_not_implemented() {
    let service = service();
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            "/foo",
            b"",
            &[("x-amz-acl", "unknown")],
        ))
        .await;

    assert_eq!(response.status(), http::StatusCode::NOT_IMPLEMENTED);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>NotImplemented</Code>"));
    assert!(body.contains(
        "<Message>A header you provided implies functionality that is not implemented.</Message>"
    ));
}

#[tokio::test]
async fn test_should_report_conflict_for_duplicate_bucket() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let response = service
        .handle(signed_request(http::Method::PUT, "/bucket", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::CONFLICT);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>BucketAlreadyExists</Code>"));
    assert!(body.contains("<Message>The requested bucket name is not available.</Message>"));
}

#[tokio::test]
async fn test_should_reject_invalid_bucket_name() {
    let service = service();
    let response = service
        .handle(signed_request(http::Method::PUT, "/ab", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>InvalidBucketName</Code>"));
    assert!(body.contains("<Message>The specified bucket is not valid.</Message>"));
}

#[tokio::test]
async fn test_should_list_buckets_in_ascending_order() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    create_bucket(&service, "bar", "private").await;

    let response = service
        .handle(signed_request(http::Method::GET, "/", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("application/xml"));

    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<ListAllMyBucketsResult"));
    assert!(body.contains("<Name>bar</Name>"));
    assert!(body.contains("<Name>foo</Name>"));
    assert!(
        body.find("<Name>bar</Name>").unwrap() < body.find("<Name>foo</Name>").unwrap(),
        "bar must be listed before foo"
    );
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_round_trip_empty_object() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let response = service
        .handle(signed_request(http::Method::PUT, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        header(&response, "etag"),
        Some("\"d41d8cd98f00b204e9800998ecf8427e\""),
    );

    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(header(&response, "content-length"), Some("0"));
    assert_eq!(
        header(&response, "content-type"),
        Some("application/octet-stream"),
    );
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_should_serve_object_with_verified_headers() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;
    put_object(&service, "bucket", "object", b"hello world").await;

    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);

    assert_eq!(header(&response, "content-length"), Some("11"));
    assert_eq!(
        header(&response, "content-type"),
        Some("application/octet-stream"),
    );
    assert_eq!(
        header(&response, "etag"),
        Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""),
    );
    assert_eq!(header(&response, "accept-ranges"), Some("bytes"));

    // Last-Modified round-trips through the RFC 1123 parser.
    let last_modified = header(&response, "last-modified").expect("Last-Modified present");
    assert!(chrono::DateTime::parse_from_rfc2822(last_modified).is_ok());

    assert_eq!(body_bytes(response).await.as_ref(), b"hello world");
}

#[tokio::test]
async fn test_should_return_404_for_missing_object() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>NoSuchKey</Code>"));
    assert!(body.contains("<Message>The specified key does not exist.</Message>"));
    assert!(body.contains("<Resource>/bucket/object</Resource>"));
}

#[tokio::test]
async fn test_should_return_404_when_putting_into_missing_bucket() {
    let service = service();
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            "/nobucket/object",
            b"data",
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body)
        .unwrap()
        .contains("<Code>NoSuchBucket</Code>"));
}

#[tokio::test]
async fn test_should_persist_content_type() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    // No Content-Type header: stored as application/octet-stream.
    put_object(&service, "bucket", "one", b"hello world").await;
    let response = service
        .handle(signed_request(http::Method::HEAD, "/bucket/one", b"", &[]))
        .await;
    assert_eq!(
        header(&response, "content-type"),
        Some("application/octet-stream"),
    );

    // Explicit Content-Type: persisted and served back.
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            "/bucket/two",
            b"{}",
            &[("content-type", "application/json")],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);

    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/two", b"", &[]))
        .await;
    assert_eq!(header(&response, "content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_should_serve_multi_segment_keys() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;
    put_object(&service, "bucket", "dir/sub/key.txt", b"nested").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/bucket/dir/sub/key.txt",
            b"",
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"nested");
}

#[tokio::test]
async fn test_should_head_object_without_body() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;
    put_object(&service, "bucket", "object", b"hello world").await;

    let response = service
        .handle(signed_request(http::Method::HEAD, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(header(&response, "content-length"), Some("11"));
    assert_eq!(
        header(&response, "etag"),
        Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""),
    );
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_should_stream_large_object_round_trip() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    // Larger than the streaming pipe buffer, so the body crosses the pipe
    // in many chunks.
    let payload: Vec<u8> = (0..1_048_576u32).map(|i| (i % 251) as u8).collect();
    let expected_etag = format!("\"{}\"", hex::encode(Md5::digest(&payload)));

    let response = service
        .handle(signed_request(http::Method::PUT, "/bucket/big", &payload, &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(header(&response, "etag"), Some(expected_etag.as_str()));

    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/big", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        header(&response, "content-length"),
        Some(payload.len().to_string().as_str()),
    );
    assert_eq!(body_bytes(response).await.as_ref(), payload.as_slice());
}

// ---------------------------------------------------------------------------
// Content-MD5
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_accept_matching_content_md5() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let body = b"hello world";
    let declared = BASE64.encode(Md5::digest(body));
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            "/bucket/object",
            body,
            &[("content-md5", &declared)],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn test_should_reject_mismatched_content_md5() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let declared = BASE64.encode(Md5::digest(b"different content"));
    let response = service
        .handle(signed_request(
            http::Method::PUT,
            "/bucket/object",
            b"hello world",
            &[("content-md5", &declared)],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>BadDigest</Code>"));
    assert!(body
        .contains("<Message>The Content-MD5 you specified did not match what we received.</Message>"));

    // The failed PUT must not have created the object.
    let response = service
        .handle(signed_request(http::Method::GET, "/bucket/object", b"", &[]))
        .await;
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Range requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_serve_partial_content() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    put_object(&service, "foo", "bar", b"hello world").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/foo/bar",
            b"",
            &[("range", "bytes=6-7")],
        ))
        .await;

    assert_eq!(response.status(), http::StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-length"), Some("2"));
    assert_eq!(header(&response, "content-range"), Some("bytes 6-7/11"));
    assert_eq!(body_bytes(response).await.as_ref(), b"wo");
}

#[tokio::test]
async fn test_should_reject_inverted_range() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    put_object(&service, "foo", "bar", b"hello world").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/foo/bar",
            b"",
            &[("range", "bytes=7-6")],
        ))
        .await;

    assert_eq!(response.status(), http::StatusCode::RANGE_NOT_SATISFIABLE);
    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Code>InvalidRange</Code>"));
    assert!(body.contains("<Message>The requested range cannot be satisfied.</Message>"));
}

#[tokio::test]
async fn test_should_serve_every_valid_range_of_small_object() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    let payload = b"hello world";
    put_object(&service, "foo", "bar", payload).await;

    for a in 0..payload.len() {
        for b in a..payload.len() {
            let response = service
                .handle(signed_request(
                    http::Method::GET,
                    "/foo/bar",
                    b"",
                    &[("range", &format!("bytes={a}-{b}"))],
                ))
                .await;

            assert_eq!(
                response.status(),
                http::StatusCode::PARTIAL_CONTENT,
                "range {a}-{b}"
            );
            assert_eq!(
                header(&response, "content-length"),
                Some((b - a + 1).to_string().as_str()),
                "range {a}-{b}"
            );
            assert_eq!(
                body_bytes(response).await.as_ref(),
                &payload[a..=b],
                "range {a}-{b}"
            );
        }
    }
}

#[tokio::test]
async fn test_should_serve_suffix_and_open_ranges() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    put_object(&service, "foo", "bar", b"hello world").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/foo/bar",
            b"",
            &[("range", "bytes=6-")],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await.as_ref(), b"world");

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/foo/bar",
            b"",
            &[("range", "bytes=-5")],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await.as_ref(), b"world");
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_list_objects_with_prefix_and_delimiter() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;
    for key in ["a.txt", "dir/one.txt", "dir/two.txt", "z.txt"] {
        put_object(&service, "bucket", key, b"x").await;
    }

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/bucket?delimiter=/",
            b"",
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);

    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<Key>a.txt</Key>"));
    assert!(body.contains("<Key>z.txt</Key>"));
    assert!(!body.contains("<Key>dir/one.txt</Key>"));
    assert!(body.contains("<CommonPrefixes><Prefix>dir/</Prefix></CommonPrefixes>"));
    assert!(body.contains("<IsTruncated>false</IsTruncated>"));
}

#[tokio::test]
async fn test_should_truncate_listing_at_max_keys() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;
    for key in ["a", "b", "c"] {
        put_object(&service, "bucket", key, b"x").await;
    }

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/bucket?max-keys=2",
            b"",
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);

    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("<MaxKeys>2</MaxKeys>"));
    assert!(body.contains("<IsTruncated>true</IsTruncated>"));
    assert!(body.contains("<Key>a</Key>"));
    assert!(body.contains("<Key>b</Key>"));
    assert!(!body.contains("<Key>c</Key>"));
}

#[tokio::test]
async fn test_should_reject_malformed_max_keys() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/bucket?max-keys=-1",
            b"",
            &[],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// JSON negotiation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_not_leak_serializer_names_in_bucket_list_json() {
    let service = service();
    create_bucket(&service, "foo", "private").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/",
            b"",
            &[("accept", "application/json")],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("application/json"));

    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(!body.contains("XML"), "serializer artifact leaked: {body}");

    let value: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(value["Buckets"]["Bucket"][0]["Name"], "foo");
}

#[tokio::test]
async fn test_should_not_leak_serializer_names_in_object_list_json() {
    let service = service();
    create_bucket(&service, "foo", "private").await;
    put_object(&service, "foo", "key", b"data").await;

    let response = service
        .handle(signed_request(
            http::Method::GET,
            "/foo",
            b"",
            &[("accept", "application/json")],
        ))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);

    let body = body_bytes(response).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(!body.contains("XML"), "serializer artifact leaked: {body}");

    let value: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(value["Name"], "foo");
    assert_eq!(value["Contents"][0]["Key"], "key");
}

// ---------------------------------------------------------------------------
// Sub-resources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_answer_501_for_unsupported_sub_resources() {
    let service = service();

    for uri in [
        "/bucket/object?policy",
        "/bucket?acl",
        "/bucket/object?uploads",
        "/bucket/object?uploadId=abc123",
        "/bucket?logging",
        "/bucket?location",
    ] {
        let response = service
            .handle(signed_request(http::Method::GET, uri, b"", &[]))
            .await;
        assert_eq!(
            response.status(),
            http::StatusCode::NOT_IMPLEMENTED,
            "uri: {uri}"
        );
    }
}

#[tokio::test]
async fn test_should_answer_501_for_unsupported_verbs() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    for method in [http::Method::DELETE, http::Method::POST] {
        let response = service
            .handle(signed_request(method.clone(), "/bucket/object", b"", &[]))
            .await;
        assert_eq!(
            response.status(),
            http::StatusCode::NOT_IMPLEMENTED,
            "method: {method}"
        );
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_reject_tampered_signature() {
    let service = service();

    let response = service
        .handle(
            http::Request::builder()
                .method(http::Method::PUT)
                .uri("/bucket")
                .header(http::header::DATE, http_date_now())
                .header(
                    http::header::AUTHORIZATION,
                    format!("AWS {ACCESS_KEY}:bm90LWEtcmVhbC1zaWduYXR1cmU="),
                )
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body)
        .unwrap()
        .contains("<Code>AccessDenied</Code>"));
}

#[tokio::test]
async fn test_should_reject_stale_request_date() {
    let service = service();

    let request = http::Request::builder()
        .method(http::Method::PUT)
        .uri("/bucket")
        .header(http::header::DATE, "Sat, 28 Feb 2015 12:00:00 GMT")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (mut parts, body) = request.into_parts();
    let authorization = sign_request(&parts, ACCESS_KEY, SECRET_KEY);
    parts
        .headers
        .insert(http::header::AUTHORIZATION, authorization.parse().unwrap());

    let response = service
        .handle(http::Request::from_parts(parts, body))
        .await;

    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body)
        .unwrap()
        .contains("<Code>RequestTimeTooSkewed</Code>"));
}

#[tokio::test]
async fn test_should_allow_anonymous_read_of_public_bucket() {
    let service = service();
    create_bucket(&service, "public", "public-read").await;
    put_object(&service, "public", "object", b"open data").await;

    let response = service
        .handle(anonymous_request(http::Method::GET, "/public/object"))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"open data");

    let response = service
        .handle(anonymous_request(http::Method::HEAD, "/public/object"))
        .await;
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn test_should_deny_anonymous_read_of_private_bucket() {
    let service = service();
    create_bucket(&service, "secret", "private").await;
    put_object(&service, "secret", "object", b"hidden").await;

    let response = service
        .handle(anonymous_request(http::Method::GET, "/secret/object"))
        .await;
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_should_deny_anonymous_writes() {
    let service = service();
    create_bucket(&service, "public", "public-read-write").await;

    // Anonymous requests only reach object reads; writes always need a
    // signature.
    let response = service
        .handle(anonymous_request(http::Method::PUT, "/public/object"))
        .await;
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);

    let response = service
        .handle(anonymous_request(http::Method::GET, "/"))
        .await;
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Round-trip property
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_should_round_trip_bodies_of_varied_sizes() {
    let service = service();
    create_bucket(&service, "bucket", "private").await;

    for (i, size) in [1usize, 63, 64, 65, 4096, 100_000].into_iter().enumerate() {
        let payload: Vec<u8> = (0..size).map(|n| (n * 7 + i) as u8).collect();
        let key = format!("blob-{i}");
        let expected_etag = format!("\"{}\"", hex::encode(Md5::digest(&payload)));

        let response = service
            .handle(signed_request(
                http::Method::PUT,
                &format!("/bucket/{key}"),
                &payload,
                &[],
            ))
            .await;
        assert_eq!(response.status(), http::StatusCode::OK, "put size {size}");
        assert_eq!(header(&response, "etag"), Some(expected_etag.as_str()));

        let response = service
            .handle(signed_request(
                http::Method::GET,
                &format!("/bucket/{key}"),
                b"",
                &[],
            ))
            .await;
        assert_eq!(response.status(), http::StatusCode::OK, "get size {size}");
        assert_eq!(
            header(&response, "content-length"),
            Some(size.to_string().as_str()),
        );
        assert_eq!(body_bytes(response).await.as_ref(), payload.as_slice());
    }
}
