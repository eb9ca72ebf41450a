use crate::api::AppState;
use crate::auth::token;
use crate::events::RequestEvent;
use crate::meta::keypath;
use crate::meta::models::{ObjectHead, PartHead};
use crate::meta::repos::{ObjectWrite, UploadListFilter};
use crate::s3::errors::{s3_error, S3Error};
use crate::util::time;
use axum::body::{to_bytes, Body, Bytes};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, FromRequestParts, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use md5::{Digest, Md5};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

pub mod errors;
pub mod xml;

const DEFAULT_MAX_KEYS: i64 = 1000;

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", any(request_handler))
        .route("/{*path}", any(request_handler))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .with_state(state.clone());
    if !state.config.cors_allow_origins.is_empty() {
        router = router.layer(build_cors(&state.config.cors_allow_origins));
    }
    router
}

async fn request_handler(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();
    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let headers = parts.headers.clone();
    let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &state)
        .await
        .ok();

    // Observer sockets bypass dispatch entirely.
    if let Some(upgrade) = upgrade {
        let hub = state.activity.clone();
        return upgrade.on_upgrade(move |socket| async move { hub.run_socket(socket).await });
    }

    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let query = uri.query().unwrap_or_default().to_string();
    let query_map: HashMap<String, String> =
        serde_urlencoded::from_str(&query).unwrap_or_default();
    let target = parse_bucket_key(uri.path());
    let op = detect_s3_operation(&method, &target, &headers, &query_map);

    let mut response =
        match dispatch(&state, target.as_ref(), &method, &headers, &query_map, body).await {
            Ok(response) => response,
            Err(err) => s3_error(err, &request_id),
        };
    stamp_request_id(&mut response, &request_id);
    record_s3_request(&state, op, response.status());
    broadcast_event(&state, &method, uri.path(), &query, response.status(), started).await;
    response
}

struct RequestTarget {
    bucket: String,
    key: String,
}

/// First non-empty path segment is the bucket; everything after the next
/// `/` (trailing slashes included) is the key, percent-decoded once.
fn parse_bucket_key(path: &str) -> Option<RequestTarget> {
    let trimmed = path.trim_start_matches('/');
    let mut parts = trimmed.splitn(2, '/');
    let bucket = parts.next().unwrap_or("");
    if bucket.is_empty() {
        return None;
    }
    let raw_key = parts.next().unwrap_or("");
    Some(RequestTarget {
        bucket: bucket.to_string(),
        key: percent_decode_str(raw_key).decode_utf8_lossy().to_string(),
    })
}

async fn dispatch(
    state: &AppState,
    target: Option<&RequestTarget>,
    method: &Method,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    body: Body,
) -> Result<Response, S3Error> {
    let Some(target) = target else {
        return Err(S3Error::NoSuchBucket);
    };
    authenticate_request(state, headers, &target.bucket)?;
    if target.key.is_empty() {
        return dispatch_bucket(state, target, method, query).await;
    }
    dispatch_object(state, target, method, headers, query, body).await
}

fn authenticate_request(
    state: &AppState,
    headers: &HeaderMap,
    bucket: &str,
) -> Result<(), S3Error> {
    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or(S3Error::Unauthorized)?;
    let raw_token = token::extract_token(header).ok_or(S3Error::Unauthorized)?;
    if state.verifier.is_dev_token(raw_token) {
        return Ok(());
    }
    let claims = state
        .verifier
        .verify(raw_token)
        .map_err(|_| S3Error::Unauthorized)?;
    if claims.bucket != bucket {
        return Err(S3Error::Forbidden);
    }
    Ok(())
}

async fn dispatch_bucket(
    state: &AppState,
    target: &RequestTarget,
    method: &Method,
    query: &HashMap<String, String>,
) -> Result<Response, S3Error> {
    if *method == Method::HEAD {
        // Bucket existence is not tracked separately.
        return Ok((StatusCode::OK, "").into_response());
    }
    if *method == Method::GET && query.contains_key("uploads") {
        return list_multipart_uploads(state, target, query).await;
    }
    if *method == Method::GET {
        return list_objects_v2(state, target, query).await;
    }
    Err(S3Error::NotImplemented)
}

async fn dispatch_object(
    state: &AppState,
    target: &RequestTarget,
    method: &Method,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    body: Body,
) -> Result<Response, S3Error> {
    if *method == Method::GET {
        return get_object(state, target).await;
    }
    if *method == Method::HEAD {
        return head_object(state, target).await;
    }
    if *method == Method::POST && query.contains_key("uploads") {
        return create_multipart_upload(state, target, headers).await;
    }
    if *method == Method::PUT
        && query.contains_key("uploadId")
        && query.contains_key("partNumber")
    {
        return upload_part(state, target, query, body).await;
    }
    if *method == Method::POST && query.contains_key("uploadId") {
        return complete_multipart_upload(state, target, query, body).await;
    }
    if *method == Method::DELETE && query.contains_key("uploadId") {
        return abort_multipart_upload(state, query).await;
    }
    if *method == Method::PUT && headers.contains_key("x-amz-copy-source") {
        return copy_object(state, target, headers).await;
    }
    if *method == Method::PUT {
        return put_object(state, target, headers, body).await;
    }
    if *method == Method::DELETE {
        return delete_object(state, target).await;
    }
    Err(S3Error::NotImplemented)
}

async fn put_object(
    state: &AppState,
    target: &RequestTarget,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, S3Error> {
    let data = read_body_limited(body, state.config.body_limit_bytes).await?;
    let etag = md5_hex(&data);
    let content_type = extract_content_type(headers);
    let last_modified = time::iso8601(time::now_utc());
    let write = ObjectWrite {
        bucket: &target.bucket,
        key: &target.key,
        etag: &etag,
        content_type: &content_type,
        last_modified: &last_modified,
        data: &data,
    };
    state.repo.put_object(&write).await.map_err(internal_error)?;
    record_s3_bytes_in(state, "PutObject", data.len() as u64);
    Ok(etag_response(&etag))
}

async fn get_object(state: &AppState, target: &RequestTarget) -> Result<Response, S3Error> {
    let head = load_object_head(state, target).await?;
    let data = state
        .repo
        .get_object_data(&target.bucket, &target.key)
        .await
        .map_err(internal_error)?
        .ok_or(S3Error::NoSuchKey)?;
    record_s3_bytes_out(state, "GetObject", data.len() as u64);
    let mut response = (StatusCode::OK, data).into_response();
    set_object_headers(&mut response, &head);
    Ok(response)
}

async fn head_object(state: &AppState, target: &RequestTarget) -> Result<Response, S3Error> {
    let head = load_object_head(state, target).await?;
    let mut response = (StatusCode::OK, "").into_response();
    set_object_headers(&mut response, &head);
    Ok(response)
}

async fn load_object_head(
    state: &AppState,
    target: &RequestTarget,
) -> Result<ObjectHead, S3Error> {
    state
        .repo
        .get_object_head(&target.bucket, &target.key)
        .await
        .map_err(internal_error)?
        .ok_or(S3Error::NoSuchKey)
}

async fn delete_object(state: &AppState, target: &RequestTarget) -> Result<Response, S3Error> {
    state
        .repo
        .delete_object(&target.bucket, &target.key)
        .await
        .map_err(internal_error)?;
    Ok((StatusCode::NO_CONTENT, "").into_response())
}

async fn copy_object(
    state: &AppState,
    target: &RequestTarget,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let source = headers
        .get("x-amz-copy-source")
        .and_then(|value| value.to_str().ok())
        .ok_or(S3Error::InvalidArgument)?;
    let (src_bucket, src_key) = parse_copy_source(source).ok_or(S3Error::InvalidArgument)?;
    if src_bucket != target.bucket {
        // Cross-bucket copy is unsupported.
        return Err(S3Error::InvalidArgument);
    }
    let last_modified = time::iso8601(time::now_utc());
    let copied = state
        .repo
        .copy_object(&target.bucket, &src_key, &target.key, &last_modified)
        .await
        .map_err(internal_error)?
        .ok_or(S3Error::NoSuchKey)?;
    Ok(xml_ok_response(xml::copy_object_result(
        &copied.etag,
        &last_modified,
    )))
}

fn parse_copy_source(value: &str) -> Option<(String, String)> {
    let trimmed = value.strip_prefix('/').unwrap_or(value);
    let (bucket, raw_key) = trimmed.split_once('/')?;
    if bucket.is_empty() {
        return None;
    }
    Some((
        bucket.to_string(),
        percent_decode_str(raw_key).decode_utf8_lossy().to_string(),
    ))
}

async fn create_multipart_upload(
    state: &AppState,
    target: &RequestTarget,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let upload_id = Uuid::new_v4().to_string();
    let content_type = extract_content_type(headers);
    state
        .repo
        .create_multipart_upload(
            &upload_id,
            &target.bucket,
            &target.key,
            &content_type,
            &time::iso8601(time::now_utc()),
        )
        .await
        .map_err(internal_error)?;
    Ok(xml_ok_response(xml::initiate_multipart_upload(
        &target.bucket,
        &target.key,
        &upload_id,
    )))
}

async fn upload_part(
    state: &AppState,
    target: &RequestTarget,
    query: &HashMap<String, String>,
    body: Body,
) -> Result<Response, S3Error> {
    let upload_id = query.get("uploadId").ok_or(S3Error::InvalidArgument)?;
    let part_number: i64 = query
        .get("partNumber")
        .and_then(|value| value.parse().ok())
        .ok_or(S3Error::InvalidArgument)?;
    ensure_upload_matches(state, target, upload_id).await?;
    let data = read_body_limited(body, state.config.body_limit_bytes).await?;
    let etag = md5_hex(&data);
    state
        .repo
        .put_part(upload_id, part_number, &etag, &data)
        .await
        .map_err(internal_error)?;
    record_s3_bytes_in(state, "UploadPart", data.len() as u64);
    Ok(etag_response(&etag))
}

async fn complete_multipart_upload(
    state: &AppState,
    target: &RequestTarget,
    query: &HashMap<String, String>,
    body: Body,
) -> Result<Response, S3Error> {
    let upload_id = query.get("uploadId").ok_or(S3Error::InvalidArgument)?;
    let upload = ensure_upload_matches(state, target, upload_id).await?;
    // The request body names parts, but completion always covers every
    // stored part in part-number order.
    let _ = read_body_limited(body, state.config.body_limit_bytes).await?;
    let parts = state
        .repo
        .list_part_heads(upload_id)
        .await
        .map_err(internal_error)?;
    if parts.is_empty() {
        return Err(S3Error::InvalidPart);
    }
    let etag = multipart_etag(&parts)?;
    let last_modified = time::iso8601(time::now_utc());
    state
        .repo
        .assemble_upload(&upload, &etag, &last_modified)
        .await
        .map_err(internal_error)?;
    Ok(xml_ok_response(xml::complete_multipart_upload(
        &upload.bucket,
        &upload.key,
        &etag,
    )))
}

async fn abort_multipart_upload(
    state: &AppState,
    query: &HashMap<String, String>,
) -> Result<Response, S3Error> {
    let upload_id = query.get("uploadId").ok_or(S3Error::InvalidArgument)?;
    state
        .repo
        .abort_multipart_upload(upload_id)
        .await
        .map_err(internal_error)?;
    Ok((StatusCode::NO_CONTENT, "").into_response())
}

async fn ensure_upload_matches(
    state: &AppState,
    target: &RequestTarget,
    upload_id: &str,
) -> Result<crate::meta::models::MultipartUpload, S3Error> {
    let upload = state
        .repo
        .get_multipart_upload(upload_id)
        .await
        .map_err(internal_error)?
        .ok_or(S3Error::NoSuchUpload)?;
    if upload.bucket == target.bucket && upload.key == target.key {
        Ok(upload)
    } else {
        Err(S3Error::NoSuchUpload)
    }
}

/// Synthetic multipart ETag: MD5 over the concatenated part digests,
/// suffixed with the part count.
fn multipart_etag(parts: &[PartHead]) -> Result<String, S3Error> {
    let mut md5_concat = Vec::new();
    for part in parts {
        let digest =
            hex::decode(part.etag.trim_matches('"')).map_err(|_| S3Error::InvalidPart)?;
        md5_concat.extend_from_slice(&digest);
    }
    Ok(format!("{:x}-{}", Md5::digest(&md5_concat), parts.len()))
}

async fn list_multipart_uploads(
    state: &AppState,
    target: &RequestTarget,
    query: &HashMap<String, String>,
) -> Result<Response, S3Error> {
    let prefix = query.get("prefix").map(String::as_str).unwrap_or("");
    let key_marker = query.get("key-marker").map(String::as_str);
    let upload_id_marker = query.get("upload-id-marker").map(String::as_str);
    let max_uploads = parse_limit(query, "max-uploads");
    let filter = UploadListFilter {
        bucket: &target.bucket,
        prefix,
        key_marker,
        // The marker pair only addresses an exact row when both halves are
        // present; a lone upload-id marker is meaningless.
        upload_id_marker: key_marker.and(upload_id_marker),
    };
    let mut uploads = state
        .repo
        .list_multipart_uploads(&filter, max_uploads + 1)
        .await
        .map_err(internal_error)?;
    let is_truncated = uploads.len() as i64 > max_uploads;
    if is_truncated {
        uploads.truncate(max_uploads.max(0) as usize);
    }
    let (next_key_marker, next_upload_id_marker) = if is_truncated {
        uploads
            .last()
            .map(|upload| (Some(upload.key.clone()), Some(upload.upload_id.clone())))
            .unwrap_or((None, None))
    } else {
        (None, None)
    };
    Ok(xml_ok_response(xml::list_multipart_uploads_result(
        &xml::ListUploadsArgs {
            bucket: &target.bucket,
            prefix,
            uploads: &uploads,
            max_uploads,
            is_truncated,
            next_key_marker: next_key_marker.as_deref(),
            next_upload_id_marker: next_upload_id_marker.as_deref(),
        },
    )))
}

struct ListRequest<'a> {
    prefix: &'a str,
    delimiter: &'a str,
    marker: &'a str,
    max_keys: i64,
}

fn parse_list_request(query: &HashMap<String, String>) -> ListRequest<'_> {
    ListRequest {
        prefix: query.get("prefix").map(String::as_str).unwrap_or(""),
        delimiter: query.get("delimiter").map(String::as_str).unwrap_or(""),
        marker: query
            .get("continuation-token")
            .or_else(|| query.get("start-after"))
            .map(String::as_str)
            .unwrap_or(""),
        max_keys: parse_limit(query, "max-keys"),
    }
}

fn parse_limit(query: &HashMap<String, String>, name: &str) -> i64 {
    query
        .get(name)
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(DEFAULT_MAX_KEYS)
        .max(0)
}

enum ListEntry {
    Object(ObjectHead),
    Prefix(String),
}

fn entry_key(entry: &ListEntry) -> &str {
    match entry {
        ListEntry::Object(head) => &head.key,
        ListEntry::Prefix(prefix) => prefix,
    }
}

struct ListPage {
    entries: Vec<ListEntry>,
    is_truncated: bool,
    next_token: Option<String>,
}

async fn list_objects_v2(
    state: &AppState,
    target: &RequestTarget,
    query: &HashMap<String, String>,
) -> Result<Response, S3Error> {
    let request = parse_list_request(query);
    let page = if request.delimiter == "/" {
        list_slash_delimited(state, &target.bucket, &request).await?
    } else if request.delimiter.is_empty() {
        list_undelimited(state, &target.bucket, &request).await?
    } else {
        list_generic_delimited(state, &target.bucket, &request).await?
    };
    let (contents, common_prefixes) = split_entries(page.entries);
    Ok(xml_ok_response(xml::list_bucket_result(
        &xml::ListBucketArgs {
            bucket: &target.bucket,
            prefix: request.prefix,
            delimiter: request.delimiter,
            contents: &contents,
            common_prefixes: &common_prefixes,
            max_keys: request.max_keys,
            is_truncated: page.is_truncated,
            next_token: page.next_token.as_deref(),
        },
    )))
}

/// Fast path: direct children come off the exact-parent index, and the
/// first-level directories come from a distinct scan of the parent column.
async fn list_slash_delimited(
    state: &AppState,
    bucket: &str,
    request: &ListRequest<'_>,
) -> Result<ListPage, S3Error> {
    let upper = keypath::prefix_upper_bound(request.prefix);
    let parents = state
        .repo
        .list_distinct_parents(bucket, request.prefix, upper.as_deref(), request.marker)
        .await
        .map_err(internal_error)?;
    let target_depth = keypath::depth(request.prefix) + 1;
    let mut entries: Vec<ListEntry> = parents
        .into_iter()
        .filter(|parent| {
            parent.starts_with(request.prefix) && keypath::depth(parent) == target_depth
        })
        .map(ListEntry::Prefix)
        .collect();
    let children = state
        .repo
        .list_child_heads(bucket, request.prefix, request.marker, request.max_keys + 1)
        .await
        .map_err(internal_error)?;
    entries.extend(children.into_iter().map(ListEntry::Object));
    entries.sort_by(|left, right| entry_key(left).cmp(entry_key(right)));
    Ok(paginate_entries(entries, request.max_keys))
}

async fn list_undelimited(
    state: &AppState,
    bucket: &str,
    request: &ListRequest<'_>,
) -> Result<ListPage, S3Error> {
    let upper = keypath::prefix_upper_bound(request.prefix);
    let rows = state
        .repo
        .list_key_range(
            bucket,
            request.prefix,
            upper.as_deref(),
            request.marker,
            request.max_keys + 1,
        )
        .await
        .map_err(internal_error)?;
    let entries = rows.into_iter().map(ListEntry::Object).collect();
    Ok(paginate_entries(entries, request.max_keys))
}

/// Generic delimiters over-fetch the key range and collapse groups while
/// walking it in order.
async fn list_generic_delimited(
    state: &AppState,
    bucket: &str,
    request: &ListRequest<'_>,
) -> Result<ListPage, S3Error> {
    let fetch_limit = request.max_keys * 10 + 1;
    let upper = keypath::prefix_upper_bound(request.prefix);
    let rows = state
        .repo
        .list_key_range(
            bucket,
            request.prefix,
            upper.as_deref(),
            request.marker,
            fetch_limit,
        )
        .await
        .map_err(internal_error)?;
    let fetched = rows.len() as i64;

    let mut entries: Vec<ListEntry> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut stopped_early = false;
    let mut consumed = 0i64;
    for head in rows {
        let Some(tail) = head.key.strip_prefix(request.prefix) else {
            consumed += 1;
            continue;
        };
        if let Some(idx) = tail.find(request.delimiter) {
            let common = format!(
                "{}{}",
                request.prefix,
                &tail[..idx + request.delimiter.len()]
            );
            let already_seen = entries
                .iter()
                .any(|entry| matches!(entry, ListEntry::Prefix(seen) if *seen == common));
            if !already_seen {
                if entries.len() as i64 == request.max_keys {
                    stopped_early = true;
                    break;
                }
                entries.push(ListEntry::Prefix(common));
            }
            cursor = Some(head.key.clone());
        } else {
            if entries.len() as i64 == request.max_keys {
                stopped_early = true;
                break;
            }
            cursor = Some(head.key.clone());
            entries.push(ListEntry::Object(head));
        }
        consumed += 1;
    }

    let exhausted_overfetch = consumed == fetched && fetched == fetch_limit;
    let is_truncated = stopped_early || exhausted_overfetch;
    let next_token = if is_truncated { cursor } else { None };
    Ok(ListPage {
        entries,
        is_truncated,
        next_token,
    })
}

fn paginate_entries(mut entries: Vec<ListEntry>, max_keys: i64) -> ListPage {
    let is_truncated = entries.len() as i64 > max_keys;
    if is_truncated {
        entries.truncate(max_keys.max(0) as usize);
    }
    let next_token = if is_truncated {
        entries.last().map(|entry| entry_key(entry).to_string())
    } else {
        None
    };
    ListPage {
        entries,
        is_truncated,
        next_token,
    }
}

fn split_entries(entries: Vec<ListEntry>) -> (Vec<ObjectHead>, Vec<String>) {
    let mut contents = Vec::new();
    let mut prefixes = Vec::new();
    for entry in entries {
        match entry {
            ListEntry::Object(head) => contents.push(head),
            ListEntry::Prefix(prefix) => prefixes.push(prefix),
        }
    }
    (contents, prefixes)
}

async fn read_body_limited(body: Body, limit: usize) -> Result<Bytes, S3Error> {
    to_bytes(body, limit)
        .await
        .map_err(|_| S3Error::InvalidArgument)
}

fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

fn extract_content_type(headers: &HeaderMap) -> String {
    headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn internal_error(err: sqlx::Error) -> S3Error {
    tracing::error!(error = %err, "store operation failed");
    S3Error::InternalError
}

fn xml_ok_response(body: String) -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "application/xml")],
        body,
    )
        .into_response()
}

fn etag_response(etag: &str) -> Response {
    (StatusCode::OK, [("ETag", format!("\"{}\"", etag))], "").into_response()
}

fn set_object_headers(response: &mut Response, head: &ObjectHead) {
    insert_header(response, "Content-Type", &head.content_type);
    insert_header(response, "Content-Length", &head.size.to_string());
    insert_header(response, "ETag", &format!("\"{}\"", head.etag));
    let last_modified = time::parse_iso8601(&head.last_modified)
        .map(time::http_date)
        .unwrap_or_else(|| head.last_modified.clone());
    insert_header(response, "Last-Modified", &last_modified);
}

fn insert_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}

fn stamp_request_id(response: &mut Response, request_id: &str) {
    insert_header(response, "x-amz-request-id", request_id);
}

async fn broadcast_event(
    state: &AppState,
    method: &Method,
    path: &str,
    query: &str,
    status: StatusCode,
    started: Instant,
) {
    let path = if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    };
    let event = RequestEvent {
        method: method.to_string(),
        path,
        status: status.as_u16(),
        duration: started.elapsed().as_millis() as u64,
        timestamp: time::iso8601(time::now_utc()),
    };
    state.activity.broadcast(&event).await;
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let list = origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn detect_s3_operation(
    method: &Method,
    target: &Option<RequestTarget>,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> &'static str {
    let Some(target) = target else {
        return "Unknown";
    };
    if target.key.is_empty() {
        return detect_bucket_operation(method, query);
    }
    detect_object_operation(method, headers, query)
}

fn detect_bucket_operation(method: &Method, query: &HashMap<String, String>) -> &'static str {
    if *method == Method::HEAD {
        return "HeadBucket";
    }
    if *method == Method::GET && query.contains_key("uploads") {
        return "ListMultipartUploads";
    }
    if *method == Method::GET {
        return "ListObjectsV2";
    }
    "Unknown"
}

fn detect_object_operation(
    method: &Method,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> &'static str {
    if *method == Method::POST && query.contains_key("uploads") {
        return "CreateMultipartUpload";
    }
    if query.contains_key("uploadId") {
        if *method == Method::PUT && query.contains_key("partNumber") {
            return "UploadPart";
        }
        if *method == Method::POST {
            return "CompleteMultipartUpload";
        }
        if *method == Method::DELETE {
            return "AbortMultipartUpload";
        }
    }
    if *method == Method::GET {
        return "GetObject";
    }
    if *method == Method::HEAD {
        return "HeadObject";
    }
    if *method == Method::PUT && headers.contains_key("x-amz-copy-source") {
        return "CopyObject";
    }
    if *method == Method::PUT {
        return "PutObject";
    }
    if *method == Method::DELETE {
        return "DeleteObject";
    }
    "Unknown"
}

fn record_s3_request(state: &AppState, op: &str, status: StatusCode) {
    let status_label = status.as_u16().to_string();
    state
        .metrics
        .s3_requests
        .with_label_values(&[op, &status_label])
        .inc();
}

fn record_s3_bytes_in(state: &AppState, op: &str, size: u64) {
    state.metrics.s3_bytes_in.with_label_values(&[op]).inc_by(size);
}

fn record_s3_bytes_out(state: &AppState, op: &str, size: u64) {
    state.metrics.s3_bytes_out.with_label_values(&[op]).inc_by(size);
}
