//! 静态文件处理器
//!
//! 单一路由：任意路径都映射到静态目录下的文件。
//! 支持 GET/HEAD、目录默认文件、条件请求（ETag / Last-Modified）和单段 Range。

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode, Uri};
use sha2::{Digest, Sha256};

use super::mime_types;

/// 处理结果之外的几种拒绝方式
#[derive(Debug, PartialEq, Eq)]
enum Reject {
    Redirect(String),
    Status(StatusCode),
}

/// 解析后的 Range 请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// 没有 Range 或者忽略 Range，返回完整内容
    Full,
    /// 闭区间 [start, end]
    Partial { start: u64, end: u64 },
    /// 无法满足
    Unsatisfiable,
}

/// 静态文件处理器
#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    root: PathBuf,
    index_file: String,
}

impl StaticFileHandler {
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    /// 处理一个请求，总是返回一个响应
    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let method = req.method();
        if method != Method::GET && method != Method::HEAD {
            let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, false);
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }
        let head_only = method == Method::HEAD;

        match self.resolve(req.uri()).await {
            Ok((path, metadata)) => self.serve_file(req.headers(), &path, &metadata, head_only).await,
            Err(Reject::Redirect(location)) => redirect_response(&location, head_only),
            Err(Reject::Status(status)) => error_response(status, head_only),
        }
    }

    /// 把请求路径映射为静态目录下的文件
    async fn resolve(&self, uri: &Uri) -> Result<(PathBuf, Metadata), Reject> {
        let raw_path = uri.path();
        let decoded = urlencoding::decode(raw_path).map_err(|_| Reject::Status(StatusCode::BAD_REQUEST))?;
        if decoded.contains('\0') {
            return Err(Reject::Status(StatusCode::BAD_REQUEST));
        }

        let mut path = self.root.clone();
        for segment in normalize_segments(&decoded).map_err(Reject::Status)? {
            path.push(segment);
        }

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| Reject::Status(io_status(&e)))?;

        if metadata.is_dir() {
            if !raw_path.ends_with('/') {
                let mut location = format!("{}/", raw_path);
                if let Some(query) = uri.query() {
                    location.push('?');
                    location.push_str(query);
                }
                return Err(Reject::Redirect(location));
            }

            path.push(&self.index_file);
            let metadata = tokio::fs::metadata(&path).await.map_err(|e| Reject::Status(io_status(&e)))?;
            if !metadata.is_file() {
                return Err(Reject::Status(StatusCode::NOT_FOUND));
            }
            return Ok((path, metadata));
        }

        if !metadata.is_file() {
            return Err(Reject::Status(StatusCode::NOT_FOUND));
        }
        Ok((path, metadata))
    }

    async fn serve_file(
        &self,
        request_headers: &HeaderMap,
        path: &Path,
        metadata: &Metadata,
        head_only: bool,
    ) -> Response<Full<Bytes>> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => Bytes::from(content),
            Err(e) => return error_response(io_status(&e), head_only),
        };

        let total_len = content.len() as u64;
        let etag = format!("\"{}\"", hex::encode(Sha256::digest(&content)));
        let modified = metadata.modified().ok();

        if is_not_modified(request_headers, &etag, modified) {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NOT_MODIFIED;
            insert_validators(response.headers_mut(), &etag, modified);
            return response;
        }

        let range = request_headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .map(|v| parse_range(v, total_len))
            .unwrap_or(ByteRange::Full);

        let (status, body) = match range {
            ByteRange::Full => (StatusCode::OK, content),
            ByteRange::Partial { start, end } => (
                StatusCode::PARTIAL_CONTENT,
                content.slice(start as usize..=end as usize),
            ),
            ByteRange::Unsatisfiable => {
                let mut response = error_response(StatusCode::RANGE_NOT_SATISFIABLE, head_only);
                insert_header(
                    response.headers_mut(),
                    header::CONTENT_RANGE,
                    format!("bytes */{}", total_len),
                );
                return response;
            }
        };

        let mut headers = HeaderMap::new();
        insert_header(&mut headers, header::CONTENT_TYPE, mime_types::from_path(path));
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        insert_validators(&mut headers, &etag, modified);
        if let ByteRange::Partial { start, end } = range {
            insert_header(
                &mut headers,
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, total_len),
            );
        }

        build_response(status, headers, body, head_only)
    }
}

/// 规范化路径段；`..` 越过根目录时返回 403
fn normalize_segments(path: &str) -> Result<Vec<&str>, StatusCode> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StatusCode::FORBIDDEN);
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments)
}

/// 解析 `Range` 头，只支持单段字节范围，多段请求按完整内容返回
pub fn parse_range(value: &str, total_len: u64) -> ByteRange {
    let Some(range) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if range.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = range.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // 后缀形式 -n：最后 n 个字节
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || total_len == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: total_len.saturating_sub(suffix),
            end: total_len - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= total_len {
        return ByteRange::Unsatisfiable;
    }
    let last = total_len - 1;
    ByteRange::Partial {
        start,
        end: end.map_or(last, |end| end.min(last)),
    }
}

/// 条件请求判断：If-None-Match 优先，其次 If-Modified-Since
fn is_not_modified(headers: &HeaderMap, etag: &str, modified: Option<SystemTime>) -> bool {
    if let Some(value) = headers.get(header::IF_NONE_MATCH) {
        let Ok(value) = value.to_str() else {
            return false;
        };
        return value.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        });
    }

    let (Some(value), Some(modified)) = (headers.get(header::IF_MODIFIED_SINCE), modified) else {
        return false;
    };
    let Some(since) = value.to_str().ok().and_then(|v| httpdate::parse_http_date(v).ok()) else {
        return false;
    };
    unix_secs(modified) <= unix_secs(since)
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn insert_validators(headers: &mut HeaderMap, etag: &str, modified: Option<SystemTime>) {
    insert_header(headers, header::ETAG, etag.to_string());
    if let Some(modified) = modified {
        insert_header(headers, header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(name, value);
    }
}

fn build_response(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Bytes,
    head_only: bool,
) -> Response<Full<Bytes>> {
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
    let body = if head_only { Bytes::new() } else { body };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn html_page(status: StatusCode, detail: &str) -> Bytes {
    let reason = status.canonical_reason().unwrap_or("");
    Bytes::from(format!(
        "<html><head><title>{code} {reason}</title></head><body><h1>{code} {reason}</h1>{detail}</body></html>",
        code = status.as_u16(),
        reason = reason,
        detail = detail,
    ))
}

fn html_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers
}

/// 带简单 HTML 说明的错误响应
pub fn error_response(status: StatusCode, head_only: bool) -> Response<Full<Bytes>> {
    build_response(status, html_headers(), html_page(status, ""), head_only)
}

fn redirect_response(location: &str, head_only: bool) -> Response<Full<Bytes>> {
    let mut headers = html_headers();
    insert_header(&mut headers, header::LOCATION, location.to_string());
    let body = html_page(StatusCode::MOVED_PERMANENTLY, "");
    build_response(StatusCode::MOVED_PERMANENTLY, headers, body, head_only)
}

fn io_status(err: &std::io::Error) -> StatusCode {
    match err.kind() {
        std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        // 路径中间某一段是文件而不是目录
        std::io::ErrorKind::NotADirectory => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
