//! Minimal HTTP/1.1 surface over tokio: one task per connection, one request
//! per connection, JSON in and out.

use crate::error::{QnaError, Result};
use crate::intent::QuestionRequest;
use crate::pipeline::QaPipeline;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Requests larger than this are cut off and answered with 400.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub pipeline: QaPipeline,
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status, body },
            Err(e) => Self::detail(500, format!("Failed to encode response: {}", e)),
        }
    }

    pub fn detail(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": message.into() }).to_string(),
        }
    }

    pub fn render(&self) -> String {
        create_response(self.status, status_text(self.status), &self.body)
    }
}

/// HTTP status for a pipeline failure.
pub fn status_for(error: &QnaError) -> u16 {
    match error {
        QnaError::Validation(_) => 400,
        QnaError::Execution(_) => 422,
        QnaError::Format { .. } | QnaError::Llm(_) => 502,
        _ => 500,
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        502 => "Bad Gateway",
        _ => "Internal Server Error",
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}

fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Read one request: the header block, then `Content-Length` bytes of body.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    loop {
        let size = reader.read(&mut chunk).await?;
        if size == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..size]);
        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }
        if let Some(end) = header_end(&buffer) {
            let head = String::from_utf8_lossy(&buffer[..end]);
            if buffer.len() >= end + content_length(&head) {
                break;
            }
        }
    }
    Ok(buffer)
}

pub fn parse_request(raw: &[u8]) -> Option<HttpRequest> {
    let end = header_end(raw)?;
    let head = String::from_utf8_lossy(&raw[..end]);
    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?.to_uppercase();
    let target = parts.next()?;

    // Drop the query string and any trailing slash except for root.
    let path = target.split('?').next().unwrap_or(target).trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    let length = content_length(&head).min(raw.len() - end);
    let body = String::from_utf8_lossy(&raw[end..end + length]).to_string();

    Some(HttpRequest {
        method,
        path: path.to_string(),
        body,
    })
}

pub async fn route(state: &AppState, request: &HttpRequest) -> HttpResponse {
    debug!("Request: {} {}", request.method, request.path);
    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => HttpResponse {
            status: 204,
            body: String::new(),
        },
        ("GET", "/api/health") => HttpResponse::json(
            200,
            &json!({
                "status": "ok",
                "service": state.title,
                "version": state.version,
            }),
        ),
        ("POST", "/api/questions") => answer_question(state, &request.body).await,
        _ => HttpResponse::detail(404, format!("No route for {} {}", request.method, request.path)),
    }
}

async fn answer_question(state: &AppState, body: &str) -> HttpResponse {
    let request: QuestionRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return HttpResponse::detail(400, format!("Invalid request body: {}", e)),
    };
    let question = request.question.trim();
    if question.is_empty() {
        return HttpResponse::detail(400, "The question must not be empty");
    }

    match state.pipeline.run(question).await {
        Ok(answer) => HttpResponse::json(200, &answer),
        Err(e) => {
            let status = status_for(&e);
            warn!("Question failed with {}: {}", status, e);
            HttpResponse::detail(status, e.to_string())
        }
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let response = match read_request(&mut stream).await {
        Ok(raw) if raw.len() > MAX_REQUEST_BYTES => HttpResponse::detail(400, "Request too large"),
        Ok(raw) => match parse_request(&raw) {
            Some(request) => route(&state, &request).await,
            None => HttpResponse::detail(400, "Malformed HTTP request"),
        },
        Err(e) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
    };

    if let Err(e) = stream.write_all(response.render().as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("New connection from {}", peer);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RejectReason, ValidationError};

    #[test]
    fn test_parse_request_reads_body_and_normalises_path() {
        let raw = b"POST /api/questions/?debug=1 HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello extra";
        let request = parse_request(raw).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/questions");
        assert_eq!(request.body, "hello");
    }

    #[test]
    fn test_parse_request_rejects_incomplete_head() {
        assert!(parse_request(b"GET /api/health HTTP/1.1\r\nHost: x").is_none());
    }

    #[tokio::test]
    async fn test_read_request_stops_after_body() {
        let raw: &[u8] = b"POST / HTTP/1.1\r\ncontent-length: 2\r\n\r\n{}";
        let mut reader = raw;
        let bytes = read_request(&mut reader).await.unwrap();
        assert_eq!(bytes, raw);
    }

    #[test]
    fn test_status_mapping() {
        let rejected = QnaError::Validation(ValidationError::new(RejectReason::ForbiddenKeyword, "drop"));
        assert_eq!(status_for(&rejected), 400);
        assert_eq!(status_for(&QnaError::Execution("boom".to_string())), 422);
        assert_eq!(
            status_for(&QnaError::Format { message: "bad".to_string(), snippet: String::new() }),
            502
        );
        assert_eq!(status_for(&QnaError::Llm("down".to_string())), 502);
        assert_eq!(status_for(&QnaError::Config("x".to_string())), 500);
    }

    #[test]
    fn test_rendered_response_carries_length() {
        let rendered = HttpResponse::detail(404, "nope").render();
        assert!(rendered.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(rendered.contains("Content-Length: 17\r\n"));
        assert!(rendered.ends_with(r#"{"detail":"nope"}"#));
    }
}
