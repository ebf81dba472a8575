//! HTTP adapter for the generation service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};

use super::{ArchitectureRequest, EnhanceRequest, GenerationReply, Generator, IssueRequest, RawReply};

/// Generation service reached over HTTP with JSON bodies.
pub struct HttpGenerator {
    config: GenerationConfig,
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpGenerator {
    /// Create a client from configuration.
    ///
    /// A bearer token is attached when one is configured.
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = config.resolved_token() {
            let auth_value = format!("Bearer {}", token.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid auth_token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            base_url,
        })
    }

    /// Full URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_once<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<RawReply> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json::<RawReply>()
                .await
                .map_err(|e| Error::MalformedReply(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Generation {
                status: Some(status.as_u16()),
                message: error_text,
            })
        }
    }

    /// POST with retry
    ///
    /// Retries transient failures (5xx, transport errors) with exponential backoff.
    /// A malformed 2xx body is returned at once.
    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<RawReply> {
        let url = self.endpoint(path);
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    url = %url,
                    "Retrying generation request (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.post_once(&url, body).await {
                Ok(reply) => return Ok(reply),
                Err(e) if is_retryable_error(&e) => {
                    tracing::warn!(url = %url, error = %e, "Transient generation failure");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::generation("max retries exceeded")))
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn ask_architecture(&self, request: &ArchitectureRequest) -> Result<GenerationReply> {
        self.post(&self.config.architecture_path, request)
            .await?
            .into_chat_reply()
    }

    async fn ask_issue(&self, request: &IssueRequest) -> Result<GenerationReply> {
        self.post(&self.config.issue_path, request)
            .await?
            .into_chat_reply()
    }

    async fn enhance_prompt(&self, request: &EnhanceRequest) -> Result<GenerationReply> {
        self.post(&self.config.enhance_path, request)
            .await?
            .into_enhanced_reply()
    }
}

/// Transport failures and 5xx responses are worth another attempt.
/// Malformed bodies are not: the service answered and would answer the same.
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Generation { status: None, .. } => true,
        Error::Generation {
            status: Some(code), ..
        } => *code >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = GenerationConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(HttpGenerator::new(config).is_err());
    }

    #[test]
    fn test_client_with_token() {
        let config = GenerationConfig {
            base_url: "https://arch.example.com/".to_string(),
            auth_token: Some("tok_123".to_string()),
            ..Default::default()
        };
        let client = HttpGenerator::new(config).unwrap();
        assert_eq!(
            client.endpoint("/chat/ask/"),
            "https://arch.example.com/chat/ask/"
        );
        assert_eq!(
            client.endpoint("issues/chat"),
            "https://arch.example.com/issues/chat"
        );
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::generation(
            "HTTP request failed: connection refused"
        )));
        assert!(is_retryable_error(&Error::Generation {
            status: Some(503),
            message: "unavailable".to_string(),
        }));
        assert!(!is_retryable_error(&Error::Generation {
            status: Some(400),
            message: "bad request".to_string(),
        }));
        assert!(!is_retryable_error(&Error::MalformedReply(
            "failed to parse response".to_string()
        )));
        assert!(!is_retryable_error(&Error::Validation("x".to_string())));
    }

    /// Serve `body` with status 200 to every request, counting requests.
    async fn serve_ok(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    /// Read one request: headers, then `Content-Length` bytes of body.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let (base_url, hits) = serve_ok("<html>not json</html>").await;
        let config = GenerationConfig {
            base_url,
            max_retries: 2,
            ..Default::default()
        };
        let client = HttpGenerator::new(config).unwrap();

        let result = client
            .ask_architecture(&ArchitectureRequest::new("design", "p1"))
            .await;
        assert!(matches!(result, Err(Error::MalformedReply(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reply_without_text_is_malformed() {
        let (base_url, hits) = serve_ok(r#"{"status":"ok"}"#).await;
        let client = HttpGenerator::new(GenerationConfig {
            base_url,
            ..Default::default()
        })
        .unwrap();

        let result = client
            .ask_issue(&IssueRequest {
                message: "q".to_string(),
                project_id: "p1".to_string(),
                context: None,
                history: vec![],
            })
            .await;
        assert!(matches!(result, Err(Error::MalformedReply(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_generation_error() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = HttpGenerator::new(config).unwrap();
        let result = client
            .ask_architecture(&ArchitectureRequest::new("design", "p1"))
            .await;
        assert!(matches!(result, Err(Error::Generation { .. })));
    }
}
