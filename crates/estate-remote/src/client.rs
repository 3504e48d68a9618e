//! # REST Client
//!
//! Typed access to the CRM REST API.
//!
//! ## Routes
//! ```text
//! ┌───────────────────────────────────────┬───────────────────────────────┐
//! │ GET    /health                        │ liveness (outside /api)       │
//! │ GET    /api/{entity}                  │ list                          │
//! │ GET    /api/{entity}/{id}             │ fetch one                     │
//! │ POST   /api/{entity}                  │ create                        │
//! │ PUT    /api/{entity}/{id}             │ update                        │
//! │ DELETE /api/{entity}/{id}             │ delete                        │
//! │ POST   /api/{entity}/bulk             │ create many (JSON array)      │
//! │ GET    /api/settings, PUT             │ settings singleton            │
//! │ GET    /api/backup/export             │ whole dataset                 │
//! │ POST   /api/backup/import             │ replace whole dataset         │
//! │ POST   /api/backup/clear              │ empty every collection        │
//! └───────────────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Each call is a single request bounded by the configured timeout.

use std::time::Duration;

use estate_core::EntityKind;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{RemoteError, RemoteResult};

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const API_PREFIX: &str = "api";

/// Longest server error body kept in [`RemoteError::Server`].
const MAX_ERROR_BODY: usize = 200;

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Server root, without the `/api` prefix.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        RemoteConfig {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    timeout_secs: u64,
}

impl RestClient {
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        if config.timeout_secs == 0 {
            return Err(RemoteError::InvalidConfig("timeout must be greater than 0".into()));
        }

        let base = Url::parse(config.base_url.trim())?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidUrl(format!(
                "expected http:// or https://, got {}",
                config.base_url
            )));
        }
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(config.base_url));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::InvalidConfig(e.to_string()))?;

        Ok(RestClient {
            http,
            base,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // =========================================================================
    // URL Building
    // =========================================================================

    fn url(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL of an API route: `{base}/api/{segments...}`.
    pub fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(API_PREFIX);
        all.extend_from_slice(segments);
        self.url(&all)
    }

    /// Liveness probe URL, outside the API prefix.
    pub fn health_url(&self) -> RemoteResult<Url> {
        self.url(&["health"])
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("error").to_string();
        }
        Err(RemoteError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Reads a JSON body. An empty body reads as `null`.
    async fn read_json(&self, response: Response) -> RemoteResult<Value> {
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::from_reqwest(e, self.timeout_secs))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn call(&self, method: Method, url: Url, body: Option<&Value>) -> RemoteResult<Value> {
        debug!(%method, %url, "REST request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(request).await?;
        self.read_json(response).await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// True when the server answers the liveness probe.
    pub async fn health(&self) -> bool {
        let url = match self.health_url() {
            Ok(url) => url,
            Err(_) => return false,
        };
        match self.send(self.http.get(url)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            }
        }
    }

    // =========================================================================
    // Entity CRUD
    // =========================================================================

    /// All records of one kind.
    ///
    /// Accepts a bare array or an object wrapping it under `data`.
    pub async fn list(&self, kind: EntityKind) -> RemoteResult<Vec<Value>> {
        let body = self.call(Method::GET, self.endpoint(&[kind.key()])?, None).await?;
        match body {
            Value::Array(items) => Ok(items),
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(RemoteError::Decode(format!("expected a list of {kind}"))),
            },
            Value::Null => Ok(Vec::new()),
            _ => Err(RemoteError::Decode(format!("expected a list of {kind}"))),
        }
    }

    /// One record, or `None` on 404.
    pub async fn get(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<Value>> {
        match self.call(Method::GET, self.endpoint(&[kind.key(), id])?, None).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, kind: EntityKind, record: &Value) -> RemoteResult<Value> {
        self.call(Method::POST, self.endpoint(&[kind.key()])?, Some(record)).await
    }

    pub async fn update(&self, kind: EntityKind, id: &str, record: &Value) -> RemoteResult<Value> {
        self.call(Method::PUT, self.endpoint(&[kind.key(), id])?, Some(record))
            .await
    }

    /// Deletes one record. Returns false on 404.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> RemoteResult<bool> {
        match self.call(Method::DELETE, self.endpoint(&[kind.key(), id])?, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn bulk_create(&self, kind: EntityKind, records: &[Value]) -> RemoteResult<Value> {
        let body = Value::Array(records.to_vec());
        self.call(Method::POST, self.endpoint(&[kind.key(), "bulk"])?, Some(&body))
            .await
    }

    // =========================================================================
    // Settings and Backup
    // =========================================================================

    pub async fn settings(&self) -> RemoteResult<Value> {
        self.call(Method::GET, self.endpoint(&["settings"])?, None).await
    }

    pub async fn update_settings(&self, settings: &Value) -> RemoteResult<Value> {
        self.call(Method::PUT, self.endpoint(&["settings"])?, Some(settings))
            .await
    }

    /// The whole dataset as the server holds it.
    pub async fn export_backup(&self) -> RemoteResult<Value> {
        self.call(Method::GET, self.endpoint(&["backup", "export"])?, None)
            .await
    }

    /// Replaces the server's dataset.
    pub async fn import_backup(&self, dataset: &Value) -> RemoteResult<Value> {
        self.call(Method::POST, self.endpoint(&["backup", "import"])?, Some(dataset))
            .await
    }

    pub async fn clear_all(&self) -> RemoteResult<()> {
        self.call(Method::POST, self.endpoint(&["backup", "clear"])?, None)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned HTTP response and reports the request line.
    pub(crate) async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(request_line);

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        (format!("http://{addr}"), rx)
    }

    /// Reads headers, then `Content-Length` bytes of body.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn client(base: &str) -> RestClient {
        RestClient::new(RemoteConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_building() {
        let c = client("http://localhost:3001");
        assert_eq!(
            c.endpoint(&["customers", "c1"]).unwrap().as_str(),
            "http://localhost:3001/api/customers/c1"
        );
        assert_eq!(c.health_url().unwrap().as_str(), "http://localhost:3001/health");

        let nested = client("https://crm.example.com/tenant-a/");
        assert_eq!(
            nested.endpoint(&["masterProjects", "bulk"]).unwrap().as_str(),
            "https://crm.example.com/tenant-a/api/masterProjects/bulk"
        );
    }

    #[test]
    fn test_ids_are_path_escaped() {
        let c = client("http://localhost:3001");
        assert_eq!(
            c.endpoint(&["receipts", "a/b c"]).unwrap().as_str(),
            "http://localhost:3001/api/receipts/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            RestClient::new(RemoteConfig::new("ftp://host")),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            RestClient::new(RemoteConfig::new("not a url")),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            RestClient::new(RemoteConfig::new("http://host").timeout_secs(0)),
            Err(RemoteError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_list_accepts_wrapped_array() {
        let (base, request) = serve_once("200 OK", json!({"data": [{"id": "b1"}]}).to_string()).await;
        let items = client(&base).list(EntityKind::Brokers).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(request.await.unwrap(), "GET /api/brokers HTTP/1.1");
    }

    #[tokio::test]
    async fn test_bulk_create_posts_array() {
        let (base, request) = serve_once("201 Created", json!({"created": 2}).to_string()).await;
        let reply = client(&base)
            .bulk_create(EntityKind::Inventory, &[json!({"id": "i1"}), json!({"id": "i2"})])
            .await
            .unwrap();
        assert_eq!(reply["created"], 2);
        assert_eq!(request.await.unwrap(), "POST /api/inventory/bulk HTTP/1.1");
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let (base, _) = serve_once("500 Internal Server Error", r#"{"error":"db down"}"#.to_string()).await;
        let err = client(&base).settings().await.unwrap_err();
        match err {
            RemoteError::Server { status, ref message } => {
                assert_eq!(status, 500);
                assert!(message.contains("db down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let (base, _) = serve_once("404 Not Found", String::new()).await;
        assert!(client(&base).get(EntityKind::Customers, "c9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}")).export_backup().await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)), "got {err:?}");
        assert!(!err.is_timeout());
        assert!(!client(&format!("http://{addr}")).health().await);
    }

    #[tokio::test]
    async fn test_slow_server_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let c = RestClient::new(RemoteConfig::new(format!("http://{addr}")).timeout_secs(1)).unwrap();
        let err = c.export_backup().await.unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
        assert_eq!(err.to_string(), "Request timed out after 1 seconds");
    }
}
