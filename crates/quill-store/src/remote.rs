//! # Remote Sheet Store
//!
//! HTTP client for the spreadsheet-backed endpoint (see [`crate::sheet`]
//! for the server side of the same protocol).
//!
//! ```text
//! list     GET  <url>?action=getAll&sheet=Orders&t=<ms>   → [ {...}, ... ]
//! upsert   POST <url>  text/plain  {"action":"save","sheet":"Orders","item":{...}}
//! remove   POST <url>  text/plain  {"action":"delete","sheet":"Orders","id":"..."}
//!
//! reply handling
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ non-2xx                      │ StoreError::HttpStatus                   │
//! │ read: JSON array             │ Ok(items)                                │
//! │ read: {"error"|"message"}    │ StoreError::Remote                       │
//! │ read: HTML (login page)      │ StoreError::AccessDenied                 │
//! │ read: anything else          │ StoreError::MalformedResponse            │
//! │ write: {"status":"error"}    │ StoreError::Remote                       │
//! │ write: not JSON              │ Ok(()) with a warning (legacy scripts)   │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! No retries. Writes are sent as `text/plain` because the hosted script
//! endpoint rejects a JSON preflight.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::error::{StoreError, StoreResult};
use crate::store::{document_id, EntityStore};

/// The network-backed [`EntityStore`].
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    url: String,
}

impl RemoteStore {
    /// Client for `url`. Without a timeout a stalled call waits indefinitely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> StoreResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(StoreError::InvalidConfig("remote URL is empty".into()));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        Ok(RemoteStore {
            client,
            url: url.trim().to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connection check: lists products and returns how many are visible.
    pub async fn probe(&self) -> StoreResult<usize> {
        let products = self.list(Collection::Products).await?;
        Ok(products.len())
    }

    async fn post(&self, collection: Collection, body: Value) -> StoreResult<()> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::HttpStatus {
                status: status.as_u16(),
                body: snippet(&text),
            });
        }
        interpret_write_ack(collection, &text)
    }
}

#[async_trait]
impl EntityStore for RemoteStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let cache_buster = Utc::now().timestamp_millis().to_string();
        debug!(sheet = collection.sheet_name(), "Remote getAll");

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("action", "getAll"),
                ("sheet", collection.sheet_name()),
                ("t", cache_buster.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::HttpStatus {
                status: status.as_u16(),
                body: snippet(&text),
            });
        }
        interpret_read(collection, &text)
    }

    async fn upsert(&self, collection: Collection, item: Value) -> StoreResult<()> {
        let id = document_id(&item).ok_or_else(|| StoreError::MissingId {
            collection: collection.to_string(),
        })?;
        debug!(sheet = collection.sheet_name(), id = %id, "Remote save");
        self.post(
            collection,
            json!({"action": "save", "sheet": collection.sheet_name(), "item": item}),
        )
        .await
    }

    async fn remove(&self, collection: Collection, id: &str) -> StoreResult<()> {
        debug!(sheet = collection.sheet_name(), id = %id, "Remote delete");
        self.post(
            collection,
            json!({"action": "delete", "sheet": collection.sheet_name(), "id": id}),
        )
        .await
    }
}

// =============================================================================
// Reply Interpretation
// =============================================================================

fn interpret_read(collection: Collection, text: &str) -> StoreResult<Vec<Value>> {
    let context = format!("getAll {}", collection.sheet_name());
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Object(obj)) => {
            // A read never answers with an object, so a bare `message` is the error.
            let message = error_message(&obj).or_else(|| match obj.get("message") {
                Some(Value::String(m)) if !m.trim().is_empty() => Some(m.clone()),
                _ => None,
            });
            match message {
                Some(message) => Err(StoreError::Remote(message)),
                None => Err(StoreError::malformed(context, "expected an array, got an object")),
            }
        }
        Ok(other) => Err(StoreError::malformed(context, format!("expected an array, got {other}"))),
        Err(_) if text.trim_start().starts_with('<') => Err(StoreError::AccessDenied(snippet(text))),
        Err(e) => Err(StoreError::malformed(context, e.to_string())),
    }
}

fn interpret_write_ack(collection: Collection, text: &str) -> StoreResult<()> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => match error_message(&obj) {
            Some(message) => Err(StoreError::Remote(message)),
            None => Ok(()),
        },
        Ok(_) => Ok(()),
        Err(_) => {
            warn!(
                sheet = collection.sheet_name(),
                reply = %snippet(text),
                "Write acknowledgement is not JSON, treating as success"
            );
            Ok(())
        }
    }
}

/// Message of an error-shaped reply: an `error` field, or `status:"error"`.
fn error_message(obj: &serde_json::Map<String, Value>) -> Option<String> {
    let text_of = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if let Some(err) = obj.get("error") {
        if !err.is_null() && err != &Value::Bool(false) {
            return Some(text_of(err));
        }
    }
    if obj.get("status").and_then(Value::as_str) == Some("error") {
        return Some(
            obj.get("message")
                .map(text_of)
                .unwrap_or_else(|| "unspecified remote error".to_string()),
        );
    }
    None
}

fn snippet(text: &str) -> String {
    const MAX: usize = 200;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{SheetServer, SheetServerConfig};
    use axum::routing::get;
    use axum::Router;

    #[test]
    fn test_interpret_read() {
        let items = interpret_read(Collection::Orders, r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(items.len(), 1);

        let err = interpret_read(Collection::Orders, r#"{"error":"Sheet not found"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Remote(ref m) if m == "Sheet not found"));

        let err = interpret_read(Collection::Orders, r#"{"status":"error","message":"boom"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Remote(ref m) if m == "boom"));

        let err = interpret_read(Collection::Orders, r#"{"message":"Exceeded maximum execution time"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Remote(ref m) if m == "Exceeded maximum execution time"));

        let err = interpret_read(Collection::Orders, "<!DOCTYPE html><html>Sign in</html>").unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));

        let err = interpret_read(Collection::Orders, "ok").unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse { .. }));

        let err = interpret_read(Collection::Orders, r#"{"rows":[]}"#).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse { .. }));
    }

    #[test]
    fn test_interpret_write_ack() {
        assert!(interpret_write_ack(Collection::Products, r#"{"status":"success"}"#).is_ok());
        assert!(interpret_write_ack(Collection::Products, "Done").is_ok());
        assert!(interpret_write_ack(Collection::Products, r#"{"status":"success","message":"Saved"}"#).is_ok());
        let err = interpret_write_ack(Collection::Products, r#"{"status":"error","message":"Missing ID"}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote(ref m) if m == "Missing ID"));
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            RemoteStore::new("  ", None),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_against_sheet_server() {
        let server = SheetServer::start(SheetServerConfig::ephemeral()).await.unwrap();
        let remote = RemoteStore::new(server.url(), Some(Duration::from_secs(5))).unwrap();

        assert_eq!(remote.probe().await.unwrap(), 0);

        remote
            .upsert(Collection::Customers, json!({"id": "c1", "code": "0901", "debt": 0}))
            .await
            .unwrap();
        remote
            .upsert(Collection::Customers, json!({"id": "c1", "code": "0901", "debt": 7000}))
            .await
            .unwrap();
        let customers = remote.list(Collection::Customers).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0]["debt"], 7000);

        remote.remove(Collection::Customers, "c1").await.unwrap();
        assert!(remote.list(Collection::Customers).await.unwrap().is_empty());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_typed() {
        let app = Router::new().route(
            "/",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let remote = RemoteStore::new(format!("http://{addr}/"), Some(Duration::from_secs(5))).unwrap();
        let err = remote.list(Collection::Products).await.unwrap_err();
        assert!(matches!(err, StoreError::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        // bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = RemoteStore::new(format!("http://{addr}/"), Some(Duration::from_secs(2))).unwrap();
        let err = remote.list(Collection::Products).await.unwrap_err();
        assert!(err.is_transport());
    }
}
