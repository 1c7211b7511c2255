//! Local HTTP servers used by adapter, handler and client tests.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

/**
 * \brief HTTP server on 127.0.0.1 that records every request and answers with a canned reply.
 */
pub struct FakeVendor {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeVendor {
    pub async fn start(status: StatusCode, reply: impl Into<String>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = requests.clone();
        let reply = reply.into();

        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, bytes: Bytes| {
            let captured = captured.clone();
            let reply = reply.clone();
            async move {
                let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                captured.lock().expect("lock captured").push(CapturedRequest {
                    path: uri.path().to_string(),
                    query: uri.query().map(|q| q.to_string()),
                    headers,
                    body,
                });
                (status, [(CONTENT_TYPE, "application/json")], reply)
            }
        });

        Self {
            base_url: serve_local(app).await,
            requests,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("lock captured").clone()
    }
}

/**
 * \brief Serves `app` on an ephemeral 127.0.0.1 port and returns its base URL.
 */
pub async fn serve_local(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local server");
    let addr = listener.local_addr().expect("local server addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}
