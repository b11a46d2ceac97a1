//! Minimal HTTP/1.1 client shared by the networked backends.
//!
//! One connection per request, bounded by a timeout that covers connect,
//! handshake, request and body collection.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use thiserror::Error;
use tracing::debug;

const CLIENT_USER_AGENT: &str = "customscaler/0.1";

/// Errors from a single HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect to {0} failed: {1}")]
    Connect(String, String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("reading response body failed: {0}")]
    Body(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A parsed `http://host:port/path` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    /// `host:port` used for the TCP connection and the Host header.
    pub authority: String,
    /// Origin-form request target (`/path?query`).
    pub path_and_query: String,
}

impl HttpTarget {
    /// Parse an absolute `http://` URL. The port defaults to 80.
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let invalid = |reason: &str| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.trim().parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme {other}"))),
            None => return Err(invalid("missing scheme")),
        }
        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        if authority.host().is_empty() {
            return Err(invalid("missing host"));
        }
        let port = authority.port_u16().unwrap_or(80);
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .filter(|pq| !pq.is_empty())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            authority: format!("{}:{port}", authority.host()),
            path_and_query,
        })
    }

    /// Build a target from a `host:port` base address and a path.
    pub fn from_base(base: &str, path: &str) -> Result<Self, HttpError> {
        let base = base.trim().trim_end_matches('/');
        let base = base.strip_prefix("http://").unwrap_or(base);
        Self::parse(&format!("http://{base}{path}"))
    }
}

/// Status and fully collected body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Perform one HTTP request against `target`.
pub async fn send(
    method: Method,
    target: &HttpTarget,
    body: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<HttpResponse, HttpError> {
    let result = tokio::time::timeout(timeout, async {
        let stream = tokio::net::TcpStream::connect(&target.authority)
            .await
            .map_err(|e| HttpError::Connect(target.authority.clone(), e.to_string()))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| HttpError::Handshake(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = http::Request::builder()
            .method(method)
            .uri(target.path_and_query.as_str())
            .header(HOST, target.authority.as_str())
            .header(USER_AGENT, CLIENT_USER_AGENT);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?
            .to_bytes();

        debug!(authority = %target.authority, path = %target.path_and_query, %status, "http exchange complete");
        Ok(HttpResponse { status, body })
    })
    .await;

    match result {
        Ok(response) => response,
        Err(_) => Err(HttpError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_url() {
        let target = HttpTarget::parse("http://metrics.local:9090/api/queue?name=jobs").unwrap();
        assert_eq!(target.authority, "metrics.local:9090");
        assert_eq!(target.path_and_query, "/api/queue?name=jobs");
    }

    #[test]
    fn parse_defaults_port_and_path() {
        let target = HttpTarget::parse("http://metrics.local").unwrap();
        assert_eq!(target.authority, "metrics.local:80");
        assert_eq!(target.path_and_query, "/");
    }

    #[test]
    fn parse_rejects_other_schemes() {
        assert!(matches!(
            HttpTarget::parse("https://metrics.local/q"),
            Err(HttpError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpTarget::parse("queue_depth"),
            Err(HttpError::InvalidUrl { .. })
        ));
        assert!(matches!(HttpTarget::parse(""), Err(HttpError::InvalidUrl { .. })));
    }

    #[test]
    fn from_base_accepts_bare_and_prefixed_addresses() {
        let a = HttpTarget::from_base("127.0.0.1:8443", "/api/v1/workloads/default/web").unwrap();
        let b = HttpTarget::from_base("http://127.0.0.1:8443/", "/api/v1/workloads/default/web").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path_and_query, "/api/v1/workloads/default/web");
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = HttpTarget::parse(&format!("http://{addr}/")).unwrap();
        let err = send(Method::GET, &target, None, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Connect(..)));
    }
}
