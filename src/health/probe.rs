// Package health provides the Probe trait and its HTTP implementation.

use bytes::Bytes;
use http_body_util::Empty;
use hyper::http::uri::InvalidUri;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::future::Future;
use std::time::Duration;

use super::ProbeError;

/// A single health check attempt against one target.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> Result<(), ProbeError>;
}

/// Adapts an async closure into a `Probe`.
pub struct FnProbe<F>(pub F);

#[async_trait::async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProbeError>> + Send,
{
    async fn probe(&self) -> Result<(), ProbeError> {
        (self.0)().await
    }
}

/// Plain unauthenticated `GET` expecting `200 OK`.
pub struct HttpProbe {
    uri: Uri,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpProbe {
    pub fn new(uri: Uri) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(Some(Duration::from_secs(3)));

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(1)
            .build(connector);

        Self { uri, client }
    }

    /// Probe for a proxy admin endpoint listening on loopback.
    pub fn loopback(port: u16) -> Result<Self, InvalidUri> {
        Ok(Self::new(format!("http://127.0.0.1:{port}/").parse()?))
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(ProbeError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
