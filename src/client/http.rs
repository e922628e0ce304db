// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Fixed request headers: the Device Setup Service speaks JSON only.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Target of one DSS POST. The body is shared cheaply across redirect
/// hops and retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub host: String,
    pub port: u16,
    /// Operation path under `/api/v1/`.
    pub path: &'static str,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn url(&self) -> String {
        format!("https://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Response protocol between a transport and the DSS client.
///
/// The transport drives the handler in order: `on_status` once, then
/// `on_header` per header, then `on_body` once. `before_retry` is
/// invoked by whoever re-executes the request (the DSS client's
/// redirect and retry loops) to reset per-call state.
pub trait HttpResponseHandler: Send {
    fn on_status(&mut self, status: u16) -> Result<()>;
    fn on_header(&mut self, name: &str, value: &str) -> Result<()>;
    fn on_body(&mut self, body: &[u8]) -> Result<()>;
    fn before_retry(&mut self) -> Result<()>;
}

/// Blocking-from-the-caller's-view HTTPS POST executor.
///
/// Implementations must not follow redirects themselves: redirect
/// discipline (hop cap, 307 vs 308 persistence) belongs to the DSS
/// client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: &HttpRequest,
        handler: &mut dyn HttpResponseHandler,
    ) -> Result<()>;
}
