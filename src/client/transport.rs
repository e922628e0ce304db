// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, redirect::Policy};
use tracing::debug;

use crate::client::http::{
    CONTENT_TYPE_JSON, HttpRequest, HttpResponseHandler, HttpTransport,
};

/// Production transport: one HTTPS POST per `execute`, redirects
/// disabled so 3xx responses surface to the handler untouched.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .context("failed to build the HTTPS client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        handler: &mut dyn HttpResponseHandler,
    ) -> Result<()> {
        let url = request.url();
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE_JSON)
            .body(request.body.clone())
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        handler.on_status(response.status().as_u16())?;

        for (name, value) in response.headers() {
            let value = value
                .to_str()
                .with_context(|| format!("header {name} is not valid UTF-8"))?;
            handler.on_header(name.as_str(), value)?;
        }

        let body = response.bytes().await.context("failed to read body")?;
        if !body.is_empty() {
            handler.on_body(&body)?;
        }

        Ok(())
    }
}
