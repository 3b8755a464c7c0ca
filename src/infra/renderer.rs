//! HTTP render-function transport.
//!
//! Posts the render payload to a configured serverless rendering endpoint.
//! The endpoint is expected to acknowledge with a 2xx immediately and do the
//! actual rendering asynchronously; results arrive later through the
//! callback endpoint.

use async_trait::async_trait;
use url::Url;

use crate::application::dispatcher::{RenderPayload, RenderTransport, TransportError};

pub struct HttpRenderFunction {
    client: reqwest::Client,
    endpoint: Url,
    authorization: Option<String>,
}

impl HttpRenderFunction {
    pub fn new(endpoint: Url, authorization: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            authorization,
        }
    }
}

#[async_trait]
impl RenderTransport for HttpRenderFunction {
    async fn send(&self, payload: &RenderPayload) -> Result<(), TransportError> {
        let mut request = self.client.post(self.endpoint.clone()).json(payload);
        if let Some(token) = self.authorization.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
