//! HTTP transport for the array management API
//!
//! Posts XML envelopes to the filer servlet with basic credentials.

use crate::config::{ArrayConfig, TransportConfig};
use crate::domain::{ApiResponse, ArrayTransport, Element};
use crate::error::{Error, Result};
use crate::transport::xml::{encode_request, parse_response, Envelope};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

const SERVLET_PATH: &str = "/servlets/netapp.servlets.admin.XMLrequest_filer";

/// Transport speaking XML over HTTP(S) to one array
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    url: String,
    user: String,
    password: String,
    transport: TransportConfig,
    vfiler: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Build a transport for the configured array. No call is made yet.
    pub fn connect(config: &ArrayConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.transport.accept_invalid_certs);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Connection(format!("{}: {}", config.address, e)))?;

        let port = config
            .transport
            .port
            .unwrap_or_else(|| config.transport.scheme.default_port());
        let url = format!(
            "{}://{}:{}{}",
            config.transport.scheme, config.address, port, SERVLET_PATH
        );

        if config.transport.accept_invalid_certs {
            warn!("Certificate verification disabled for {}", config.address);
        }

        Ok(Self {
            client,
            endpoint: config.address.clone(),
            url,
            user: config.user.clone(),
            password: config.password.clone(),
            transport: config.transport.clone(),
            vfiler: RwLock::new(config.namespace().map(str::to_string)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn envelope_body(&self, request: &Element) -> String {
        let vfiler = self.vfiler.read();
        encode_request(
            request,
            Envelope {
                api_major: self.transport.api_major,
                api_minor: self.transport.api_minor,
                vfiler: vfiler.as_deref(),
            },
        )
    }
}

#[async_trait]
impl ArrayTransport for HttpTransport {
    async fn invoke(&self, request: &Element) -> Result<ApiResponse> {
        let body = self.envelope_body(request);
        debug!("Invoking {} on {}", request.name(), self.endpoint);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Content-Type", "text/xml; charset=\"UTF-8\"")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Connection(format!("{}: {}", self.endpoint, e))
                } else {
                    Error::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Connection(format!(
                "{} answered HTTP {} for {}",
                self.endpoint,
                status,
                request.name()
            )));
        }

        let text = response.text().await?;
        parse_response(&text)
    }

    fn select_namespace(&self, vserver: Option<&str>) {
        *self.vfiler.write() = vserver.filter(|v| !v.is_empty()).map(str::to_string);
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
