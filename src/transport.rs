//! Delivery of registration records to the service directory.
//!
//! Two wire shapes exist, selected by [`WireFormat`]:
//!
//! * **Path** – the record is posted to
//!   `{url}/api/entrypoints/{app}/{platform}/backend/{service}/register-server`
//!   with body `{id, hostname, ip, port, context}`.
//! * **Topic** – the record is published to `{url}/pub?topic=register_server`
//!   wrapped as `{header: {application, platform}, server: {id, backendId, ip, port, context}}`.
//!
//! Registration is fire-and-forget: failures are logged with the URL and
//! payload, never retried and never reported to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Serialize;

use crate::config::{Config, WireFormat};
use crate::error::TransportError;
use crate::types::RegistrationRecord;

const REGISTER_TOPIC: &str = "register_server";

/// Sink for finished registration records.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Delivers one record.  Failures are handled by the implementation.
    async fn register(&self, record: &RegistrationRecord);
}

#[derive(Serialize)]
struct InstancePayload<'a> {
    id: &'a str,
    hostname: &'a str,
    ip: &'a str,
    port: &'a str,
    context: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct TopicPayload<'a> {
    header: TopicHeader<'a>,
    server: TopicServer<'a>,
}

#[derive(Serialize)]
struct TopicHeader<'a> {
    application: &'a str,
    platform: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopicServer<'a> {
    id: &'a str,
    backend_id: &'a str,
    ip: &'a str,
    port: &'a str,
    context: &'a BTreeMap<String, String>,
}

impl WireFormat {
    /// Target URL for `record` under the directory base `base_url`.
    /// Record values are percent-encoded as single path segments.
    pub fn endpoint(&self, base_url: &Url, record: &RegistrationRecord) -> Result<Url, TransportError> {
        let mut url = base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::InvalidUrl(base_url.to_string()))?;
            segments.pop_if_empty();
            match self {
                WireFormat::Path => {
                    segments.extend([
                        "api",
                        "entrypoints",
                        record.application.as_str(),
                        record.platform.as_str(),
                        "backend",
                        record.service.as_str(),
                        "register-server",
                    ]);
                }
                WireFormat::Topic => {
                    segments.push("pub");
                }
            }
        }
        if *self == WireFormat::Topic {
            url.query_pairs_mut().append_pair("topic", REGISTER_TOPIC);
        }
        Ok(url)
    }

    /// JSON body for `record`.
    pub fn payload(&self, record: &RegistrationRecord) -> Result<String, serde_json::Error> {
        match self {
            WireFormat::Path => serde_json::to_string(&InstancePayload {
                id: &record.id,
                hostname: &record.hostname,
                ip: &record.ip,
                port: &record.port,
                context: &record.context,
            }),
            WireFormat::Topic => serde_json::to_string(&TopicPayload {
                header: TopicHeader {
                    application: &record.application,
                    platform: &record.platform,
                },
                server: TopicServer {
                    id: &record.id,
                    backend_id: &record.service,
                    ip: &record.ip,
                    port: &record.port,
                    context: &record.context,
                },
            }),
        }
    }
}

/// HTTP client for the service directory.
pub struct HttpRegistry {
    base_url: Url,
    wire_format: WireFormat,
    http_client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| TransportError::InvalidUrl(config.url.clone()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            wire_format: config.wire_format,
            http_client,
        })
    }

    /// Posts `record`, returning why it was not accepted.
    pub async fn post(&self, record: &RegistrationRecord) -> Result<(), TransportError> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(TransportError::Incomplete(missing));
        }

        let url = self.wire_format.endpoint(&self.base_url, record)?;
        let payload = self.wire_format.payload(record)?;

        let response = match self
            .http_client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                return Err(TransportError::Request {
                    url: url.to_string(),
                    payload,
                    source,
                })
            }
        };

        let status = response.status();
        // The directory's answer carries nothing we use.
        if let Err(e) = response.bytes().await {
            debug!("Discarding unreadable response body from {}: {}", url, e);
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                payload,
                status,
            });
        }

        debug!("http post to service directory: url={} body={}", url, payload);
        Ok(())
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn register(&self, record: &RegistrationRecord) {
        info!(
            "Register: id={} application={} platform={} service={}",
            record.id, record.application, record.platform, record.service
        );
        if let Err(e) = self.post(record).await {
            error!("Registration of {} failed: {}", record.id, e);
        }
    }
}
