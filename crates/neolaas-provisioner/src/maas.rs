//! MAAS API Client
//!
//! Thin `reqwest` client for the MAAS REST API: lists nodes and issues the
//! three node operations the lifecycle engine needs.
//!
//! | Operation  | Request                                          |
//! |------------|--------------------------------------------------|
//! | list       | `GET  api/{v}/nodes/?op=list`                    |
//! | start      | `POST api/{v}/nodes/{system_id}/?op=start`       |
//! | acquire    | `POST api/{v}/nodes/?op=acquire` (`name=<host>`) |
//! | commission | `POST api/{v}/nodes/{system_id}/?op=commission`  |
//!
//! Requests are authenticated with OAuth 1.0 PLAINTEXT signatures built from
//! the `consumer:token:secret` API key.

use crate::config::MaasConfig;
use crate::runner::Inventory;
use crate::version::USER_AGENT;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use neolaas_lifecycle::{ControlClient, ExternalCallError, Machine, Operation};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::{form_urlencoded, Url};

/// Parsed `consumer:token:secret` API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub consumer_key: String,
    pub token: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl std::str::FromStr for ApiKey {
    type Err = anyhow::Error;

    fn from_str(key: &str) -> Result<Self> {
        let mut parts = key.trim().splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(consumer_key), Some(token), Some(secret))
                if !consumer_key.is_empty() && !token.is_empty() && !secret.is_empty() =>
            {
                Ok(Self {
                    consumer_key: consumer_key.to_string(),
                    token: token.to_string(),
                    secret: secret.to_string(),
                })
            }
            _ => Err(anyhow!("MAAS API key must have the form consumer:token:secret")),
        }
    }
}

impl ApiKey {
    /// `Authorization` header value for one request.
    pub fn authorization(&self, nonce: &str, timestamp: i64) -> String {
        let signature: String = form_urlencoded::byte_serialize(format!("&{}", self.secret).as_bytes()).collect();
        format!(
            "OAuth oauth_version=\"1.0\", oauth_signature_method=\"PLAINTEXT\", \
             oauth_consumer_key=\"{}\", oauth_token=\"{}\", oauth_signature=\"{}\", \
             oauth_nonce=\"{}\", oauth_timestamp=\"{}\"",
            self.consumer_key, self.token, signature, nonce, timestamp
        )
    }
}

/// MAAS REST client.
#[derive(Debug, Clone)]
pub struct MaasClient {
    http: Client,
    /// `{base}/api/{version}/`
    api_root: Url,
    key: ApiKey,
}

impl MaasClient {
    pub fn new(config: &MaasConfig) -> Result<Self> {
        let key: ApiKey = config.api_key.parse()?;

        let api_root = Url::parse(&format!(
            "{}/api/{}/",
            config.base_url.trim_end_matches('/'),
            config.api_version
        ))
        .with_context(|| format!("Invalid MAAS URL '{}'", config.base_url))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, api_root, key })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_root.join(path)
    }

    fn signed(&self, request: RequestBuilder) -> RequestBuilder {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        request.header(AUTHORIZATION, self.key.authorization(&nonce, timestamp))
    }

    /// All nodes known to MAAS.
    #[instrument(skip(self))]
    pub async fn list_machines(&self) -> Result<Vec<Machine>> {
        let url = self.url("nodes/")?;
        let response = self
            .signed(self.http.get(url).query(&[("op", "list")]))
            .send()
            .await
            .context("Failed to list MAAS nodes")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("MAAS node list returned {status}: {body}"));
        }

        let machines: Vec<Machine> = response
            .json()
            .await
            .context("Failed to decode MAAS node list")?;
        debug!(count = machines.len(), "Listed MAAS nodes");
        Ok(machines)
    }

    async fn post(
        &self,
        operation: Operation,
        path: &str,
        machine: &str,
        form: &[(&str, &str)],
    ) -> Result<(), ExternalCallError> {
        let transport = |source: Box<dyn std::error::Error + Send + Sync>| ExternalCallError::Transport {
            operation,
            machine: machine.to_string(),
            source,
        };

        let url = self.url(path).map_err(|e| transport(e.into()))?;
        let request = self
            .http
            .post(url)
            .query(&[("op", operation.as_str())])
            .form(form);

        let response = self
            .signed(request)
            .send()
            .await
            .map_err(|e| transport(e.into()))?;

        check_status(operation, machine, response).await
    }
}

async fn check_status(operation: Operation, machine: &str, response: Response) -> Result<(), ExternalCallError> {
    let status = response.status();
    if status.is_success() {
        debug!(operation = %operation, machine = %machine, status = status.as_u16(), "MAAS accepted request");
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ExternalCallError::Rejected {
        operation,
        machine: machine.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ControlClient for MaasClient {
    async fn start(&self, system_id: &str) -> Result<(), ExternalCallError> {
        self.post(Operation::Start, &format!("nodes/{system_id}/"), system_id, &[])
            .await
    }

    async fn acquire(&self, hostname: &str) -> Result<(), ExternalCallError> {
        self.post(Operation::Acquire, "nodes/", hostname, &[("name", hostname)])
            .await
    }

    async fn commission(&self, system_id: &str) -> Result<(), ExternalCallError> {
        self.post(Operation::Commission, &format!("nodes/{system_id}/"), system_id, &[])
            .await
    }
}

#[async_trait]
impl Inventory for MaasClient {
    async fn machines(&self) -> Result<Vec<Machine>> {
        self.list_machines().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(base_url: &str) -> MaasConfig {
        MaasConfig {
            base_url: base_url.to_string(),
            api_key: "ck:tk:s3cret".to_string(),
            api_version: "1.0".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_parse_api_key() {
        let key: ApiKey = "ck:tk:s3cret".parse().unwrap();
        assert_eq!(key.consumer_key, "ck");
        assert_eq!(key.token, "tk");
        assert_eq!(key.secret, "s3cret");
        assert!(!format!("{key:?}").contains("s3cret"));

        assert!("ck:tk".parse::<ApiKey>().is_err());
        assert!("ck::s".parse::<ApiKey>().is_err());
        assert!("".parse::<ApiKey>().is_err());
    }

    #[test]
    fn test_authorization_header() {
        let key: ApiKey = "ck:tk:s3cret".parse().unwrap();
        let header = key.authorization("abc", 1700000000);
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature_method=\"PLAINTEXT\""));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_token=\"tk\""));
        assert!(header.contains("oauth_signature=\"%26s3cret\""));
        assert!(header.contains("oauth_nonce=\"abc\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
    }

    #[test]
    fn test_api_root() {
        let client = MaasClient::new(&config("http://maas.lab:5240/MAAS/")).unwrap();
        assert_eq!(client.api_root().as_str(), "http://maas.lab:5240/MAAS/api/1.0/");
        assert_eq!(
            client.url("nodes/abc/").unwrap().as_str(),
            "http://maas.lab:5240/MAAS/api/1.0/nodes/abc/"
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(MaasClient::new(&config("not a url")).is_err());

        let mut bad_key = config("http://maas.lab/MAAS");
        bad_key.api_key = "nope".to_string();
        assert!(MaasClient::new(&bad_key).is_err());
    }
}
