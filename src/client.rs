//! Storage API client surface and the default HTTP implementation
//!
//! [`StorageApi`] is what the wrapper needs from a client, [`ClientFactory`]
//! is how it builds one. [`HttpStorageClient`] talks to the real endpoints;
//! retries and backoff are left to the transport and only carried here as
//! configuration.

use crate::error::{ClientError, Result};
use crate::options::ClientConstructOptions;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const TOKEN_HEADER: &str = "X-StorageApi-Token";
pub const RUN_ID_HEADER: &str = "X-KBC-RunId";
pub const BACKEND_HEADER: &str = "X-KBC-Backend";

const DEFAULT_USER_AGENT: &str = concat!("storage-api-branch/", env!("CARGO_PKG_VERSION"));

/// Operations the wrapper performs on a Storage API client
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Base URL of the Storage API
    fn api_url(&self) -> &str;

    /// Credential this client authenticates with
    fn token_string(&self) -> &str;

    /// Branch this client is bound to; `None` for a basic client
    fn branch_id(&self) -> Option<&str>;

    fn auth_method(&self) -> AuthMethod;

    fn run_id(&self) -> Option<&str>;

    fn set_run_id(&mut self, run_id: Option<String>);

    fn backend_configuration(&self) -> Option<&BackendConfiguration>;

    fn set_backend_configuration(&mut self, backend_configuration: Option<BackendConfiguration>);

    /// List all branches of the project
    async fn list_branches(&self) -> Result<Vec<Branch>>;

    /// Verify the credential and return the token-info record
    async fn verify_token(&self) -> Result<TokenInfo>;
}

/// Builds clients from construct options
pub trait ClientFactory: Send + Sync {
    type Client: StorageApi;

    /// Build a basic client (`branch_id == None`) or one bound to a branch
    fn create_client(
        &self,
        options: &ClientConstructOptions,
        branch_id: Option<&str>,
    ) -> Result<Self::Client>;
}

/// Factory for [`HttpStorageClient`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    type Client = HttpStorageClient;

    fn create_client(
        &self,
        options: &ClientConstructOptions,
        branch_id: Option<&str>,
    ) -> Result<HttpStorageClient> {
        HttpStorageClient::new(options.clone(), branch_id.map(str::to_string))
    }
}

/// HTTP client for the Storage API
///
/// Besides the [`StorageApi`] calls, the client exposes what a caller needs to
/// issue further requests through it: [`endpoint_url`](Self::endpoint_url)
/// (branch-prefixed for branch clients) and the carried transport tuning
/// ([`config`](Self::config), [`backoff_max_tries`](Self::backoff_max_tries),
/// [`retry_on_maintenance`](Self::retry_on_maintenance),
/// [`job_poll_retry_delay`](Self::job_poll_retry_delay)).
///
/// # Example
///
/// ```rust,no_run
/// use storage_api_branch::{ClientOptions, HttpStorageClient, StorageApi};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut options = ClientOptions::new();
/// options
///     .set_url(Some("https://connection.keboola.com".into()))?
///     .set_token(Some("my-token".into()));
///
/// let client = HttpStorageClient::new(options.client_construct_options(), None)?;
/// let branches = client.list_branches().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpStorageClient {
    config: ClientConstructOptions,
    api_url: String,
    token: String,
    branch_id: Option<String>,
    run_id: String,
    backend_configuration: Option<BackendConfiguration>,
    client: Client,
}

/// Branch record as returned by the dev-branches endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchRecord {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    is_default: bool,
}

impl HttpStorageClient {
    /// Create a new client; URL and token are required
    pub fn new(config: ClientConstructOptions, branch_id: Option<String>) -> Result<Self> {
        let api_url = config
            .url
            .clone()
            .ok_or_else(|| ClientError::InvalidConfiguration("Storage API URL must be set.".into()))?;
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ClientError::InvalidConfiguration("Storage API token must be set.".into())
            })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .build()?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            branch_id,
            run_id: generate_run_id(),
            backend_configuration: None,
            client,
            config,
        })
    }

    /// Options this client was built from
    pub fn config(&self) -> &ClientConstructOptions {
        &self.config
    }

    pub fn backoff_max_tries(&self) -> Option<u32> {
        self.config.backoff_max_tries
    }

    pub fn retry_on_maintenance(&self) -> Option<bool> {
        self.config.retry_on_maintenance
    }

    /// Delay before the given job poll attempt, if a delay function is set
    pub fn job_poll_retry_delay(&self, attempt: u32) -> Option<Duration> {
        self.config.job_poll_retry_delay.as_ref().map(|f| f(attempt))
    }

    /// URL of an endpoint, under the branch prefix for branch clients
    pub fn endpoint_url(&self, path: &str) -> String {
        match self.branch_id {
            Some(ref branch_id) => self.url(&format!("branch/{}/{}", branch_id, path)),
            None => self.url(path),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v2/storage/{}",
            self.api_url,
            path.trim_start_matches('/')
        )
    }

    fn request_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        match self.auth_method() {
            AuthMethod::OAuth => {
                headers.insert(
                    header::AUTHORIZATION,
                    header_value(&format!("Bearer {}", self.token))?,
                );
            }
            AuthMethod::Token => {
                headers.insert(TOKEN_HEADER, header_value(&self.token)?);
            }
        }
        headers.insert(RUN_ID_HEADER, header_value(&self.run_id)?);
        if let Some(ref backend) = self.backend_configuration {
            headers.insert(BACKEND_HEADER, header_value(&backend.to_header_value()?)?);
        }
        Ok(headers)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.log_request("GET", url);
        let response = self
            .client
            .get(url)
            .headers(self.request_headers()?)
            .send()
            .await?;
        self.handle_response(response).await
    }

    fn log_request(&self, method: &str, url: &str) {
        let emit = || debug!(method, url, run_id = %self.run_id, "Storage API request");
        match self.config.logger {
            Some(ref dispatch) => tracing::dispatcher::with_default(dispatch, emit),
            None => emit(),
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Every non-success status, 404 included, is a server error carrying the body
fn status_error(status: StatusCode, body: String) -> ClientError {
    ClientError::Server {
        status: status.as_u16(),
        message: body,
    }
}

fn branches_from_records(records: Vec<BranchRecord>) -> Result<Vec<Branch>> {
    records
        .into_iter()
        .map(|record| {
            let id = match record.id {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s,
                other => {
                    return Err(ClientError::InvalidResponse(format!(
                        "unexpected branch id: {}",
                        other
                    )))
                }
            };
            Ok(Branch::new(id, record.name, record.is_default))
        })
        .collect()
}

#[async_trait]
impl StorageApi for HttpStorageClient {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn token_string(&self) -> &str {
        &self.token
    }

    fn branch_id(&self) -> Option<&str> {
        self.branch_id.as_deref()
    }

    fn auth_method(&self) -> AuthMethod {
        self.config.auth_method.unwrap_or_default()
    }

    fn run_id(&self) -> Option<&str> {
        Some(&self.run_id)
    }

    /// `None` keeps the id generated at construction
    fn set_run_id(&mut self, run_id: Option<String>) {
        if let Some(run_id) = run_id {
            self.run_id = run_id;
        }
    }

    fn backend_configuration(&self) -> Option<&BackendConfiguration> {
        self.backend_configuration.as_ref()
    }

    fn set_backend_configuration(&mut self, backend_configuration: Option<BackendConfiguration>) {
        self.backend_configuration = backend_configuration;
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        let records: Vec<BranchRecord> = self.get_json(&self.url("dev-branches")).await?;
        branches_from_records(records)
    }

    async fn verify_token(&self) -> Result<TokenInfo> {
        self.get_json(&self.url("tokens/verify")).await
    }
}

fn header_value(value: &str) -> Result<header::HeaderValue> {
    header::HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidConfiguration(format!("invalid header value: {}", e)))
}
