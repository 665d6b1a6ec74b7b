//! Configuration for the storage-api-branch CLI
//!
//! CLI arguments and environment variable handling using clap.

use crate::error::Result;
use crate::options::ClientOptions;
use crate::types::BackendConfiguration;
use clap::Parser;

/// Resolve the working branch of a Storage API project
#[derive(Parser, Debug, Clone)]
#[command(name = "storage-api-branch")]
#[command(about = "Resolve the Storage API branch a token and branch id point at")]
pub struct Args {
    /// Storage API URL (e.g. https://connection.keboola.com)
    #[arg(long, env = "STORAGE_API_URL")]
    pub url: String,

    /// Storage API token
    #[arg(long, env = "STORAGE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// OAuth access token (used with --auth-method oauth)
    #[arg(long, env = "STORAGE_API_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Branch id; "default" or unset selects the default branch
    #[arg(long, env = "BRANCH_ID")]
    pub branch_id: Option<String>,

    /// Run id attached to every request
    #[arg(long, env = "RUN_ID")]
    pub run_id: Option<String>,

    /// Auth method: token or oauth
    #[arg(long, env = "AUTH_METHOD")]
    pub auth_method: Option<String>,

    /// User agent sent with requests
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Maximum transport retries
    #[arg(long, env = "BACKOFF_MAX_TRIES")]
    pub backoff_max_tries: Option<u32>,

    /// Retry requests during Storage API maintenance
    #[arg(long, env = "RETRY_ON_MAINTENANCE")]
    pub retry_on_maintenance: Option<bool>,

    /// Route table and file storage through the branch client
    #[arg(long, env = "USE_BRANCH_STORAGE")]
    pub use_branch_storage: Option<bool>,

    /// Backend context forwarded in X-KBC-Backend
    #[arg(long, env = "BACKEND_CONTEXT")]
    pub backend_context: Option<String>,

    /// Backend size forwarded in X-KBC-Backend
    #[arg(long, env = "BACKEND_SIZE")]
    pub backend_size: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Client options described by these arguments
    pub fn client_options(&self) -> Result<ClientOptions> {
        let backend_configuration = if self.backend_context.is_some() || self.backend_size.is_some() {
            Some(BackendConfiguration::new(
                self.backend_context.clone(),
                self.backend_size.clone(),
            ))
        } else {
            None
        };

        let mut options = ClientOptions::new();
        options
            .set_url(Some(self.url.clone()))?
            .set_token(self.token.clone())
            .set_oauth_token(self.oauth_token.clone())
            .set_branch_id(self.branch_id.clone())
            .set_run_id(self.run_id.clone())
            .set_user_agent(self.user_agent.clone())
            .set_backoff_max_tries(self.backoff_max_tries)
            .set_retry_on_maintenance(self.retry_on_maintenance)
            .set_use_branch_storage(self.use_branch_storage)
            .set_backend_configuration(backend_configuration);
        options.set_auth_method(self.auth_method.as_deref())?;
        Ok(options)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.token.is_none() && self.oauth_token.is_none() {
            return Err("STORAGE_API_TOKEN or STORAGE_API_OAUTH_TOKEN is required".to_string());
        }
        Ok(())
    }
}
