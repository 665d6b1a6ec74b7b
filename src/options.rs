//! Client options: the mergeable configuration bag behind every wrapper

use crate::error::{ClientError, Result};
use crate::types::{AuthMethod, BackendConfiguration};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Delay before the n-th job poll retry
pub type RetryDelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Produces a run id from the options in effect
pub type RunIdGenerator = Arc<dyn Fn(&ClientOptions) -> String + Send + Sync>;

/// Connection options for Storage API clients.
///
/// Every field is optional; unset means "no opinion". Options from several
/// sources are layered with [`ClientOptions::add_values_from`], where set
/// values of the higher-priority source win.
///
/// # Example
///
/// ```rust
/// use storage_api_branch::ClientOptions;
///
/// # fn example() -> storage_api_branch::Result<()> {
/// let mut options = ClientOptions::new();
/// options
///     .set_url(Some("https://connection.keboola.com".into()))?
///     .set_token(Some("my-token".into()))
///     .set_branch_id(Some("default".into()));
///
/// let mut overrides = ClientOptions::new();
/// overrides.set_branch_id(Some("1234".into()));
/// options.add_values_from(&overrides);
/// assert_eq!(options.branch_id(), Some("1234"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ClientOptions {
    url: Option<String>,
    token: Option<String>,
    oauth_token: Option<String>,
    branch_id: Option<String>,
    run_id: Option<String>,
    logger: Option<tracing::Dispatch>,
    user_agent: Option<String>,
    backoff_max_tries: Option<u32>,
    aws_retries: Option<u32>,
    aws_debug: Option<bool>,
    retry_on_maintenance: Option<bool>,
    job_poll_retry_delay: Option<RetryDelayFn>,
    run_id_generator: Option<RunIdGenerator>,
    backend_configuration: Option<BackendConfiguration>,
    use_branch_storage: Option<bool>,
    auth_method: Option<AuthMethod>,
}

/// What the client-construction collaborator receives
#[derive(Clone, Default)]
pub struct ClientConstructOptions {
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub token: Option<String>,
    pub backoff_max_tries: Option<u32>,
    pub retry_on_maintenance: Option<bool>,
    pub aws_retries: Option<u32>,
    pub aws_debug: Option<bool>,
    pub logger: Option<tracing::Dispatch>,
    pub job_poll_retry_delay: Option<RetryDelayFn>,
    pub auth_method: Option<AuthMethod>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration handed to the client-construction collaborator.
    ///
    /// With the `oauth` auth method the OAuth token, when set, is the
    /// credential; otherwise the plain token is.
    pub fn client_construct_options(&self) -> ClientConstructOptions {
        let token = match self.auth_method {
            Some(AuthMethod::OAuth) => self.oauth_token.clone().or_else(|| self.token.clone()),
            _ => self.token.clone(),
        };

        ClientConstructOptions {
            url: self.url.clone(),
            user_agent: self.user_agent.clone(),
            token,
            backoff_max_tries: self.backoff_max_tries,
            retry_on_maintenance: self.retry_on_maintenance,
            aws_retries: self.aws_retries,
            aws_debug: self.aws_debug,
            logger: self.logger.clone(),
            job_poll_retry_delay: self.job_poll_retry_delay.clone(),
            auth_method: self.auth_method,
        }
    }

    /// Overlay every field that is set in `other` onto `self`.
    ///
    /// Unset fields of `other` never reset values of `self`.
    pub fn add_values_from(&mut self, other: &ClientOptions) {
        fn overlay<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(value) = src {
                *dst = Some(value.clone());
            }
        }

        overlay(&mut self.url, &other.url);
        overlay(&mut self.token, &other.token);
        overlay(&mut self.oauth_token, &other.oauth_token);
        overlay(&mut self.branch_id, &other.branch_id);
        overlay(&mut self.run_id, &other.run_id);
        overlay(&mut self.logger, &other.logger);
        overlay(&mut self.user_agent, &other.user_agent);
        overlay(&mut self.backoff_max_tries, &other.backoff_max_tries);
        overlay(&mut self.aws_retries, &other.aws_retries);
        overlay(&mut self.aws_debug, &other.aws_debug);
        overlay(&mut self.retry_on_maintenance, &other.retry_on_maintenance);
        overlay(&mut self.job_poll_retry_delay, &other.job_poll_retry_delay);
        overlay(&mut self.run_id_generator, &other.run_id_generator);
        overlay(&mut self.backend_configuration, &other.backend_configuration);
        overlay(&mut self.use_branch_storage, &other.use_branch_storage);
        overlay(&mut self.auth_method, &other.auth_method);
    }

    /// Set the Storage API URL; must be an absolute http(s) URL
    pub fn set_url(&mut self, url: Option<String>) -> Result<&mut Self> {
        if let Some(ref value) = url {
            validate_url(value)?;
        }
        self.url = url;
        Ok(self)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) -> &mut Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_oauth_token(&mut self, oauth_token: Option<String>) -> &mut Self {
        self.oauth_token = oauth_token;
        self
    }

    pub fn oauth_token(&self) -> Option<&str> {
        self.oauth_token.as_deref()
    }

    pub fn set_branch_id(&mut self, branch_id: Option<String>) -> &mut Self {
        self.branch_id = branch_id;
        self
    }

    pub fn branch_id(&self) -> Option<&str> {
        self.branch_id.as_deref()
    }

    pub fn set_run_id(&mut self, run_id: Option<String>) -> &mut Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn set_logger(&mut self, logger: Option<tracing::Dispatch>) -> &mut Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> Option<&tracing::Dispatch> {
        self.logger.as_ref()
    }

    pub fn set_user_agent(&mut self, user_agent: Option<String>) -> &mut Self {
        self.user_agent = user_agent;
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn set_backoff_max_tries(&mut self, backoff_max_tries: Option<u32>) -> &mut Self {
        self.backoff_max_tries = backoff_max_tries;
        self
    }

    pub fn backoff_max_tries(&self) -> Option<u32> {
        self.backoff_max_tries
    }

    pub fn set_aws_retries(&mut self, aws_retries: Option<u32>) -> &mut Self {
        self.aws_retries = aws_retries;
        self
    }

    pub fn aws_retries(&self) -> Option<u32> {
        self.aws_retries
    }

    pub fn set_aws_debug(&mut self, aws_debug: Option<bool>) -> &mut Self {
        self.aws_debug = aws_debug;
        self
    }

    pub fn aws_debug(&self) -> Option<bool> {
        self.aws_debug
    }

    pub fn set_retry_on_maintenance(&mut self, retry_on_maintenance: Option<bool>) -> &mut Self {
        self.retry_on_maintenance = retry_on_maintenance;
        self
    }

    pub fn retry_on_maintenance(&self) -> Option<bool> {
        self.retry_on_maintenance
    }

    pub fn set_job_poll_retry_delay(&mut self, delay: Option<RetryDelayFn>) -> &mut Self {
        self.job_poll_retry_delay = delay;
        self
    }

    pub fn job_poll_retry_delay(&self) -> Option<&RetryDelayFn> {
        self.job_poll_retry_delay.as_ref()
    }

    pub fn set_run_id_generator(&mut self, generator: Option<RunIdGenerator>) -> &mut Self {
        self.run_id_generator = generator;
        self
    }

    pub fn run_id_generator(&self) -> Option<&RunIdGenerator> {
        self.run_id_generator.as_ref()
    }

    pub fn set_backend_configuration(
        &mut self,
        backend_configuration: Option<BackendConfiguration>,
    ) -> &mut Self {
        self.backend_configuration = backend_configuration;
        self
    }

    pub fn backend_configuration(&self) -> Option<&BackendConfiguration> {
        self.backend_configuration.as_ref()
    }

    pub fn set_use_branch_storage(&mut self, use_branch_storage: Option<bool>) -> &mut Self {
        self.use_branch_storage = use_branch_storage;
        self
    }

    /// Tri-state: only `Some(true)` routes table/file storage to the branch client
    pub fn use_branch_storage(&self) -> Option<bool> {
        self.use_branch_storage
    }

    /// Set the auth method from its wire literal (`token` or `oauth`)
    pub fn set_auth_method(&mut self, auth_method: Option<&str>) -> Result<&mut Self> {
        self.auth_method = auth_method
            .map(|method| method.parse::<AuthMethod>())
            .transpose()?;
        Ok(self)
    }

    pub fn auth_method(&self) -> Option<AuthMethod> {
        self.auth_method
    }
}

fn validate_url(value: &str) -> Result<()> {
    // Url::parse silently strips surrounding whitespace and inner tabs/newlines
    let clean = !value.chars().any(|c| c.is_whitespace() || c.is_control());
    let valid = clean
        && match Url::parse(value) {
            Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
            Err(_) => false,
        };
    if !valid {
        return Err(ClientError::InvalidConfiguration(format!(
            "Value \"{}\" is invalid: Storage API URL is not valid.",
            value
        )));
    }
    Ok(())
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("oauth_token", &redact(&self.oauth_token))
            .field("branch_id", &self.branch_id)
            .field("run_id", &self.run_id)
            .field("logger", &self.logger.is_some())
            .field("user_agent", &self.user_agent)
            .field("backoff_max_tries", &self.backoff_max_tries)
            .field("aws_retries", &self.aws_retries)
            .field("aws_debug", &self.aws_debug)
            .field("retry_on_maintenance", &self.retry_on_maintenance)
            .field("job_poll_retry_delay", &self.job_poll_retry_delay.is_some())
            .field("run_id_generator", &self.run_id_generator.is_some())
            .field("backend_configuration", &self.backend_configuration)
            .field("use_branch_storage", &self.use_branch_storage)
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

impl fmt::Debug for ClientConstructOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConstructOptions")
            .field("url", &self.url)
            .field("user_agent", &self.user_agent)
            .field("token", &redact(&self.token))
            .field("backoff_max_tries", &self.backoff_max_tries)
            .field("retry_on_maintenance", &self.retry_on_maintenance)
            .field("aws_retries", &self.aws_retries)
            .field("aws_debug", &self.aws_debug)
            .field("logger", &self.logger.is_some())
            .field("job_poll_retry_delay", &self.job_poll_retry_delay.is_some())
            .field("auth_method", &self.auth_method)
            .finish()
    }
}
