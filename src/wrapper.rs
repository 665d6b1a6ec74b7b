//! Branch resolution and client selection
//!
//! A [`ClientWrapper`] owns one set of [`ClientOptions`] and hands out
//! clients for it: a basic client bound to no branch, and branch-aware
//! clients keyed by branch id. The branch listing is fetched through the
//! basic client on first use and the result is kept for the wrapper's
//! lifetime.

use crate::client::{ClientFactory, HttpClientFactory, StorageApi};
use crate::error::{ClientError, Result};
use crate::options::ClientOptions;
use crate::token::StorageApiToken;
use crate::types::{AuthMethod, Branch, BRANCH_DEFAULT};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of interpreting the branch listing
enum BranchState {
    /// Listing not fetched yet (or the last fetch failed in transport)
    Unresolved,
    Resolved(ResolvedBranches),
    /// Listing fetched but the configured branch could not be resolved
    Failed(String),
}

struct ResolvedBranches {
    branches: HashMap<String, Branch>,
    current_id: String,
    default_id: String,
}

impl ResolvedBranches {
    fn from_listing(listing: Vec<Branch>, configured: Option<&str>) -> std::result::Result<Self, String> {
        // last record flagged default wins
        let default_id = listing
            .iter()
            .rev()
            .find(|b| b.is_default)
            .map(|b| b.id.clone())
            .ok_or_else(|| {
                format!(
                    "Can not find default branch for branchId: \"{}\".",
                    configured.unwrap_or_default()
                )
            })?;

        let current_id = match configured {
            None | Some(BRANCH_DEFAULT) => default_id.clone(),
            Some(id) => id.to_string(),
        };

        let branches: HashMap<String, Branch> =
            listing.into_iter().map(|b| (b.id.clone(), b)).collect();

        if !branches.contains_key(&current_id) {
            return Err(format!(
                "Can not resolve branchId: \"{}\".",
                configured.unwrap_or_default()
            ));
        }

        Ok(Self {
            branches,
            current_id,
            default_id,
        })
    }

    fn current(&self) -> &Branch {
        &self.branches[&self.current_id]
    }

    fn default_branch(&self) -> &Branch {
        &self.branches[&self.default_id]
    }
}

/// Resolves the working branch and caches the clients bound to it.
///
/// Every accessor that needs branch information triggers a single branch
/// listing on first use. A listing that succeeds but cannot be resolved
/// (no default branch, unknown configured id) is remembered and reported
/// again on later calls without another request; transport failures are
/// not remembered, so the next call lists again.
///
/// Caching accessors take `&mut self`: a wrapper has one owner.
///
/// # Example
///
/// ```rust,no_run
/// use storage_api_branch::{ClientOptions, ClientWrapper};
///
/// # async fn example() -> storage_api_branch::Result<()> {
/// let mut options = ClientOptions::new();
/// options
///     .set_url(Some("https://connection.keboola.com".into()))?
///     .set_token(Some("my-token".into()))
///     .set_branch_id(Some("default".into()));
///
/// let mut wrapper = ClientWrapper::new(options);
/// if wrapper.is_development_branch().await? {
///     println!("working in branch {}", wrapper.branch_name().await?);
/// }
/// let client = wrapper.branch_client().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientWrapper<F: ClientFactory = HttpClientFactory> {
    options: ClientOptions,
    factory: F,
    basic_client: Option<Arc<F::Client>>,
    branch_clients: HashMap<String, Arc<F::Client>>,
    state: BranchState,
    token: Option<Arc<StorageApiToken>>,
}

impl ClientWrapper<HttpClientFactory> {
    /// Wrapper producing HTTP clients
    pub fn new(options: ClientOptions) -> Self {
        Self::with_factory(options, HttpClientFactory)
    }
}

impl<F: ClientFactory> ClientWrapper<F> {
    /// Wrapper producing clients through `factory`
    pub fn with_factory(options: ClientOptions, factory: F) -> Self {
        Self {
            options,
            factory,
            basic_client: None,
            branch_clients: HashMap::new(),
            state: BranchState::Unresolved,
            token: None,
        }
    }

    /// Client bound to no branch, created on first call
    pub fn basic_client(&mut self) -> Result<Arc<F::Client>> {
        if let Some(ref client) = self.basic_client {
            return Ok(Arc::clone(client));
        }
        let client = self.create_client(None)?;
        self.basic_client = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Client bound to `branch_id`, created once per id
    pub async fn client_for_branch(&mut self, branch_id: &str) -> Result<Arc<F::Client>> {
        if branch_id.is_empty() || !branch_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClientError::InvalidArgument(format!(
                "Branch ID must be a number. \"{}\" given.",
                branch_id
            )));
        }

        if !self.resolved().await?.branches.contains_key(branch_id) {
            return Err(ClientError::NotFound(format!(
                "Branch with ID \"{}\" does not exist.",
                branch_id
            )));
        }

        if let Some(client) = self.branch_clients.get(branch_id) {
            return Ok(Arc::clone(client));
        }
        let client = self.create_client(Some(branch_id))?;
        self.branch_clients
            .insert(branch_id.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Client bound to the configured (resolved) branch
    pub async fn branch_client(&mut self) -> Result<Arc<F::Client>> {
        let branch_id = self.branch_id().await?;
        self.client_for_branch(&branch_id).await
    }

    /// Client bound to the default branch, whatever branch is configured
    pub async fn client_for_default_branch(&mut self) -> Result<Arc<F::Client>> {
        let default_id = self.default_branch().await?.id;
        self.client_for_branch(&default_id).await
    }

    /// Branch client when branch storage is explicitly enabled, basic client otherwise
    pub async fn table_and_file_storage_client(&mut self) -> Result<Arc<F::Client>> {
        if self.options.use_branch_storage() == Some(true) {
            self.branch_client().await
        } else {
            self.basic_client()
        }
    }

    pub async fn branch_id(&mut self) -> Result<String> {
        Ok(self.resolved().await?.current_id.clone())
    }

    pub async fn branch_name(&mut self) -> Result<String> {
        Ok(self.resolved().await?.current().name.clone())
    }

    /// The configured branch record
    pub async fn branch(&mut self) -> Result<Branch> {
        Ok(self.resolved().await?.current().clone())
    }

    pub async fn is_default_branch(&mut self) -> Result<bool> {
        let resolved = self.resolved().await?;
        Ok(resolved.current_id == resolved.default_id)
    }

    /// True when working in a non-default branch
    pub async fn is_development_branch(&mut self) -> Result<bool> {
        Ok(!self.is_default_branch().await?)
    }

    pub async fn default_branch(&mut self) -> Result<Branch> {
        Ok(self.resolved().await?.default_branch().clone())
    }

    /// Verified token of the branch client, verified once
    pub async fn token(&mut self) -> Result<Arc<StorageApiToken>> {
        if let Some(ref token) = self.token {
            return Ok(Arc::clone(token));
        }
        let client = self.branch_client().await?;
        let info = client.verify_token().await?;
        let token = Arc::new(StorageApiToken::new(info, client.token_string()));
        self.token = Some(Arc::clone(&token));
        Ok(token)
    }

    pub fn auth_method(&mut self) -> Result<AuthMethod> {
        Ok(self.basic_client()?.auth_method())
    }

    /// Independent copy of the options
    pub fn client_options_read_only(&self) -> ClientOptions {
        self.options.clone()
    }

    fn create_client(&self, branch_id: Option<&str>) -> Result<Arc<F::Client>> {
        let mut client = self
            .factory
            .create_client(&self.options.client_construct_options(), branch_id)?;
        client.set_run_id(self.options.run_id().map(str::to_string));
        client.set_backend_configuration(self.options.backend_configuration().cloned());
        debug!(
            branch_id = branch_id.unwrap_or("-"),
            run_id = client.run_id().unwrap_or("-"),
            "Created Storage API client"
        );
        Ok(Arc::new(client))
    }

    async fn resolved(&mut self) -> Result<&ResolvedBranches> {
        if let BranchState::Unresolved = self.state {
            let listing = self.basic_client()?.list_branches().await?;
            let configured = self.options.branch_id();
            self.state = match ResolvedBranches::from_listing(listing, configured) {
                Ok(resolved) => {
                    debug!(
                        branch_id = %resolved.current_id,
                        default_branch_id = %resolved.default_id,
                        "Resolved branch"
                    );
                    BranchState::Resolved(resolved)
                }
                Err(message) => {
                    warn!("{}", message);
                    BranchState::Failed(message)
                }
            };
        }

        match self.state {
            BranchState::Resolved(ref resolved) => Ok(resolved),
            BranchState::Failed(ref message) => Err(ClientError::BranchResolution(message.clone())),
            BranchState::Unresolved => Err(ClientError::BranchResolution(
                "Branches have not been listed.".to_string(),
            )),
        }
    }
}
