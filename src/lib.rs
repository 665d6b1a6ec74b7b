//! Branch resolution and client selection for the Storage API
//!
//! Given connection options, works out which branch of a project a caller is
//! operating against and hands back clients bound to the base project or to
//! a specific branch. Clients and branch metadata are cached per wrapper.
//!
//! # Example
//!
//! ```rust,no_run
//! use storage_api_branch::{ClientOptions, ClientWrapper, StorageApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut options = ClientOptions::new();
//! options
//!     .set_url(Some("https://connection.keboola.com".into()))?
//!     .set_token(Some("my-token".into()))
//!     .set_branch_id(Some("1234".into()))
//!     .set_use_branch_storage(Some(true));
//!
//! let mut wrapper = ClientWrapper::new(options);
//!
//! // One branch listing, then cached
//! println!("{} ({})", wrapper.branch_name().await?, wrapper.branch_id().await?);
//! let default = wrapper.default_branch().await?;
//!
//! // Branch client, because branch storage is enabled
//! let storage = wrapper.table_and_file_storage_client().await?;
//! assert_eq!(storage.branch_id(), Some("1234"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod options;
pub mod token;
pub mod types;
pub mod wrapper;

// Re-export main types
pub use client::{ClientFactory, HttpClientFactory, HttpStorageClient, StorageApi};
pub use error::{ClientError, Result};
pub use factory::{StorageClientFactory, StorageClientPlainFactory, StorageClientRequestFactory};
pub use options::{ClientConstructOptions, ClientOptions, RetryDelayFn, RunIdGenerator};
pub use token::StorageApiToken;
pub use types::*;
pub use wrapper::ClientWrapper;
