//! Factories producing client wrappers from layered options
//!
//! - [`StorageClientPlainFactory`]: base options overlaid with per-call options
//! - [`StorageClientRequestFactory`]: credentials and run id taken from
//!   inbound request headers

mod plain;
mod request;

pub use plain::StorageClientPlainFactory;
pub use request::{StorageClientRequestFactory, AUTHORIZATION_HEADER};

use crate::options::ClientOptions;

/// Common surface of wrapper factories
pub trait StorageClientFactory {
    /// Independent copy of the factory's base options
    fn client_options_read_only(&self) -> ClientOptions;
}
