use super::StorageClientFactory;
use crate::client::{ClientFactory, HttpClientFactory};
use crate::options::ClientOptions;
use crate::wrapper::ClientWrapper;

/// Creates wrappers from base options plus per-call overrides
pub struct StorageClientPlainFactory<F: ClientFactory + Clone = HttpClientFactory> {
    options: ClientOptions,
    factory: F,
}

impl StorageClientPlainFactory<HttpClientFactory> {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_factory(options, HttpClientFactory)
    }
}

impl<F: ClientFactory + Clone> StorageClientPlainFactory<F> {
    pub fn with_factory(options: ClientOptions, factory: F) -> Self {
        Self { options, factory }
    }

    /// Wrapper over the base options with every set field of `overrides` applied
    pub fn create_client_wrapper(&self, overrides: &ClientOptions) -> ClientWrapper<F> {
        let mut options = self.options.clone();
        options.add_values_from(overrides);
        ClientWrapper::with_factory(options, self.factory.clone())
    }
}

impl<F: ClientFactory + Clone> StorageClientFactory for StorageClientPlainFactory<F> {
    fn client_options_read_only(&self) -> ClientOptions {
        self.options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> ClientOptions {
        let mut options = ClientOptions::new();
        options
            .set_url(Some("https://connection.example.com".into()))
            .unwrap()
            .set_token(Some("base-token".into()))
            .set_run_id(Some("run-base".into()));
        options
    }

    #[test]
    fn test_create_client_wrapper_overlays_options() {
        let factory = StorageClientPlainFactory::new(base_options());

        let mut overrides = ClientOptions::new();
        overrides
            .set_branch_id(Some("1234".into()))
            .set_token(Some("other-token".into()));
        let wrapper = factory.create_client_wrapper(&overrides);

        let options = wrapper.client_options_read_only();
        assert_eq!(options.url(), Some("https://connection.example.com"));
        assert_eq!(options.token(), Some("other-token"));
        assert_eq!(options.branch_id(), Some("1234"));
        assert_eq!(options.run_id(), Some("run-base"));

        // base options untouched
        let base = factory.client_options_read_only();
        assert_eq!(base.token(), Some("base-token"));
        assert_eq!(base.branch_id(), None);
    }

    #[test]
    fn test_client_options_read_only_is_a_copy() {
        let factory = StorageClientPlainFactory::new(base_options());
        factory
            .client_options_read_only()
            .set_url(Some("https://bar".into()))
            .unwrap();
        assert_eq!(
            factory.client_options_read_only().url(),
            Some("https://connection.example.com")
        );
    }

    #[test]
    fn test_wrapper_builds_basic_client_from_merged_options() {
        use crate::client::StorageApi;

        let factory = StorageClientPlainFactory::new(base_options());
        let mut wrapper = factory.create_client_wrapper(&ClientOptions::new());
        let client = wrapper.basic_client().unwrap();
        assert_eq!(client.token_string(), "base-token");
        assert_eq!(client.run_id(), Some("run-base"));
    }
}
