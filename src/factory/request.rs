use super::StorageClientFactory;
use crate::client::{ClientFactory, HttpClientFactory, RUN_ID_HEADER, TOKEN_HEADER};
use crate::error::{ClientError, Result};
use crate::options::ClientOptions;
use crate::types::{generate_run_id, AuthMethod};
use crate::wrapper::ClientWrapper;
use reqwest::header::HeaderMap;
use tracing::debug;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

const BEARER_PREFIX: &str = "Bearer";

/// Creates wrappers for inbound requests.
///
/// The credential comes from `Authorization: Bearer <token>` (OAuth, takes
/// precedence) or `X-StorageApi-Token`; the run id from `X-KBC-RunId`, the
/// configured run id generator, or a fresh `run-` id, in that order.
pub struct StorageClientRequestFactory<F: ClientFactory + Clone = HttpClientFactory> {
    options: ClientOptions,
    factory: F,
}

impl StorageClientRequestFactory<HttpClientFactory> {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_factory(options, HttpClientFactory)
    }
}

impl<F: ClientFactory + Clone> StorageClientRequestFactory<F> {
    pub fn with_factory(options: ClientOptions, factory: F) -> Self {
        Self { options, factory }
    }

    /// Wrapper for a request carrying `headers`, with optional extra options
    pub fn create_client_wrapper(
        &self,
        headers: &HeaderMap,
        overrides: Option<&ClientOptions>,
    ) -> Result<ClientWrapper<F>> {
        let mut options = self.options.clone();
        if let Some(overrides) = overrides {
            options.add_values_from(overrides);
        }

        let (token, auth_method) = credential_from_headers(headers)?;
        if auth_method == AuthMethod::OAuth {
            options.set_oauth_token(Some(token.clone()));
        }
        options.set_token(Some(token));
        options.set_auth_method(Some(auth_method.as_str()))?;

        let run_id = run_id_from_headers(headers, &options);
        debug!(auth_method = %auth_method, run_id = %run_id, "Creating client wrapper for request");
        options.set_run_id(Some(run_id));

        Ok(ClientWrapper::with_factory(options, self.factory.clone()))
    }
}

impl<F: ClientFactory + Clone> StorageClientFactory for StorageClientRequestFactory<F> {
    fn client_options_read_only(&self) -> ClientOptions {
        self.options.clone()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

fn credential_from_headers(headers: &HeaderMap) -> Result<(String, AuthMethod)> {
    let authorization = header_str(headers, AUTHORIZATION_HEADER);
    if let Some(rest) = authorization.strip_prefix(BEARER_PREFIX) {
        if rest.is_empty() || rest.starts_with(' ') {
            let oauth_token = rest.trim();
            if oauth_token.is_empty() {
                return Err(ClientError::unauthorized(
                    "OAuth token must be provided in Authorization header with Bearer prefix.",
                ));
            }
            return Ok((oauth_token.to_string(), AuthMethod::OAuth));
        }
    }

    let token = header_str(headers, TOKEN_HEADER);
    if token.is_empty() {
        return Err(ClientError::unauthorized(format!(
            "Storage API token must be supplied in {} header or OAuth token in {} header with Bearer prefix.",
            TOKEN_HEADER, AUTHORIZATION_HEADER
        )));
    }
    Ok((token.to_string(), AuthMethod::Token))
}

fn run_id_from_headers(headers: &HeaderMap, options: &ClientOptions) -> String {
    let run_id = header_str(headers, RUN_ID_HEADER);
    if !run_id.is_empty() {
        return run_id.to_string();
    }
    match options.run_id_generator() {
        Some(generator) => generator(options),
        None => generate_run_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StorageApi;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;

    fn factory_options() -> ClientOptions {
        let mut options = ClientOptions::new();
        options
            .set_url(Some("https://connection.example.com".into()))
            .unwrap();
        options
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    fn assert_unauthorized(result: Result<ClientWrapper>, message: &str) {
        match result {
            Err(ClientError::Authentication { status, message: actual }) => {
                assert_eq!(status, 401);
                assert_eq!(actual, message);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an authentication error"),
        }
    }

    const NO_TOKEN: &str = "Storage API token must be supplied in X-StorageApi-Token header or OAuth token in Authorization header with Bearer prefix.";

    #[test]
    fn test_requires_token_header() {
        let factory = StorageClientRequestFactory::new(ClientOptions::new());
        assert_unauthorized(factory.create_client_wrapper(&HeaderMap::new(), None), NO_TOKEN);
        assert_unauthorized(
            factory.create_client_wrapper(&headers(&[("x-storageapi-token", "")]), None),
            NO_TOKEN,
        );
    }

    #[test]
    fn test_storage_token() {
        let factory = StorageClientRequestFactory::new(factory_options());
        let mut wrapper = factory
            .create_client_wrapper(&headers(&[("x-storageapi-token", "my-token")]), None)
            .unwrap();

        let options = wrapper.client_options_read_only();
        assert_eq!(options.token(), Some("my-token"));
        assert_eq!(options.auth_method(), Some(AuthMethod::Token));
        assert!(options.run_id().unwrap().starts_with("run-"));
        assert_eq!(wrapper.auth_method().unwrap(), AuthMethod::Token);
        assert_eq!(wrapper.basic_client().unwrap().token_string(), "my-token");
    }

    #[test]
    fn test_oauth_token_takes_precedence() {
        let factory = StorageClientRequestFactory::new(factory_options());
        let mut wrapper = factory
            .create_client_wrapper(
                &headers(&[
                    ("x-storageapi-token", "my-token"),
                    ("authorization", "Bearer oauth-token"),
                ]),
                None,
            )
            .unwrap();

        let options = wrapper.client_options_read_only();
        assert_eq!(options.token(), Some("oauth-token"));
        assert_eq!(options.oauth_token(), Some("oauth-token"));
        assert_eq!(wrapper.auth_method().unwrap(), AuthMethod::OAuth);
        assert_eq!(wrapper.basic_client().unwrap().token_string(), "oauth-token");
    }

    #[test]
    fn test_empty_bearer_token() {
        let factory = StorageClientRequestFactory::new(factory_options());
        for value in ["Bearer", "Bearer "] {
            let mut map = HeaderMap::new();
            map.insert("authorization", HeaderValue::from_static(value));
            map.insert("x-storageapi-token", HeaderValue::from_static("my-token"));
            assert_unauthorized(
                factory.create_client_wrapper(&map, None),
                "OAuth token must be provided in Authorization header with Bearer prefix.",
            );
        }
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let factory = StorageClientRequestFactory::new(factory_options());
        assert_unauthorized(
            factory.create_client_wrapper(&headers(&[("authorization", "Basic dXNlcjpwYXNz")]), None),
            NO_TOKEN,
        );
        // "Bearerx" is not the Bearer scheme
        let wrapper = factory
            .create_client_wrapper(
                &headers(&[("authorization", "Bearerx"), ("x-storageapi-token", "t")]),
                None,
            )
            .unwrap();
        assert_eq!(
            wrapper.client_options_read_only().auth_method(),
            Some(AuthMethod::Token)
        );
    }

    #[test]
    fn test_run_id_from_header_wins_over_generator() {
        let mut options = factory_options();
        options.set_run_id_generator(Some(Arc::new(|o: &ClientOptions| {
            format!("foo-{}", o.url().unwrap_or_default())
        })));
        let factory = StorageClientRequestFactory::new(options);

        let wrapper = factory
            .create_client_wrapper(
                &headers(&[("x-storageapi-token", "t"), ("x-kbc-runid", "123")]),
                None,
            )
            .unwrap();
        assert_eq!(wrapper.client_options_read_only().run_id(), Some("123"));

        let wrapper = factory
            .create_client_wrapper(&headers(&[("x-storageapi-token", "t")]), None)
            .unwrap();
        assert!(wrapper
            .client_options_read_only()
            .run_id()
            .unwrap()
            .starts_with("foo-http"));
    }

    #[test]
    fn test_extra_client_options() {
        let factory = StorageClientRequestFactory::new(factory_options());
        let mut extra = ClientOptions::new();
        extra.set_branch_id(Some("1234".into()));

        let wrapper = factory
            .create_client_wrapper(&headers(&[("x-storageapi-token", "t")]), Some(&extra))
            .unwrap();
        assert_eq!(wrapper.client_options_read_only().branch_id(), Some("1234"));
    }

    #[test]
    fn test_factory_options_not_modified() {
        let options = factory_options();
        let factory = StorageClientRequestFactory::new(options.clone());
        factory
            .create_client_wrapper(&headers(&[("x-storageapi-token", "t")]), None)
            .unwrap();

        assert_eq!(options.token(), None);
        assert_eq!(factory.client_options_read_only().token(), None);
        assert_eq!(factory.client_options_read_only().run_id(), None);

        factory
            .client_options_read_only()
            .set_url(Some("https://bar".into()))
            .unwrap();
        assert_eq!(
            factory.client_options_read_only().url(),
            Some("https://connection.example.com")
        );
    }
}
