//! Read-only view over a verified Storage API token

use crate::types::TokenInfo;
use serde_json::Value;
use std::fmt;

/// A verified Storage API token.
///
/// Wraps the token-info record returned by token verification together with
/// the secret it was verified from. Accessors never fail; absent fields map
/// to `None`, empty collections or documented defaults.
#[derive(Clone)]
pub struct StorageApiToken {
    token_info: TokenInfo,
    token_value: String,
}

impl StorageApiToken {
    pub fn new(token_info: TokenInfo, token_value: impl Into<String>) -> Self {
        Self {
            token_info,
            token_value: token_value.into(),
        }
    }

    pub fn token_info(&self) -> &TokenInfo {
        &self.token_info
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    pub fn project_id(&self) -> Option<String> {
        self.owner_field("id").and_then(scalar_to_string)
    }

    pub fn token_id(&self) -> Option<String> {
        self.token_info.get("id").and_then(scalar_to_string)
    }

    pub fn features(&self) -> Vec<String> {
        self.owner_field("features")
            .map(string_list)
            .unwrap_or_default()
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features().iter().any(|f| f == feature)
    }

    /// Purchased pay-as-you-go credits, 0.0 when the project has none
    pub fn pay_as_you_go_purchased_credits(&self) -> f64 {
        self.owner_field("payAsYouGo")
            .and_then(|p| p.get("purchasedCredits"))
            .and_then(|c| match c {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    pub fn saml_user_id(&self) -> Option<String> {
        self.admin_field("samlParameters")
            .and_then(|s| s.get("userId"))
            .and_then(scalar_to_string)
    }

    pub fn file_storage_provider(&self) -> Option<String> {
        self.owner_field("fileStorageProvider").and_then(scalar_to_string)
    }

    pub fn project_name(&self) -> Option<String> {
        self.owner_field("name").and_then(scalar_to_string)
    }

    pub fn token_description(&self) -> Option<String> {
        self.token_info.get("description").and_then(scalar_to_string)
    }

    pub fn role(&self) -> Option<String> {
        self.admin_field("role").and_then(scalar_to_string)
    }

    pub fn roles(&self) -> Vec<String> {
        self.role().filter(|r| !r.is_empty()).into_iter().collect()
    }

    /// Components this token may run.
    ///
    /// `None` means no restriction; `Some(vec![])` means nothing is allowed.
    pub fn allowed_components(&self) -> Option<Vec<String>> {
        match self.token_info.get("componentAccess") {
            None | Some(Value::Null) => None,
            Some(value) => Some(string_list(value)),
        }
    }

    /// Names of the `can*` flags that are set to `true`, in record order
    pub fn permissions(&self) -> Vec<String> {
        self.token_info
            .iter()
            .filter(|(_, value)| matches!(value, Value::Bool(true)))
            .map(|(key, _)| key)
            .filter(|key| is_permission_key(key))
            .cloned()
            .collect()
    }

    pub fn is_admin_token(&self) -> bool {
        self.token_info.get("admin").is_some_and(is_truthy)
    }

    fn owner_field(&self, key: &str) -> Option<&Value> {
        self.token_info.get("owner").and_then(|o| o.get(key))
    }

    fn admin_field(&self, key: &str) -> Option<&Value> {
        self.token_info.get("admin").and_then(|a| a.get(key))
    }
}

impl fmt::Debug for StorageApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageApiToken")
            .field("token_id", &self.token_id())
            .field("project_id", &self.project_id())
            .field("token_value", &"***")
            .finish()
    }
}

/// `can` (any case) followed by one or more ASCII letters
fn is_permission_key(key: &str) -> bool {
    match (key.get(..3), key.get(3..)) {
        (Some(prefix), Some(rest)) => {
            prefix.eq_ignore_ascii_case("can")
                && !rest.is_empty()
                && rest.chars().all(|c| c.is_ascii_alphabetic())
        }
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_from(value: Value) -> StorageApiToken {
        let info = match value {
            Value::Object(map) => map,
            _ => panic!("token info must be an object"),
        };
        StorageApiToken::new(info, "tokenValue")
    }

    #[test]
    fn test_accessors() {
        let record = json!({
            "id": "123",
            "description": "token description",
            "canManageBuckets": true,
            "canManageTokens": false,
            "canCreateJobs": true,
            "owner": {
                "id": "456",
                "name": "my project",
                "features": ["foo", "bar"],
                "payAsYouGo": {"purchasedCredits": 1.23},
                "fileStorageProvider": "aws",
                "defaultBackend": "snowflake",
                "isBYODB": true
            },
            "admin": {
                "samlParameters": {"userId": "789"},
                "role": "admin",
                "id": "246"
            },
            "componentAccess": ["keboola.component"]
        });
        let token = token_from(record.clone());

        assert_eq!(token.token_id().as_deref(), Some("123"));
        assert_eq!(token.token_value(), "tokenValue");
        assert_eq!(token.project_id().as_deref(), Some("456"));
        assert_eq!(token.features(), vec!["foo", "bar"]);
        assert!(token.has_feature("foo"));
        assert!(!token.has_feature("baz"));
        assert_eq!(token.pay_as_you_go_purchased_credits(), 1.23);
        assert_eq!(token.saml_user_id().as_deref(), Some("789"));
        assert_eq!(token.file_storage_provider().as_deref(), Some("aws"));
        assert_eq!(token.project_name().as_deref(), Some("my project"));
        assert_eq!(token.token_description().as_deref(), Some("token description"));
        assert_eq!(token.role().as_deref(), Some("admin"));
        assert_eq!(token.roles(), vec!["admin"]);
        assert_eq!(
            token.allowed_components(),
            Some(vec!["keboola.component".to_string()])
        );
        assert_eq!(token.permissions(), vec!["canManageBuckets", "canCreateJobs"]);
        assert!(token.is_admin_token());
        assert_eq!(Value::Object(token.token_info().clone()), record);

        let empty = token_from(json!({}));
        assert!(!empty.is_admin_token());
        assert!(empty.features().is_empty());
    }

    #[test]
    fn test_accessors_numeric_ids_and_odd_keys() {
        let token = token_from(json!({
            "id": 123,
            "description": "token description",
            "canCreateJobs": true,
            "canManageBuckets": true,
            "youcanttouchthis": true,
            "canManageBuckets\"": true,
            "can": true,
            "owner": {
                "id": 456,
                "name": "my project",
                "payAsYouGo": {"purchasedCredits": 1},
                "defaultBackend": "snowflake"
            },
            "admin": {
                "samlParameters": {"userId": 789},
                "id": "246"
            }
        }));

        assert_eq!(token.permissions(), vec!["canCreateJobs", "canManageBuckets"]);
        assert_eq!(token.token_id().as_deref(), Some("123"));
        assert_eq!(token.project_id().as_deref(), Some("456"));
        assert_eq!(token.pay_as_you_go_purchased_credits(), 1.0);
        assert_eq!(token.saml_user_id().as_deref(), Some("789"));
    }

    #[test]
    fn test_permission_prefix_is_case_insensitive() {
        assert!(is_permission_key("CanReadAllFileUploads"));
        assert!(is_permission_key("canx"));
        assert!(!is_permission_key("can"));
        assert!(!is_permission_key("can_manage"));
        assert!(!is_permission_key("ca"));
    }

    #[test]
    fn test_purchased_credits_missing() {
        let token = token_from(json!({
            "id": 123,
            "owner": {"id": 456, "name": "my project"}
        }));
        assert_eq!(token.pay_as_you_go_purchased_credits(), 0.0);
    }

    #[test]
    fn test_no_roles() {
        let token = token_from(json!({
            "id": "123",
            "admin": {"samlParameters": {"userId": "789"}, "id": "246"}
        }));
        assert_eq!(token.role(), None);
        assert!(token.roles().is_empty());
    }

    #[test]
    fn test_component_access_empty_vs_absent() {
        let limited = token_from(json!({
            "id": "123",
            "owner": {"id": "456", "features": []},
            "componentAccess": []
        }));
        assert_eq!(limited.allowed_components(), Some(vec![]));

        let unlimited = token_from(json!({
            "id": "123",
            "owner": {"id": "456", "features": []}
        }));
        assert_eq!(unlimited.allowed_components(), None);
    }

    #[test]
    fn test_saml_not_set() {
        let token = token_from(json!({"admin": {"id": "246"}}));
        assert_eq!(token.saml_user_id(), None);
        assert!(token.is_admin_token());
    }

    #[test]
    fn test_debug_hides_secret() {
        let token = token_from(json!({"id": "1"}));
        assert!(!format!("{:?}", token).contains("tokenValue"));
    }
}
