//! Types shared by options, clients and the wrapper

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved branch id meaning "whatever branch is marked default"
pub const BRANCH_DEFAULT: &str = "default";

/// Token-info record returned by token verification
pub type TokenInfo = serde_json::Map<String, serde_json::Value>;

/// Fresh run id (`run-` followed by a random suffix)
pub fn generate_run_id() -> String {
    format!("run-{}", uuid::Uuid::new_v4().simple())
}

/// A branch of the project, as reported by the branch listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Numeric branch id, kept as a string
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether this is the default (main) branch
    pub is_default: bool,
}

impl Branch {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_default,
        }
    }
}

/// How the credential is presented to the Storage API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Classic `X-StorageApi-Token` header
    #[default]
    Token,
    /// `Authorization: Bearer` header
    OAuth,
}

impl AuthMethod {
    pub const TOKEN: &'static str = "token";
    pub const OAUTH: &'static str = "oauth";

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Token => Self::TOKEN,
            AuthMethod::OAuth => Self::OAUTH,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            Self::TOKEN => Ok(AuthMethod::Token),
            Self::OAUTH => Ok(AuthMethod::OAuth),
            other => Err(ClientError::InvalidConfiguration(format!(
                "authMethod must be \"{}\" or \"{}\". \"{}\" given.",
                Self::TOKEN,
                Self::OAUTH,
                other
            ))),
        }
    }
}

/// Backend sizing hints forwarded to the Storage API
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl BackendConfiguration {
    pub fn new(context: Option<String>, size: Option<String>) -> Self {
        Self { context, size }
    }

    /// JSON form used for the `X-KBC-Backend` header
    pub fn to_header_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
