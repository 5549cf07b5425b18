//! Core types for stratus-deploy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// Longest function name the platform accepts.
pub const MAX_FUNCTION_NAME_LEN: usize = 64;

/// Longest layer name the platform accepts.
pub const MAX_LAYER_NAME_LEN: usize = 140;

/// Logical name of a remote function unit.
///
/// The name is the function's identity on the platform: deploying twice with
/// the same name updates the existing unit instead of creating another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionName(String);

impl FunctionName {
    /// Create a function name, validating it against the platform's rules.
    pub fn new(name: impl Into<String>) -> DeployResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(DeployError::InvalidName("name is empty".to_owned()));
        }
        if name.len() > MAX_FUNCTION_NAME_LEN {
            return Err(DeployError::InvalidName(format!(
                "{name} is longer than {MAX_FUNCTION_NAME_LEN} characters"
            )));
        }
        if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(DeployError::InvalidName(format!(
                "{name} contains disallowed character {bad:?}"
            )));
        }

        Ok(Self(name))
    }

    /// Derive the function name for an owning resource.
    ///
    /// The result is `{prefix}{owner_id}` with any character the platform
    /// rejects replaced by `-`, so one owner always maps to one function.
    pub fn for_owner(prefix: &str, owner_id: &str) -> DeployResult<Self> {
        let name: String = prefix
            .chars()
            .chain(owner_id.chars())
            .map(|c| if is_name_char(c) { c } else { '-' })
            .collect();
        Self::new(name)
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check a layer name before it is used as a URL path segment.
///
/// Layer names share the function name alphabet.
pub fn validate_layer_name(name: &str) -> DeployResult<()> {
    if name.is_empty() || name.len() > MAX_LAYER_NAME_LEN {
        return Err(DeployError::layer_resolution(format!(
            "layer name must be 1 to {MAX_LAYER_NAME_LEN} characters, got {}",
            name.len()
        )));
    }
    if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(DeployError::layer_resolution(format!(
            "layer name {name:?} contains disallowed character {bad:?}"
        )));
    }
    Ok(())
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FunctionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FunctionName {
    type Error = DeployError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FunctionName> for String {
    fn from(name: FunctionName) -> Self {
        name.0
    }
}

/// Reference to one published version of a shared runtime layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerVersionRef(String);

impl LayerVersionRef {
    /// Create a layer version reference from its ARN.
    #[must_use]
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    /// Get the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LayerVersionRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
