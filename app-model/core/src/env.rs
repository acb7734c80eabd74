use crate::EnvMap;

/// A materialized version of an externally-managed env group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvGroup {
    pub name: String,
    pub version: u32,
    pub variables: EnvMap,
    pub secret_variables: EnvMap,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("env group `{name}` (version {version}) not found")]
    NotFound { name: String, version: u32 },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Looks up env groups on behalf of the resolver.
///
/// Implementations own storage, caching and timeouts; a `version` of zero asks for the latest
/// version of the group.
#[async_trait::async_trait]
pub trait EnvGroupFetcher {
    async fn get(&self, name: &str, version: u32) -> Result<EnvGroup, FetchError>;
}

/// Where an application's runtime env is materialized.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeploymentTarget {
    pub selector_kind: String,
    pub selector_value: String,
}

// === impl DeploymentTarget ===

impl DeploymentTarget {
    pub const NAMESPACE: &'static str = "namespace";

    pub fn namespace(ns: impl Into<String>) -> Self {
        Self {
            selector_kind: Self::NAMESPACE.to_string(),
            selector_value: ns.into(),
        }
    }
}
