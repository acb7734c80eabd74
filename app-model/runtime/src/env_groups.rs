use anyhow::{Context, Result};
use porter_app_model_core::{EnvGroup, EnvGroupFetcher, EnvGroupRef, EnvMap, FetchError};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Serves env groups from a YAML document of the form:
///
/// ```yaml
/// groups:
///   - name: shared
///     version: 2
///     variables: { LOG_LEVEL: info }
///     secretVariables: { API_KEY: hunter2 }
/// ```
#[derive(Clone, Debug, Default)]
pub struct FileEnvGroups {
    groups: Vec<EnvGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupsFile {
    #[serde(default)]
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GroupEntry {
    name: String,
    version: u32,

    #[serde(default)]
    variables: EnvMap,

    #[serde(default)]
    secret_variables: EnvMap,
}

// === impl FileEnvGroups ===

impl FileEnvGroups {
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_slice(&bytes)
            .with_context(|| format!("invalid env groups in {}", path.display()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let GroupsFile { groups } = serde_yaml::from_slice(bytes)?;
        let mut loaded = Vec::with_capacity(groups.len());
        for entry in groups {
            if entry.version == EnvGroupRef::LATEST {
                anyhow::bail!("env group `{}` must have a non-zero version", entry.name);
            }
            if loaded
                .iter()
                .any(|g: &EnvGroup| g.name == entry.name && g.version == entry.version)
            {
                anyhow::bail!(
                    "env group `{}` version {} is declared twice",
                    entry.name,
                    entry.version
                );
            }
            loaded.push(EnvGroup {
                name: entry.name,
                version: entry.version,
                variables: entry.variables,
                secret_variables: entry.secret_variables,
            });
        }
        debug!(groups = loaded.len(), "Loaded env groups");
        Ok(Self { groups: loaded })
    }
}

#[async_trait::async_trait]
impl EnvGroupFetcher for FileEnvGroups {
    async fn get(&self, name: &str, version: u32) -> Result<EnvGroup, FetchError> {
        let mut versions = self.groups.iter().filter(|g| g.name == name);
        let found = if version == EnvGroupRef::LATEST {
            versions.max_by_key(|g| g.version)
        } else {
            versions.find(|g| g.version == version)
        };
        found.cloned().ok_or_else(|| FetchError::NotFound {
            name: name.to_string(),
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GROUPS: &str = r#"
groups:
  - name: shared
    version: 1
    variables: { REGION: us-east-1 }
  - name: shared
    version: 3
    variables: { REGION: us-east-2 }
    secretVariables: { TOKEN: s3cr3t }
  - name: db
    version: 2
    variables: { DB_HOST: db.internal }
"#;

    #[tokio::test]
    async fn serves_exact_and_latest_versions() {
        let groups = FileEnvGroups::from_slice(GROUPS.as_bytes()).unwrap();

        let v1 = groups.get("shared", 1).await.unwrap();
        assert_eq!(v1.variables.get("REGION").map(String::as_str), Some("us-east-1"));
        assert!(v1.secret_variables.is_empty());

        let latest = groups.get("shared", EnvGroupRef::LATEST).await.unwrap();
        assert_eq!(latest.version, 3);
        assert_eq!(
            latest.secret_variables.get("TOKEN").map(String::as_str),
            Some("s3cr3t")
        );
    }

    #[tokio::test]
    async fn missing_groups_are_not_found() {
        let groups = FileEnvGroups::from_slice(GROUPS.as_bytes()).unwrap();
        for (name, version) in [("shared", 2), ("cache", 0)] {
            let err = groups.get(name, version).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    FetchError::NotFound { name: ref n, version: v } if n == name && v == version
                ),
                "{err}"
            );
        }
    }

    #[test]
    fn rejects_invalid_files() {
        assert!(FileEnvGroups::from_slice(b"groups:\n  - name: a\n    version: 0\n").is_err());
        assert!(FileEnvGroups::from_slice(
            b"groups:\n  - name: a\n    version: 1\n  - name: a\n    version: 1\n"
        )
        .is_err());
        assert!(FileEnvGroups::from_slice(b"groups:\n  - name: a\n").is_err());
        assert!(FileEnvGroups::from_slice(b"envGroups: []\n").is_err());
    }
}
