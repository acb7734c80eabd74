//! The `v2beta1` preview-environment document: lists of builds, apps and addons.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

pub const VERSION: &str = "v2beta1";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PreviewSpec {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub builds: Vec<BuildEntry>,

    #[serde(default)]
    pub apps: Vec<AppEntry>,

    #[serde(default)]
    pub addons: Vec<AddonEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BuildEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buildpacks: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AppEntry {
    pub name: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Names the entry in `builds` that produces this app's image.
    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub helm_chart: Option<HelmChart>,

    #[serde(default)]
    pub values: Mapping,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AddonEntry {
    pub name: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    pub helm_chart: HelmChart,

    #[serde(default)]
    pub values: Mapping,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct HelmChart {
    pub name: String,

    #[serde(default, alias = "repoUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use porter_app_model_core::Error;

    #[test]
    fn decodes_lists_in_order() {
        let doc = serde_yaml::from_str(
            r#"
version: v2beta1
builds:
  - name: api-build
    method: docker
    dockerfile: Dockerfile
apps:
  - name: api
    build: api-build
    depends_on: [postgres]
    helm_chart: {name: web}
    values:
      replicaCount: 1
addons:
  - name: postgres
    helm_chart: {name: postgresql, url: "https://charts.example.com", version: "12.1.0"}
"#,
        )
        .unwrap();
        let spec: PreviewSpec = decode::from_value(doc).unwrap();
        assert_eq!(spec.version.as_deref(), Some(VERSION));
        assert_eq!(spec.builds[0].name, "api-build");
        assert_eq!(spec.apps[0].depends_on, ["postgres"]);
        assert_eq!(spec.apps[0].build.as_deref(), Some("api-build"));
        assert_eq!(spec.addons[0].helm_chart.version.as_deref(), Some("12.1.0"));
    }

    #[test]
    fn names_are_required() {
        let doc = serde_yaml::from_str("apps:\n  - depends_on: [a]\n").unwrap();
        let err = decode::from_value::<PreviewSpec>(doc).unwrap_err();
        assert!(
            matches!(err, Error::MissingRequired { ref path } if path == "apps[0].name"),
            "{err}"
        );
    }
}
