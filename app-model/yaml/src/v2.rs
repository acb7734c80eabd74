//! The strict `v2` Porter-YAML document.
//!
//! Unknown fields are rejected at every level so that typos fail loudly instead of being dropped.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const VERSION: &str = "v2";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppSpec {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub services: IndexMap<String, ServiceSpec>,

    /// Runs once per deploy before services roll out. Always a job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predeploy: Option<ServiceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSpec>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,

    #[serde(default, alias = "env_groups", skip_serializing_if = "Vec::is_empty")]
    pub env_groups: Vec<EnvGroupSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceSpec {
    /// One of `web`, `worker` or `job`. Required for services; optional for `predeploy`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_megabytes: Option<i32>,

    // === web and worker ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<AutoscalingSpec>,

    // === web ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<DomainSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_annotations: Option<IndexMap<String, String>>,

    // === job ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_concurrent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AutoscalingSpec {
    pub enabled: bool,
    pub min_instances: i32,
    pub max_instances: i32,
    pub cpu_threshold_percent: i32,
    pub memory_threshold_percent: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HealthCheckSpec {
    pub enabled: bool,
    pub http_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DomainSpec {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// One of `pack`, `docker` or `registry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buildpacks: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ImageSpec {
    pub repository: String,

    #[serde(default)]
    pub tag: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EnvGroupSpec {
    pub name: String,

    /// Zero, or absent, selects the latest version.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// The JSON Schema describing strict `v2` documents.
pub fn schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(AppSpec)
}
