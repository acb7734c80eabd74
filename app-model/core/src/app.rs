use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Environment variables in declaration order. Keys are unique and non-empty.
pub type EnvMap = IndexMap<String, String>;

/// The canonical application every dialect reduces to.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct App {
    pub name: String,
    pub services: IndexMap<String, Service>,

    /// A job run once per deploy, before services roll.
    pub predeploy: Option<Service>,

    pub build: Option<Build>,
    pub image: Option<ImageRef>,
    pub env: EnvMap,
    pub env_group_refs: Vec<EnvGroupRef>,
}

/// Fields shared by every kind of service, plus the kind-specific [`ServiceConfig`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Service {
    /// The start command. Empty when the image provides one.
    pub run: String,
    pub instances: i32,

    /// Zero when the service exposes no port.
    pub port: i32,
    pub cpu_cores: f32,
    pub ram_megabytes: i32,
    pub config: ServiceConfig,

    /// Helm values the canonical fields do not model. Emitters merge them beneath the values
    /// they synthesize.
    #[serde(skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub passthrough: serde_yaml::Mapping,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceConfig {
    Web(WebConfig),
    Worker(WorkerConfig),
    Job(JobConfig),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Web,
    Worker,
    Job,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WebConfig {
    pub autoscaling: Option<Autoscaling>,
    pub health_check: Option<HealthCheck>,
    pub domains: Vec<Domain>,
    pub private: bool,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub ingress_annotations: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkerConfig {
    pub autoscaling: Option<Autoscaling>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobConfig {
    pub allow_concurrent: bool,

    /// Empty when the job is not scheduled.
    pub cron: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Autoscaling {
    pub enabled: bool,
    pub min_instances: i32,
    pub max_instances: i32,
    pub cpu_threshold_percent: i32,
    pub memory_threshold_percent: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub enabled: bool,
    pub http_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Build {
    pub context: String,
    pub method: BuildMethod,
}

/// How an image is produced. Each method carries exactly the fields it needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum BuildMethod {
    Pack {
        builder: String,
        buildpacks: Vec<String>,
    },
    Docker {
        dockerfile: String,
    },
    Registry {
        image: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnvGroupRef {
    pub name: String,

    /// Zero selects the latest version.
    pub version: u32,
}

// === impl App ===

impl App {
    /// Looks up a service by name. The predeploy job is not a member of `services`.
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }
}

// === impl Service ===

impl Service {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            run: String::new(),
            instances: 0,
            port: 0,
            cpu_cores: 0.0,
            ram_megabytes: 0,
            config,
            passthrough: Default::default(),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.config.kind()
    }

    pub fn autoscaling(&self) -> Option<&Autoscaling> {
        match &self.config {
            ServiceConfig::Web(web) => web.autoscaling.as_ref(),
            ServiceConfig::Worker(worker) => worker.autoscaling.as_ref(),
            ServiceConfig::Job(_) => None,
        }
    }
}

// === impl ServiceConfig ===

impl ServiceConfig {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Web(_) => ServiceKind::Web,
            Self::Worker(_) => ServiceKind::Worker,
            Self::Job(_) => ServiceKind::Job,
        }
    }
}

impl From<ServiceKind> for ServiceConfig {
    fn from(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::Web => Self::Web(WebConfig::default()),
            ServiceKind::Worker => Self::Worker(WorkerConfig::default()),
            ServiceKind::Job => Self::Job(JobConfig::default()),
        }
    }
}

// === impl ServiceKind ===

impl ServiceKind {
    pub const ALL: [Self; 3] = [Self::Web, Self::Worker, Self::Job];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Worker => "worker",
            Self::Job => "job",
        }
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "web" => Ok(Self::Web),
            "worker" => Ok(Self::Worker),
            "job" => Ok(Self::Job),
            s => Err(Error::invalid_value(
                "type",
                format!("{s:?}"),
                "one of web, worker, job",
            )),
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl Autoscaling ===

impl Autoscaling {
    /// Checks the bounds that apply once autoscaling is enabled.
    ///
    /// Dialects spell the fields differently, so `key` names each field under `path`.
    pub fn validate(
        &self,
        path: &str,
        key: impl Fn(AutoscalingField) -> &'static str,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let invalid = |field, got: i32, want: String| {
            Err(Error::invalid_value(
                format!("{path}.{}", key(field)),
                got.to_string(),
                want,
            ))
        };

        if self.min_instances < 0 {
            return invalid(
                AutoscalingField::MinInstances,
                self.min_instances,
                "a non-negative count".into(),
            );
        }
        if self.max_instances < self.min_instances {
            return invalid(
                AutoscalingField::MaxInstances,
                self.max_instances,
                format!("at least the minimum ({})", self.min_instances),
            );
        }
        for (field, pct) in [
            (AutoscalingField::CpuThresholdPercent, self.cpu_threshold_percent),
            (AutoscalingField::MemoryThresholdPercent, self.memory_threshold_percent),
        ] {
            if !(0..=100).contains(&pct) {
                return invalid(field, pct, "a percentage between 0 and 100".into());
            }
        }
        Ok(())
    }
}

/// Names an [`Autoscaling`] field independently of how a dialect spells it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AutoscalingField {
    MinInstances,
    MaxInstances,
    CpuThresholdPercent,
    MemoryThresholdPercent,
}

// === impl HealthCheck ===

impl HealthCheck {
    pub fn validate(&self, path_field: &str) -> Result<()> {
        if self.enabled && self.http_path.is_empty() {
            return Err(Error::missing(path_field));
        }
        Ok(())
    }
}

// === impl Build ===

impl Build {
    pub const DEFAULT_CONTEXT: &'static str = ".";

    pub fn method_name(&self) -> &'static str {
        self.method.as_str()
    }
}

impl BuildMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pack { .. } => "pack",
            Self::Docker { .. } => "docker",
            Self::Registry { .. } => "registry",
        }
    }
}

// === impl ImageRef ===

impl ImageRef {
    /// Splits `repo:tag` at the first colon.
    ///
    /// Repositories that carry a registry port (`host:5000/app:tag`) split at the port.
    pub fn parse(image: &str) -> Option<Self> {
        let (repository, tag) = image.split_once(':')?;
        if repository.is_empty() || tag.is_empty() {
            return None;
        }
        Some(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

// === impl EnvGroupRef ===

impl EnvGroupRef {
    pub const LATEST: u32 = 0;

    pub fn is_latest(&self) -> bool {
        self.version == Self::LATEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_refs_split_at_first_colon() {
        assert_eq!(
            ImageRef::parse("nginx:1.25"),
            Some(ImageRef {
                repository: "nginx".into(),
                tag: "1.25".into()
            })
        );
        assert_eq!(ImageRef::parse("nginx"), None);
        assert_eq!(ImageRef::parse(":latest"), None);
        assert_eq!(ImageRef::parse("nginx:"), None);

        // Registry ports are not understood.
        assert_eq!(
            ImageRef::parse("registry.example.com:5000/app:tag"),
            Some(ImageRef {
                repository: "registry.example.com".into(),
                tag: "5000/app:tag".into()
            })
        );
    }

    #[test]
    fn autoscaling_bounds() {
        let scaling = Autoscaling {
            enabled: true,
            min_instances: 1,
            max_instances: 3,
            cpu_threshold_percent: 60,
            memory_threshold_percent: 60,
        };
        let key = |field| match field {
            AutoscalingField::MinInstances => "min",
            AutoscalingField::MaxInstances => "max",
            AutoscalingField::CpuThresholdPercent => "cpu",
            AutoscalingField::MemoryThresholdPercent => "memory",
        };
        assert!(scaling.validate("autoscaling", key).is_ok());

        let inverted = Autoscaling {
            max_instances: 0,
            ..scaling
        };
        assert!(matches!(
            inverted.validate("autoscaling", key),
            Err(Error::InvalidValue { ref field, .. }) if field == "autoscaling.max"
        ));

        let hot = Autoscaling {
            memory_threshold_percent: 101,
            ..scaling
        };
        assert!(matches!(
            hot.validate("autoscaling", key),
            Err(Error::InvalidValue { ref field, .. }) if field == "autoscaling.memory"
        ));

        // Disabled autoscaling is not checked.
        let disabled = Autoscaling {
            enabled: false,
            ..inverted
        };
        assert!(disabled.validate("autoscaling", key).is_ok());
    }

    #[test]
    fn enabled_health_checks_need_a_path() {
        let check = HealthCheck {
            enabled: true,
            http_path: String::new(),
        };
        assert!(matches!(
            check.validate("healthCheck.httpPath"),
            Err(Error::MissingRequired { ref path }) if path == "healthCheck.httpPath"
        ));
        assert!(HealthCheck::default().validate("healthCheck.httpPath").is_ok());
    }

    #[test]
    fn service_kinds_parse() {
        for kind in ServiceKind::ALL {
            assert_eq!(kind.as_str().parse::<ServiceKind>().unwrap(), kind);
        }
        assert!("cron".parse::<ServiceKind>().is_err());
        assert!("Web".parse::<ServiceKind>().is_err());
    }
}
