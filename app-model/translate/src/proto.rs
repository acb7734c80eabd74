//! The canonical protobuf form of an application, as carried between the edge and the control
//! plane.
//!
//! Maps on the wire are unordered, so services and env vars decode in name order. Passthrough
//! values are not carried.

use crate::build::BuildParts;
use porter_app_model_core as model;
use porter_app_model_core::{names, AutoscalingField, Error, Result};
use porter_app_model_yaml::coerce;
use prost::Message;
use std::collections::BTreeMap;

#[derive(Clone, PartialEq, Message)]
pub struct PorterApp {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(btree_map = "string, message", tag = "2")]
    pub services: BTreeMap<String, Service>,
    #[prost(message, optional, tag = "3")]
    pub build: Option<Build>,
    #[prost(message, optional, tag = "4")]
    pub image: Option<AppImage>,
    #[prost(btree_map = "string, string", tag = "5")]
    pub env: BTreeMap<String, String>,
    #[prost(message, optional, tag = "6")]
    pub predeploy: Option<Service>,
    #[prost(message, repeated, tag = "7")]
    pub env_groups: Vec<EnvGroup>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Service {
    #[prost(string, tag = "1")]
    pub run: String,
    #[prost(enumeration = "ServiceType", tag = "2")]
    pub r#type: i32,
    #[prost(int32, tag = "3")]
    pub instances: i32,
    #[prost(int32, tag = "4")]
    pub port: i32,
    #[prost(float, tag = "5")]
    pub cpu_cores: f32,
    #[prost(int32, tag = "6")]
    pub ram_megabytes: i32,
    #[prost(oneof = "service::Config", tags = "10, 11, 12")]
    pub config: Option<service::Config>,
}

pub mod service {
    use super::{JobServiceConfig, WebServiceConfig, WorkerServiceConfig};

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Config {
        #[prost(message, tag = "10")]
        WebConfig(WebServiceConfig),
        #[prost(message, tag = "11")]
        WorkerConfig(WorkerServiceConfig),
        #[prost(message, tag = "12")]
        JobConfig(JobServiceConfig),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ServiceType {
    Unspecified = 0,
    Web = 1,
    Worker = 2,
    Job = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct WebServiceConfig {
    #[prost(message, optional, tag = "1")]
    pub autoscaling: Option<Autoscaling>,
    #[prost(message, optional, tag = "2")]
    pub health_check: Option<HealthCheck>,
    #[prost(message, repeated, tag = "3")]
    pub domains: Vec<Domain>,
    #[prost(bool, tag = "4")]
    pub private: bool,
    #[prost(btree_map = "string, string", tag = "5")]
    pub ingress_annotations: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct WorkerServiceConfig {
    #[prost(message, optional, tag = "1")]
    pub autoscaling: Option<Autoscaling>,
}

#[derive(Clone, PartialEq, Message)]
pub struct JobServiceConfig {
    #[prost(bool, tag = "1")]
    pub allow_concurrent: bool,
    #[prost(string, tag = "2")]
    pub cron: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Autoscaling {
    #[prost(bool, tag = "1")]
    pub enabled: bool,
    #[prost(int32, tag = "2")]
    pub min_instances: i32,
    #[prost(int32, tag = "3")]
    pub max_instances: i32,
    #[prost(int32, tag = "4")]
    pub cpu_threshold_percent: i32,
    #[prost(int32, tag = "5")]
    pub memory_threshold_percent: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct HealthCheck {
    #[prost(bool, tag = "1")]
    pub enabled: bool,
    #[prost(string, tag = "2")]
    pub http_path: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Domain {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Build {
    #[prost(string, tag = "1")]
    pub context: String,
    #[prost(string, tag = "2")]
    pub method: String,
    #[prost(string, tag = "3")]
    pub builder: String,
    #[prost(string, repeated, tag = "4")]
    pub buildpacks: Vec<String>,
    #[prost(string, tag = "5")]
    pub dockerfile: String,
    #[prost(string, tag = "6")]
    pub image: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct AppImage {
    #[prost(string, tag = "1")]
    pub repository: String,
    #[prost(string, tag = "2")]
    pub tag: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnvGroup {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub version: u32,
}

/// Encodes an application as a `PorterApp` message.
pub fn encode(app: &model::App) -> Vec<u8> {
    PorterApp::from(app).encode_to_vec()
}

/// Decodes and validates a `PorterApp` message.
pub fn decode(bytes: &[u8]) -> Result<model::App> {
    let msg = PorterApp::decode(bytes).map_err(|error| Error::MalformedDocument {
        reason: error.to_string(),
    })?;
    model::App::try_from(msg)
}

// === impl PorterApp ===

impl From<&model::App> for PorterApp {
    fn from(app: &model::App) -> Self {
        Self {
            name: app.name.clone(),
            services: app
                .services
                .iter()
                .map(|(name, svc)| (name.clone(), Service::from(svc)))
                .collect(),
            build: app.build.as_ref().map(|build| {
                let parts = BuildParts::from(build);
                Build {
                    context: parts.context,
                    method: parts.method,
                    builder: parts.builder,
                    buildpacks: parts.buildpacks,
                    dockerfile: parts.dockerfile,
                    image: parts.image,
                }
            }),
            image: app.image.as_ref().map(|image| AppImage {
                repository: image.repository.clone(),
                tag: image.tag.clone(),
            }),
            env: app
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            predeploy: app.predeploy.as_ref().map(Service::from),
            env_groups: app
                .env_group_refs
                .iter()
                .map(|group| EnvGroup {
                    name: group.name.clone(),
                    version: group.version,
                })
                .collect(),
        }
    }
}

impl TryFrom<PorterApp> for model::App {
    type Error = Error;

    fn try_from(msg: PorterApp) -> Result<Self> {
        if !msg.name.is_empty() {
            names::validate_dns_label("name", &msg.name)?;
        }

        let mut services = indexmap::IndexMap::with_capacity(msg.services.len());
        for (name, svc) in msg.services {
            let path = format!("services.{name}");
            names::validate_dns_label(&path, &name)?;
            services.insert(name, svc.into_service(&path)?);
        }

        let predeploy = msg
            .predeploy
            .map(|svc| svc.into_service("predeploy"))
            .transpose()?;
        if let Some(kind) = predeploy.as_ref().map(model::Service::kind) {
            if kind != model::ServiceKind::Job {
                return Err(Error::invalid_value("predeploy.type", kind.as_str(), "job"));
            }
        }

        let build = msg
            .build
            .map(|build| {
                BuildParts {
                    context: build.context,
                    method: build.method,
                    builder: build.builder,
                    buildpacks: build.buildpacks,
                    dockerfile: build.dockerfile,
                    image: build.image,
                }
                .into_build("build")
            })
            .transpose()?;

        let image = match msg.image {
            Some(image) if image.repository.is_empty() => {
                return Err(Error::missing("image.repository"))
            }
            Some(AppImage { repository, tag }) => Some(model::ImageRef { repository, tag }),
            None => None,
        };

        if msg.env.contains_key("") {
            return Err(Error::invalid_value(
                "env",
                "an empty key",
                "non-empty variable names",
            ));
        }

        Ok(Self {
            name: msg.name,
            services,
            predeploy,
            build,
            image,
            env: msg.env.into_iter().collect(),
            env_group_refs: msg
                .env_groups
                .into_iter()
                .map(|EnvGroup { name, version }| model::EnvGroupRef { name, version })
                .collect(),
        })
    }
}

// === impl Service ===

impl Service {
    fn into_service(self, path: &str) -> Result<model::Service> {
        let declared = ServiceType::try_from(self.r#type).map_err(|_| {
            Error::invalid_value(
                format!("{path}.type"),
                self.r#type.to_string(),
                "a known service type",
            )
        })?;

        let field = |key: &str| format!("{path}.{key}");
        let config = match self.config {
            Some(service::Config::WebConfig(web)) => model::ServiceConfig::Web(model::WebConfig {
                autoscaling: web
                    .autoscaling
                    .map(|scaling| scaling.into_autoscaling(&field("autoscaling")))
                    .transpose()?,
                health_check: web
                    .health_check
                    .map(|check| {
                        let check = model::HealthCheck {
                            enabled: check.enabled,
                            http_path: check.http_path,
                        };
                        check.validate(&field("health_check.http_path"))?;
                        Ok::<_, Error>(check)
                    })
                    .transpose()?,
                domains: web
                    .domains
                    .into_iter()
                    .map(|Domain { name }| model::Domain { name })
                    .collect(),
                private: web.private,
                ingress_annotations: web.ingress_annotations.into_iter().collect(),
            }),
            Some(service::Config::WorkerConfig(worker)) => {
                model::ServiceConfig::Worker(model::WorkerConfig {
                    autoscaling: worker
                        .autoscaling
                        .map(|scaling| scaling.into_autoscaling(&field("autoscaling")))
                        .transpose()?,
                })
            }
            Some(service::Config::JobConfig(job)) => model::ServiceConfig::Job(model::JobConfig {
                allow_concurrent: job.allow_concurrent,
                cron: job.cron,
            }),
            None => return Err(Error::missing(format!("{path}.config"))),
        };

        // An unspecified type defers to the config; a specified one must agree with it.
        if declared != ServiceType::Unspecified && declared != ServiceType::from(config.kind()) {
            return Err(Error::ConflictingFields {
                path: format!("{path}.type"),
                other: format!("{path}.config"),
            });
        }

        if !self.cpu_cores.is_finite() || self.cpu_cores < 0.0 {
            return Err(Error::invalid_value(
                field("cpu_cores"),
                self.cpu_cores.to_string(),
                "a non-negative number of cores",
            ));
        }

        Ok(model::Service {
            run: self.run,
            instances: coerce::check_count(&field("instances"), self.instances.into())?,
            port: coerce::check_port(&field("port"), self.port.into())?,
            cpu_cores: self.cpu_cores,
            ram_megabytes: coerce::check_count(
                &field("ram_megabytes"),
                self.ram_megabytes.into(),
            )?,
            config,
            passthrough: Default::default(),
        })
    }
}

impl From<&model::Service> for Service {
    fn from(svc: &model::Service) -> Self {
        let config = match &svc.config {
            model::ServiceConfig::Web(web) => service::Config::WebConfig(WebServiceConfig {
                autoscaling: web.autoscaling.as_ref().map(Into::into),
                health_check: web.health_check.as_ref().map(|check| HealthCheck {
                    enabled: check.enabled,
                    http_path: check.http_path.clone(),
                }),
                domains: web
                    .domains
                    .iter()
                    .map(|domain| Domain {
                        name: domain.name.clone(),
                    })
                    .collect(),
                private: web.private,
                ingress_annotations: web
                    .ingress_annotations
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            }),
            model::ServiceConfig::Worker(worker) => {
                service::Config::WorkerConfig(WorkerServiceConfig {
                    autoscaling: worker.autoscaling.as_ref().map(Into::into),
                })
            }
            model::ServiceConfig::Job(job) => service::Config::JobConfig(JobServiceConfig {
                allow_concurrent: job.allow_concurrent,
                cron: job.cron.clone(),
            }),
        };

        Self {
            run: svc.run.clone(),
            r#type: ServiceType::from(svc.kind()).into(),
            instances: svc.instances,
            port: svc.port,
            cpu_cores: svc.cpu_cores,
            ram_megabytes: svc.ram_megabytes,
            config: Some(config),
        }
    }
}

impl From<model::ServiceKind> for ServiceType {
    fn from(kind: model::ServiceKind) -> Self {
        match kind {
            model::ServiceKind::Web => Self::Web,
            model::ServiceKind::Worker => Self::Worker,
            model::ServiceKind::Job => Self::Job,
        }
    }
}

// === impl Autoscaling ===

impl From<&model::Autoscaling> for Autoscaling {
    fn from(scaling: &model::Autoscaling) -> Self {
        Self {
            enabled: scaling.enabled,
            min_instances: scaling.min_instances,
            max_instances: scaling.max_instances,
            cpu_threshold_percent: scaling.cpu_threshold_percent,
            memory_threshold_percent: scaling.memory_threshold_percent,
        }
    }
}

impl Autoscaling {
    fn into_autoscaling(self, path: &str) -> Result<model::Autoscaling> {
        let scaling = model::Autoscaling {
            enabled: self.enabled,
            min_instances: self.min_instances,
            max_instances: self.max_instances,
            cpu_threshold_percent: self.cpu_threshold_percent,
            memory_threshold_percent: self.memory_threshold_percent,
        };
        scaling.validate(path, |field| match field {
            AutoscalingField::MinInstances => "min_instances",
            AutoscalingField::MaxInstances => "max_instances",
            AutoscalingField::CpuThresholdPercent => "cpu_threshold_percent",
            AutoscalingField::MemoryThresholdPercent => "memory_threshold_percent",
        })?;
        Ok(scaling)
    }
}
