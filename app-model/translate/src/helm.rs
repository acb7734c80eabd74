//! Helm values for the charts the deploy layer installs.
//!
//! The synthesized tree mirrors the paths the v1 reader walks, so a v1 document rebuilt from
//! these values parses back to the same application. Each service's passthrough values are
//! merged underneath; synthesized keys win.

use crate::build::BuildParts;
use indexmap::IndexMap;
use porter_app_model_core::{
    App, Autoscaling, EnvMap, Error, HealthCheck, ImageRef, Result, Service, ServiceConfig,
};
use porter_app_model_yaml::{
    quantity::{Cpu, Memory},
    Mapping, Value,
};
use serde::Serialize;
use tracing::trace;

/// Returns the values tree for the named service.
pub fn emit_helm_values(app: &App, service: &str) -> Result<Value> {
    let svc = app
        .service(service)
        .ok_or_else(|| Error::missing(format!("services.{service}")))?;
    values(app, svc).map(Value::Mapping)
}

/// Returns the values tree for the predeploy job.
pub fn emit_predeploy_values(app: &App) -> Result<Value> {
    let predeploy = app
        .predeploy
        .as_ref()
        .ok_or_else(|| Error::missing("predeploy"))?;
    values(app, predeploy).map(Value::Mapping)
}

/// Rebuilds a v1 document carrying every service's values as its `config`.
pub fn to_v1_document(app: &App) -> Result<Value> {
    let mut apps = IndexMap::with_capacity(app.services.len());
    for (name, svc) in &app.services {
        apps.insert(
            name.as_str(),
            V1Service {
                run: &svc.run,
                type_: svc.kind().as_str(),
                config: values(app, svc)?,
            },
        );
    }
    let release = match &app.predeploy {
        Some(predeploy) => Some(V1Service {
            run: &predeploy.run,
            type_: predeploy.kind().as_str(),
            config: values(app, predeploy)?,
        }),
        None => None,
    };

    let build = match (&app.build, &app.image) {
        (Some(build), _) => Some(BuildParts::from(build)),
        (None, Some(image)) => Some(BuildParts {
            method: "registry".to_string(),
            image: image.to_string(),
            ..Default::default()
        }),
        (None, None) => None,
    };

    to_value(&V1Document {
        name: (!app.name.is_empty()).then_some(app.name.as_str()),
        build: build.as_ref().map(V1Build::from),
        env: &app.env,
        apps,
        release,
    })
}

fn values(app: &App, svc: &Service) -> Result<Mapping> {
    let autoscaling = svc.autoscaling();
    let mut values = Values {
        container: Container {
            command: &svc.run,
            port: (svc.port != 0).then_some(svc.port),
            env: ContainerEnv { normal: &app.env },
        },
        resources: Resources {
            requests: Requests {
                cpu: Cpu::from_cores(svc.cpu_cores).to_string(),
                memory: Memory::from_megabytes(svc.ram_megabytes).to_string(),
            },
        },
        replica_count: match autoscaling {
            Some(scaling) if scaling.enabled => None,
            _ => Some(svc.instances),
        },
        autoscaling: autoscaling.map(AutoscalingValues::from),
        image: app.image.as_ref().map(ImageValues::from),
        ingress: None,
        health: None,
        schedule: None,
        allow_concurrent: None,
    };

    match &svc.config {
        ServiceConfig::Web(web) => {
            values.ingress = Some(Ingress {
                enabled: !web.private,
                hosts: web.domains.iter().map(|d| d.name.as_str()).collect(),
                annotations: &web.ingress_annotations,
            });
            values.health = web.health_check.as_ref().map(|check| Health {
                liveness_probe: Probe::from(check),
                readiness_probe: Probe::from(check),
            });
        }
        ServiceConfig::Worker(_) => {}
        ServiceConfig::Job(job) => {
            values.schedule = Some(Schedule {
                enabled: !job.cron.is_empty(),
                value: &job.cron,
            });
            values.allow_concurrent = Some(job.allow_concurrent);
        }
    }

    let synthesized = match to_value(&values)? {
        Value::Mapping(map) => map,
        other => {
            return Err(Error::Internal(format!(
                "helm values serialized to a non-mapping: {other:?}"
            )))
        }
    };
    let mut merged = svc.passthrough.clone();
    trace!(passthrough = merged.len(), "Merging synthesized values");
    merge(&mut merged, synthesized);
    Ok(merged)
}

/// Merges `overlay` into `base`. Mappings merge key by key; any other value replaces.
fn merge(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        if let Value::Mapping(overlay) = value {
            if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                merge(existing, overlay);
                continue;
            }
            base.insert(key, Value::Mapping(overlay));
        } else {
            base.insert(key, value);
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_yaml::to_value(value)
        .map_err(|error| Error::Internal(format!("failed to serialize values: {error}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Values<'a> {
    container: Container<'a>,
    resources: Resources,

    #[serde(skip_serializing_if = "Option::is_none")]
    replica_count: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    autoscaling: Option<AutoscalingValues>,

    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImageValues<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    ingress: Option<Ingress<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<Health<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    schedule: Option<Schedule<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    allow_concurrent: Option<bool>,
}

#[derive(Serialize)]
struct Container<'a> {
    command: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<i32>,

    env: ContainerEnv<'a>,
}

#[derive(Serialize)]
struct ContainerEnv<'a> {
    normal: &'a EnvMap,
}

#[derive(Serialize)]
struct Resources {
    requests: Requests,
}

#[derive(Serialize)]
struct Requests {
    cpu: String,
    memory: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoscalingValues {
    enabled: bool,
    min_replicas: i32,
    max_replicas: i32,
    #[serde(rename = "targetCPUUtilizationPercentage")]
    target_cpu: i32,
    #[serde(rename = "targetMemoryUtilizationPercentage")]
    target_memory: i32,
}

#[derive(Serialize)]
struct ImageValues<'a> {
    repository: &'a str,
    tag: &'a str,
}

#[derive(Serialize)]
struct Ingress<'a> {
    enabled: bool,
    hosts: Vec<&'a str>,

    #[serde(skip_serializing_if = "is_empty_map")]
    annotations: &'a IndexMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health<'a> {
    liveness_probe: Probe<'a>,
    readiness_probe: Probe<'a>,
}

#[derive(Serialize)]
struct Probe<'a> {
    enabled: bool,
    path: &'a str,
}

#[derive(Serialize)]
struct Schedule<'a> {
    enabled: bool,
    value: &'a str,
}

#[derive(Serialize)]
struct V1Document<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<V1Build<'a>>,

    #[serde(skip_serializing_if = "is_empty_map")]
    env: &'a EnvMap,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    apps: IndexMap<&'a str, V1Service<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<V1Service<'a>>,
}

#[derive(Serialize)]
struct V1Service<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    run: &'a str,
    #[serde(rename = "type")]
    type_: &'static str,
    config: Mapping,
}

#[derive(Serialize)]
struct V1Build<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    context: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    builder: &'a str,
    #[serde(skip_serializing_if = "is_empty_list")]
    buildpacks: &'a Vec<String>,
    #[serde(skip_serializing_if = "str::is_empty")]
    dockerfile: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    image: &'a str,
}

fn is_empty_map(map: &&IndexMap<String, String>) -> bool {
    map.is_empty()
}

fn is_empty_list(list: &&Vec<String>) -> bool {
    list.is_empty()
}

// === impl AutoscalingValues ===

impl From<&Autoscaling> for AutoscalingValues {
    fn from(scaling: &Autoscaling) -> Self {
        Self {
            enabled: scaling.enabled,
            min_replicas: scaling.min_instances,
            max_replicas: scaling.max_instances,
            target_cpu: scaling.cpu_threshold_percent,
            target_memory: scaling.memory_threshold_percent,
        }
    }
}

impl<'a> From<&'a ImageRef> for ImageValues<'a> {
    fn from(image: &'a ImageRef) -> Self {
        Self {
            repository: &image.repository,
            tag: &image.tag,
        }
    }
}

impl<'a> From<&'a HealthCheck> for Probe<'a> {
    fn from(check: &'a HealthCheck) -> Self {
        Self {
            enabled: check.enabled,
            path: &check.http_path,
        }
    }
}

impl<'a> From<&'a BuildParts> for V1Build<'a> {
    fn from(parts: &'a BuildParts) -> Self {
        Self {
            context: &parts.context,
            method: &parts.method,
            builder: &parts.builder,
            buildpacks: &parts.buildpacks,
            dockerfile: &parts.dockerfile,
            image: &parts.image,
        }
    }
}
