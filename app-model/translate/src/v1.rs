//! The legacy `v1` dialect: loosely-typed, Helm-values-shaped documents.
//!
//! Service configuration is written as the values tree the deploy layer hands to a chart, so the
//! reader walks well-known paths in that tree and coerces whatever scalars it finds. Keys it does
//! not read are kept on [`Service::passthrough`] and are never an error.

use crate::build::BuildParts;
use indexmap::IndexMap;
use porter_app_model_core::{
    names, App, Autoscaling, AutoscalingField, Build, Domain, EnvMap, Error, HealthCheck, ImageRef,
    JobConfig, Result, Service, ServiceConfig, ServiceKind, WebConfig, WorkerConfig,
};
use porter_app_model_yaml::{coerce, Cursor, Value};
use tracing::debug;

/// Explicit `version` markers that select this dialect. Documents without a version are also v1.
pub const VERSIONS: [&str; 2] = ["v1", "v1stack"];

/// Canonicalizes a v1 document.
pub fn parse(doc: &Value) -> Result<App> {
    let root = Cursor::root(doc);

    let name = coerce::to_string(&root.child("name")?)?;
    if !name.is_empty() {
        names::validate_dns_label("name", &name)?;
    }

    let apps = root.child("apps")?.entries()?;
    let services = root.child("services")?.entries()?;
    let release = root.child("release")?;
    let entries = match (apps.is_empty(), services.is_empty()) {
        (false, false) => {
            return Err(Error::ConflictingFields {
                path: "apps".into(),
                other: "services".into(),
            })
        }
        (false, true) => apps,
        (true, false) => services,
        (true, true) if !release.is_present() => return Err(Error::EmptyApp),
        (true, true) => Vec::new(),
    };

    let (build, image) = parse_build(&root.child("build")?)?;

    let mut parsed = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        names::validate_dns_label(entry.path(), &name)?;
        let kind = service_kind(&name, &entry)?;
        debug!(service = %name, %kind, "Parsing v1 service");
        let service = parse_service(&entry, kind)?;
        parsed.insert(name, service);
    }

    let predeploy = if release.is_present() {
        Some(parse_service(&release, ServiceKind::Job)?)
    } else {
        None
    };

    Ok(App {
        name,
        services: parsed,
        predeploy,
        build,
        image,
        env: parse_env(&root.child("env")?)?,
        env_group_refs: Vec::new(),
    })
}

/// Infers a service's kind from its name.
///
/// v1 documents may omit `type`; the name is the only other signal. Strict dialects never infer.
pub fn infer_service_kind(name: &str) -> Option<ServiceKind> {
    if name.contains("web") {
        Some(ServiceKind::Web)
    } else if name.contains("wkr") {
        Some(ServiceKind::Worker)
    } else if name.contains("job") || name == "release" {
        Some(ServiceKind::Job)
    } else {
        None
    }
}

fn service_kind(name: &str, entry: &Cursor<'_>) -> Result<ServiceKind> {
    let type_ = entry.child("type")?;
    let declared = coerce::to_string(&type_)?;
    if declared.is_empty() {
        return infer_service_kind(name).ok_or_else(|| Error::UnknownServiceType {
            name: name.to_string(),
        });
    }
    declared.parse().map_err(|_| {
        Error::invalid_value(
            type_.path(),
            format!("{declared:?}"),
            "one of web, worker, job",
        )
    })
}

fn parse_service(entry: &Cursor<'_>, kind: ServiceKind) -> Result<Service> {
    let run = coerce::to_string(&entry.child("run")?)?;
    let config = entry.child("config")?;
    let requests = config.child("resources")?.child("requests")?;

    let instances = coerce::count(&config.child("replicaCount")?)?;
    let cpu_cores = coerce::cpu_cores(&requests.child("cpu")?)?;
    let ram_megabytes = coerce::memory_megabytes(&requests.child("memory")?)?;
    let port = coerce::port(&config.child("container")?.child("port")?)?;

    let service_config = match kind {
        ServiceKind::Web => ServiceConfig::Web(web_config(&config)?),
        ServiceKind::Worker => ServiceConfig::Worker(WorkerConfig {
            autoscaling: autoscaling(&config)?,
        }),
        ServiceKind::Job => ServiceConfig::Job(JobConfig {
            allow_concurrent: coerce::to_bool(&config.child("allowConcurrent")?)?,
            cron: coerce::to_string(&config.child("schedule")?.child("value")?)?,
        }),
    };

    Ok(Service {
        run,
        instances,
        port,
        cpu_cores,
        ram_megabytes,
        config: service_config,
        passthrough: config
            .value()
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default(),
    })
}

fn web_config(config: &Cursor<'_>) -> Result<WebConfig> {
    let ingress = config.child("ingress")?;
    let enabled = coerce::to_bool(&ingress.child("enabled")?)?;

    let mut domains = Vec::new();
    for host in ingress.child("hosts")?.elements()? {
        let name = coerce::to_string(&host)?;
        if name.is_empty() {
            return Err(Error::invalid_value(host.path(), "\"\"", "a host name"));
        }
        domains.push(Domain { name });
    }

    Ok(WebConfig {
        autoscaling: autoscaling(config)?,
        health_check: health_check(config)?,
        domains,
        private: !enabled,
        ingress_annotations: IndexMap::new(),
    })
}

/// Reads `config.autoscaling`. A missing or disabled block is `None`; an enabled block must set
/// every field.
fn autoscaling(config: &Cursor<'_>) -> Result<Option<Autoscaling>> {
    let block = config.child("autoscaling")?;
    if !coerce::to_bool(&block.child("enabled")?)? {
        return Ok(None);
    }

    let required = |key: &str| -> Result<i32> {
        let field = block.child(key)?;
        if !field.is_present() {
            return Err(Error::missing(field.path()));
        }
        coerce::count(&field)
    };
    let scaling = Autoscaling {
        enabled: true,
        min_instances: required("minReplicas")?,
        max_instances: required("maxReplicas")?,
        cpu_threshold_percent: required("targetCPUUtilizationPercentage")?,
        memory_threshold_percent: required("targetMemoryUtilizationPercentage")?,
    };
    scaling.validate(block.path(), autoscaling_key)?;
    Ok(Some(scaling))
}

pub(crate) fn autoscaling_key(field: AutoscalingField) -> &'static str {
    match field {
        AutoscalingField::MinInstances => "minReplicas",
        AutoscalingField::MaxInstances => "maxReplicas",
        AutoscalingField::CpuThresholdPercent => "targetCPUUtilizationPercentage",
        AutoscalingField::MemoryThresholdPercent => "targetMemoryUtilizationPercentage",
    }
}

/// Only the readiness probe is read. The dialect configures liveness identically.
fn health_check(config: &Cursor<'_>) -> Result<Option<HealthCheck>> {
    let probe = config.child("health")?.child("readinessProbe")?;
    if !probe.is_present() {
        return Ok(None);
    }

    let path = probe.child("path")?;
    let check = HealthCheck {
        enabled: coerce::to_bool(&probe.child("enabled")?)?,
        http_path: coerce::to_string(&path)?,
    };
    check.validate(path.path())?;
    Ok(Some(check))
}

fn parse_build(build: &Cursor<'_>) -> Result<(Option<Build>, Option<ImageRef>)> {
    if !build.is_present() {
        return Ok((None, None));
    }

    let buildpacks = build
        .child("buildpacks")?
        .elements()?
        .iter()
        .map(coerce::to_string)
        .collect::<Result<Vec<_>>>()?;
    let parts = BuildParts {
        context: coerce::to_string(&build.child("context")?)?,
        method: coerce::to_string(&build.child("method")?)?,
        builder: coerce::to_string(&build.child("builder")?)?,
        buildpacks,
        dockerfile: coerce::to_string(&build.child("dockerfile")?)?,
        image: coerce::to_string(&build.child("image")?)?,
    };

    if parts.is_image_only() {
        if let Some(image) = ImageRef::parse(&parts.image) {
            debug!(%image, "Promoting registry build to an image reference");
            return Ok((None, Some(image)));
        }
    }
    Ok((Some(parts.into_build(build.path())?), None))
}

fn parse_env(env: &Cursor<'_>) -> Result<EnvMap> {
    env.entries()?
        .into_iter()
        .map(|(key, value)| {
            if key.is_empty() {
                return Err(Error::invalid_value(
                    env.path(),
                    "an empty key",
                    "non-empty variable names",
                ));
            }
            Ok((key, coerce::scalar_text(&value)?))
        })
        .collect()
}
