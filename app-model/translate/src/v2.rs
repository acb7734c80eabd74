//! The strict `v2` dialect.
//!
//! Documents decode into the typed [`AppSpec`] first, so unknown keys and wrongly-typed scalars
//! fail before any of the checks below run. [`to_yaml`] is the inverse of [`parse`] for every
//! canonical field.

use crate::build::BuildParts;
use indexmap::IndexMap;
use porter_app_model_core::{
    names, App, Autoscaling, AutoscalingField, Domain, EnvGroupRef, EnvMap, Error, HealthCheck,
    ImageRef, JobConfig, Result, Service, ServiceConfig, ServiceKind, WebConfig, WorkerConfig,
};
use porter_app_model_yaml::{
    coerce, decode,
    v2::{
        AppSpec, AutoscalingSpec, BuildSpec, DomainSpec, EnvGroupSpec, HealthCheckSpec, ImageSpec,
        ServiceSpec, VERSION,
    },
    Value,
};
use tracing::debug;

/// Canonicalizes a v2 document.
pub fn parse(doc: Value) -> Result<App> {
    let spec = decode::from_value::<AppSpec>(doc)?;
    from_spec(spec)
}

/// Checks a decoded document and lowers it to the canonical model.
pub fn from_spec(spec: AppSpec) -> Result<App> {
    if spec.version != VERSION {
        return Err(Error::UnsupportedVersion {
            version: spec.version,
            supported: VERSION,
        });
    }

    let name = spec.name.unwrap_or_default();
    if name.is_empty() {
        return Err(Error::missing("name"));
    }
    names::validate_dns_label("name", &name)?;

    let mut services = IndexMap::with_capacity(spec.services.len());
    for (name, svc) in spec.services {
        let path = format!("services.{name}");
        names::validate_dns_label(&path, &name)?;
        let kind = match svc.type_.as_deref() {
            None | Some("") => return Err(Error::missing(format!("{path}.type"))),
            Some(type_) => type_.parse::<ServiceKind>().map_err(|_| {
                Error::invalid_value(
                    format!("{path}.type"),
                    format!("{type_:?}"),
                    "one of web, worker, job",
                )
            })?,
        };
        debug!(service = %name, %kind, "Parsing v2 service");
        services.insert(name, service(&path, kind, svc)?);
    }

    let predeploy = match spec.predeploy {
        None => None,
        Some(svc) => {
            match svc.type_.as_deref() {
                None | Some("job") => {}
                Some(other) => {
                    return Err(Error::invalid_value(
                        "predeploy.type",
                        format!("{other:?}"),
                        "job",
                    ))
                }
            }
            Some(service("predeploy", ServiceKind::Job, svc)?)
        }
    };

    let build = spec.build.map(build_parts).map(|parts| parts.into_build("build"));
    let image = spec.image.map(image_ref);

    Ok(App {
        name,
        services,
        predeploy,
        build: build.transpose()?,
        image: image.transpose()?,
        env: env(spec.env)?,
        env_group_refs: env_group_refs(spec.env_groups)?,
    })
}

/// Renders an application as a v2 document.
pub fn to_yaml(app: &App) -> Result<String> {
    serde_yaml::to_string(&to_spec(app))
        .map_err(|error| Error::Internal(format!("failed to serialize v2 document: {error}")))
}

/// Raises an application to the typed v2 document. Zero values are omitted.
pub fn to_spec(app: &App) -> AppSpec {
    AppSpec {
        version: VERSION.to_string(),
        name: non_empty(&app.name),
        services: app
            .services
            .iter()
            .map(|(name, svc)| (name.clone(), service_spec(svc, true)))
            .collect(),
        predeploy: app.predeploy.as_ref().map(|svc| service_spec(svc, false)),
        build: app.build.as_ref().map(|build| {
            let parts = BuildParts::from(build);
            BuildSpec {
                context: non_empty(&parts.context),
                method: non_empty(&parts.method),
                builder: non_empty(&parts.builder),
                buildpacks: parts.buildpacks,
                dockerfile: non_empty(&parts.dockerfile),
                image: non_empty(&parts.image),
            }
        }),
        image: app.image.as_ref().map(|image| ImageSpec {
            repository: image.repository.clone(),
            tag: image.tag.clone(),
        }),
        env: app.env.clone(),
        env_groups: app
            .env_group_refs
            .iter()
            .map(|group| EnvGroupSpec {
                name: group.name.clone(),
                version: group.version,
            })
            .collect(),
    }
}

fn service(path: &str, kind: ServiceKind, spec: ServiceSpec) -> Result<Service> {
    let ServiceSpec {
        type_: _,
        run,
        instances,
        port,
        cpu_cores,
        ram_megabytes,
        autoscaling,
        health_check,
        domains,
        private,
        ingress_annotations,
        allow_concurrent,
        cron,
    } = spec;
    let field = |key: &str| format!("{path}.{key}");

    let web = kind == ServiceKind::Web;
    let job = kind == ServiceKind::Job;
    let kind_specific = [
        ("autoscaling", autoscaling.is_some(), !job),
        ("healthCheck", health_check.is_some(), web),
        ("domains", domains.is_some(), web),
        ("private", private.is_some(), web),
        ("ingressAnnotations", ingress_annotations.is_some(), web),
        ("allowConcurrent", allow_concurrent.is_some(), job),
        ("cron", cron.is_some(), job),
    ];
    if let Some(&(key, ..)) = kind_specific
        .iter()
        .find(|(_, is_set, applies)| *is_set && !applies)
    {
        return Err(Error::ConflictingFields {
            path: field(key),
            other: field("type"),
        });
    }

    let cpu_cores = cpu_cores.unwrap_or_default();
    if !cpu_cores.is_finite() || cpu_cores < 0.0 {
        return Err(Error::invalid_value(
            field("cpuCores"),
            cpu_cores.to_string(),
            "a non-negative number of cores",
        ));
    }

    let autoscaling = autoscaling
        .map(|spec| scaling(&field("autoscaling"), spec))
        .transpose()?;
    let config = match kind {
        ServiceKind::Web => ServiceConfig::Web(WebConfig {
            autoscaling,
            health_check: health_check
                .map(|spec| probe(&field("healthCheck"), spec))
                .transpose()?,
            domains: self::domains(&field("domains"), domains.unwrap_or_default())?,
            private: private.unwrap_or_default(),
            ingress_annotations: ingress_annotations.unwrap_or_default(),
        }),
        ServiceKind::Worker => ServiceConfig::Worker(WorkerConfig { autoscaling }),
        ServiceKind::Job => ServiceConfig::Job(JobConfig {
            allow_concurrent: allow_concurrent.unwrap_or_default(),
            cron: cron.unwrap_or_default(),
        }),
    };

    Ok(Service {
        run: run.unwrap_or_default(),
        instances: coerce::check_count(&field("instances"), instances.unwrap_or_default().into())?,
        port: coerce::check_port(&field("port"), port.unwrap_or_default().into())?,
        cpu_cores,
        ram_megabytes: coerce::check_count(
            &field("ramMegabytes"),
            ram_megabytes.unwrap_or_default().into(),
        )?,
        config,
        passthrough: Default::default(),
    })
}

fn scaling(path: &str, spec: AutoscalingSpec) -> Result<Autoscaling> {
    let scaling = Autoscaling {
        enabled: spec.enabled,
        min_instances: spec.min_instances,
        max_instances: spec.max_instances,
        cpu_threshold_percent: spec.cpu_threshold_percent,
        memory_threshold_percent: spec.memory_threshold_percent,
    };
    scaling.validate(path, |field| match field {
        AutoscalingField::MinInstances => "minInstances",
        AutoscalingField::MaxInstances => "maxInstances",
        AutoscalingField::CpuThresholdPercent => "cpuThresholdPercent",
        AutoscalingField::MemoryThresholdPercent => "memoryThresholdPercent",
    })?;
    Ok(scaling)
}

fn probe(path: &str, spec: HealthCheckSpec) -> Result<HealthCheck> {
    let check = HealthCheck {
        enabled: spec.enabled,
        http_path: spec.http_path,
    };
    check.validate(&format!("{path}.httpPath"))?;
    Ok(check)
}

fn domains(path: &str, specs: Vec<DomainSpec>) -> Result<Vec<Domain>> {
    specs
        .into_iter()
        .enumerate()
        .map(|(i, DomainSpec { name })| {
            if name.is_empty() {
                return Err(Error::missing(format!("{path}[{i}].name")));
            }
            Ok(Domain { name })
        })
        .collect()
}

fn build_parts(spec: BuildSpec) -> BuildParts {
    BuildParts {
        context: spec.context.unwrap_or_default(),
        method: spec.method.unwrap_or_default(),
        builder: spec.builder.unwrap_or_default(),
        buildpacks: spec.buildpacks,
        dockerfile: spec.dockerfile.unwrap_or_default(),
        image: spec.image.unwrap_or_default(),
    }
}

fn image_ref(spec: ImageSpec) -> Result<ImageRef> {
    if spec.repository.is_empty() {
        return Err(Error::missing("image.repository"));
    }
    Ok(ImageRef {
        repository: spec.repository,
        tag: spec.tag,
    })
}

fn env(vars: IndexMap<String, String>) -> Result<EnvMap> {
    if vars.contains_key("") {
        return Err(Error::invalid_value(
            "env",
            "an empty key",
            "non-empty variable names",
        ));
    }
    Ok(vars)
}

fn env_group_refs(specs: Vec<EnvGroupSpec>) -> Result<Vec<EnvGroupRef>> {
    specs
        .into_iter()
        .enumerate()
        .map(|(i, EnvGroupSpec { name, version })| {
            if name.is_empty() {
                return Err(Error::missing(format!("envGroups[{i}].name")));
            }
            Ok(EnvGroupRef { name, version })
        })
        .collect()
}

fn service_spec(svc: &Service, with_type: bool) -> ServiceSpec {
    let mut spec = ServiceSpec {
        type_: with_type.then(|| svc.kind().to_string()),
        run: non_empty(&svc.run),
        instances: (svc.instances != 0).then_some(svc.instances),
        port: (svc.port != 0).then_some(svc.port),
        cpu_cores: (svc.cpu_cores != 0.0).then_some(svc.cpu_cores),
        ram_megabytes: (svc.ram_megabytes != 0).then_some(svc.ram_megabytes),
        ..Default::default()
    };

    match &svc.config {
        ServiceConfig::Web(web) => {
            spec.autoscaling = web.autoscaling.as_ref().map(scaling_spec);
            spec.health_check = web.health_check.as_ref().map(|check| HealthCheckSpec {
                enabled: check.enabled,
                http_path: check.http_path.clone(),
            });
            spec.domains = (!web.domains.is_empty()).then(|| {
                web.domains
                    .iter()
                    .map(|domain| DomainSpec {
                        name: domain.name.clone(),
                    })
                    .collect()
            });
            spec.private = web.private.then_some(true);
            spec.ingress_annotations =
                (!web.ingress_annotations.is_empty()).then(|| web.ingress_annotations.clone());
        }
        ServiceConfig::Worker(worker) => {
            spec.autoscaling = worker.autoscaling.as_ref().map(scaling_spec);
        }
        ServiceConfig::Job(job) => {
            spec.allow_concurrent = job.allow_concurrent.then_some(true);
            spec.cron = non_empty(&job.cron);
        }
    }
    spec
}

fn scaling_spec(scaling: &Autoscaling) -> AutoscalingSpec {
    AutoscalingSpec {
        enabled: scaling.enabled,
        min_instances: scaling.min_instances,
        max_instances: scaling.max_instances,
        cpu_threshold_percent: scaling.cpu_threshold_percent,
        memory_threshold_percent: scaling.memory_threshold_percent,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
