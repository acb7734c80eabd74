//! Canonical Porter application model.
//!
//! Every Porter-YAML dialect reduces to the types in this crate. An [`App`] is produced once by a
//! parser and is never mutated afterwards; emitters (Helm values, the canonical proto, strict v2
//! YAML) only ever read it.
//!
//! ```text
//! [ v1 YAML ] --\
//!                > [ App ] -> { Helm values | proto | v2 YAML | runtime env }
//! [ v2 YAML ] --/
//! ```

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod app;
pub mod env;
mod error;
pub mod names;

pub use self::{
    app::{
        App, Autoscaling, AutoscalingField, Build, BuildMethod, Domain, EnvGroupRef, EnvMap,
        HealthCheck, ImageRef, JobConfig, Service, ServiceConfig, ServiceKind, WebConfig,
        WorkerConfig,
    },
    env::{DeploymentTarget, EnvGroup, EnvGroupFetcher, FetchError},
    error::{Error, ErrorKind, Result},
};
