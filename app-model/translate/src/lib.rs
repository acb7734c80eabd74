//! Translation between Porter-YAML dialects, the canonical [`App`], and the representations
//! downstream systems consume.
//!
//! ```text
//! bytes -> [ dialect ] -> { v1 | v2 } -> App -> { helm values | v1 export | v2 YAML | proto }
//!                                         \-> [ env ] + EnvGroupFetcher -> runtime env
//! ```
//!
//! Every entry point is a pure function of its inputs: nothing here caches, holds global state or
//! returns a partially-populated result.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod build;
mod dialect;
pub mod env;
pub mod helm;
pub mod proto;
pub mod v1;
pub mod v2;


pub use self::{
    dialect::{parse_yaml, Dialect},
    env::{resolve_env, ResolveOptions},
    helm::{emit_helm_values, emit_predeploy_values, to_v1_document},
};
pub use porter_app_model_core::{App, Error, Result};
