#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use porter_app_model_core as model;
pub use porter_app_model_preview as preview;
pub use porter_app_model_translate as translate;
pub use porter_app_model_yaml as yaml;

mod args;
mod env_groups;

pub use self::{args::Args, env_groups::FileEnvGroups};
