//! Resource graphs for preview environments.
//!
//! A `v2beta1` preview document lists builds, apps and addons. Each app expands to the nodes that
//! build, push and deploy it; each addon is a single chart install. The graph is validated as a
//! DAG when it is built, so a [`ResourceGraph`] always has a resolution order.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod graph;
mod resolve;

pub use self::graph::{build_preview_graph, ChartSource, Driver, ResourceGraph, ResourceNode};
