//! Document shapes for Porter-YAML and the coercions that turn loosely-typed scalars into the
//! canonical model's units.
//!
//! - `v1` documents are read through a [`Cursor`] over an untyped [`serde_yaml::Value`] tree,
//!   because every scalar may arrive as a string.
//! - `v2` documents decode strictly into [`v2::AppSpec`].
//! - `v2beta1` preview documents decode into [`preview::PreviewSpec`].

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod coerce;
mod cursor;
pub mod decode;
pub mod preview;
pub mod quantity;
pub mod v2;

pub use self::cursor::Cursor;
pub use serde_yaml::{Mapping, Value};
