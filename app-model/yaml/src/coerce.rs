//! Loose YAML scalars to strict canonical values.
//!
//! Hand-authored v1 documents may carry any scalar as a string, so each reader accepts both the
//! native YAML type and its string spelling. Absent values coerce to the type's zero value,
//! except where a caller checks presence first.

use crate::{
    cursor::describe,
    quantity::{Cpu, Memory},
    Cursor,
};
use porter_app_model_core::{Error, Result};
use serde_yaml::Value;

pub const MAX_PORT: i64 = 65535;

/// Reads a CPU request (`1`, `0.5`, `500m`) as cores.
pub fn cpu_cores(raw: &Cursor<'_>) -> Result<f32> {
    match raw.value() {
        None => Ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s
            .parse::<Cpu>()
            .map(|cpu| cpu.cores())
            .map_err(|_| invalid(raw, Cpu::EXPECTED)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(cores) if cores >= 0.0 && cores.is_finite() => Ok(cores as f32),
            _ => Err(invalid(raw, Cpu::EXPECTED)),
        },
        Some(_) => Err(invalid(raw, Cpu::EXPECTED)),
    }
}

/// Reads a memory request, which must be written in mebibytes (`256Mi`).
pub fn memory_megabytes(raw: &Cursor<'_>) -> Result<i32> {
    match raw.value() {
        None => Ok(0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .parse::<Memory>()
            .map(|mem| mem.megabytes())
            .map_err(|_| invalid(raw, Memory::EXPECTED)),
        Some(_) => Err(invalid(raw, Memory::EXPECTED)),
    }
}

/// Reads an integer from a native integer or a decimal string. Absent and empty values are `0`.
pub fn to_int(raw: &Cursor<'_>) -> Result<i64> {
    const WANT: &str = "an integer";
    match raw.value() {
        None => Ok(0),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(raw, WANT)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid(raw, WANT)),
        Some(_) => Err(invalid(raw, WANT)),
    }
}

/// Reads a boolean. Strings follow the conventional spellings (`1`, `t`, `TRUE`, `false`, ...).
/// Absent and empty values are `false`.
pub fn to_bool(raw: &Cursor<'_>) -> Result<bool> {
    const WANT: &str = "a boolean";
    match raw.value() {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid(raw, WANT)),
        },
        Some(Value::String(s)) => match s.as_str() {
            "" => Ok(false),
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(invalid(raw, WANT)),
        },
        Some(_) => Err(invalid(raw, WANT)),
    }
}

/// Reads a native string. Absent values are empty; other types are rejected.
pub fn to_string(raw: &Cursor<'_>) -> Result<String> {
    match raw.value() {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(raw, "a string")),
    }
}

/// Renders a scalar as text, as env values are copied verbatim from the document.
pub fn scalar_text(raw: &Cursor<'_>) -> Result<String> {
    match raw.value() {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(invalid(raw, "a scalar")),
    }
}

/// Reads a port; `0` means the service exposes none.
pub fn port(raw: &Cursor<'_>) -> Result<i32> {
    check_port(raw.path(), to_int(raw)?)
}

/// Reads a count such as a replica count, which may not be negative.
pub fn count(raw: &Cursor<'_>) -> Result<i32> {
    check_count(raw.path(), to_int(raw)?)
}

pub fn check_port(field: &str, port: i64) -> Result<i32> {
    if !(0..=MAX_PORT).contains(&port) {
        return Err(Error::invalid_value(
            field,
            port.to_string(),
            format!("a port between 0 and {MAX_PORT}"),
        ));
    }
    Ok(port as i32)
}

pub fn check_count(field: &str, n: i64) -> Result<i32> {
    if n < 0 {
        return Err(Error::invalid_value(
            field,
            n.to_string(),
            "a non-negative count",
        ));
    }
    i32::try_from(n).map_err(|_| Error::invalid_value(field, n.to_string(), "a 32-bit count"))
}

fn invalid(raw: &Cursor<'_>, want: &str) -> Error {
    let got = raw.value().map(describe).unwrap_or_else(|| "null".into());
    Error::invalid_value(raw.path(), got, want)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Coerces the `v` key of a one-line document.
    fn with<T>(yaml: &str, f: impl FnOnce(&Cursor<'_>) -> Result<T>) -> Result<T> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        let root = Cursor::root(&doc);
        f(&root.child("v").unwrap())
    }

    #[rstest]
    #[case("v: 0m", 0.0)]
    #[case("v: '1'", 1.0)]
    #[case("v: 1500m", 1.5)]
    #[case("v: 2", 2.0)]
    #[case("v: 0.25", 0.25)]
    #[case("v: ''", 0.0)]
    #[case("{}", 0.0)]
    fn cpu(#[case] yaml: &str, #[case] cores: f32) {
        assert_eq!(with(yaml, cpu_cores).unwrap(), cores, "{yaml}");
    }

    #[rstest]
    #[case("v: -1")]
    #[case("v: '-1'")]
    #[case("v: 100u")]
    #[case("v: true")]
    #[case("v: [1]")]
    fn cpu_rejects(#[case] yaml: &str) {
        let err = with(yaml, cpu_cores).unwrap_err();
        assert!(
            matches!(err, Error::InvalidValue { ref field, .. } if field == "v"),
            "{yaml}: {err}"
        );
    }

    #[rstest]
    #[case("v: 0Mi", 0)]
    #[case("v: 1024Mi", 1024)]
    #[case("{}", 0)]
    fn memory(#[case] yaml: &str, #[case] megabytes: i32) {
        assert_eq!(with(yaml, memory_megabytes).unwrap(), megabytes);
    }

    #[rstest]
    #[case("v: 256")]
    #[case("v: '256'")]
    #[case("v: 1Gi")]
    #[case("v: 1K")]
    #[case("v: 1Ki")]
    #[case("v: 1G")]
    fn memory_rejects(#[case] yaml: &str) {
        assert!(with(yaml, memory_megabytes).is_err(), "{yaml}");
    }

    #[rstest]
    #[case("v: 3", 3)]
    #[case("v: '3'", 3)]
    #[case("v: ''", 0)]
    #[case("v: ~", 0)]
    #[case("{}", 0)]
    #[case("v: '-2'", -2)]
    fn ints(#[case] yaml: &str, #[case] n: i64) {
        assert_eq!(with(yaml, to_int).unwrap(), n);
    }

    #[rstest]
    #[case("v: 1.5")]
    #[case("v: three")]
    #[case("v: true")]
    fn ints_reject(#[case] yaml: &str) {
        assert!(with(yaml, to_int).is_err(), "{yaml}");
    }

    #[rstest]
    #[case("v: true", true)]
    #[case("v: 'true'", true)]
    #[case("v: 'True'", true)]
    #[case("v: 't'", true)]
    #[case("v: '1'", true)]
    #[case("v: 1", true)]
    #[case("v: false", false)]
    #[case("v: 'FALSE'", false)]
    #[case("v: '0'", false)]
    #[case("v: ''", false)]
    #[case("{}", false)]
    fn bools(#[case] yaml: &str, #[case] b: bool) {
        assert_eq!(with(yaml, to_bool).unwrap(), b, "{yaml}");
    }

    #[rstest]
    #[case("v: 'yes'")]
    #[case("v: 2")]
    #[case("v: {}")]
    fn bools_reject(#[case] yaml: &str) {
        assert!(with(yaml, to_bool).is_err(), "{yaml}");
    }

    #[test]
    fn strings() {
        assert_eq!(with("v: hi", to_string).unwrap(), "hi");
        assert_eq!(with("v: ~", to_string).unwrap(), "");
        assert!(with("v: 8080", to_string).is_err());
        assert!(with("v: false", to_string).is_err());
    }

    #[test]
    fn scalar_texts() {
        assert_eq!(with("v: 8080", scalar_text).unwrap(), "8080");
        assert_eq!(with("v: true", scalar_text).unwrap(), "true");
        assert_eq!(with("v: abc", scalar_text).unwrap(), "abc");
        assert!(with("v: [a]", scalar_text).is_err());
    }

    #[rstest]
    #[case("v: 0", 0)]
    #[case("v: '8080'", 8080)]
    #[case("v: 65535", 65535)]
    fn ports(#[case] yaml: &str, #[case] p: i32) {
        assert_eq!(with(yaml, port).unwrap(), p);
    }

    #[rstest]
    #[case("v: 65536")]
    #[case("v: -1")]
    #[case("v: http")]
    fn ports_reject(#[case] yaml: &str) {
        assert!(with(yaml, port).is_err(), "{yaml}");
    }

    #[test]
    fn counts() {
        assert_eq!(with("v: '2'", count).unwrap(), 2);
        assert!(with("v: -1", count).is_err());
        assert!(with("v: 4294967296", count).is_err());
    }
}
