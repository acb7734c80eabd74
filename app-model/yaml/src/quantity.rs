//! CPU and memory quantities as Porter writes them into Helm values.
//!
//! Porter standardizes on a subset of Kubernetes quantities: CPU is either a bare core count or
//! millicores (`500m`); memory is always mebibytes (`256Mi`).

use std::{fmt, str::FromStr};

/// A CPU request, in cores.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Cpu {
    cores: f64,
}

/// A memory request, in mebibytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Memory {
    megabytes: i32,
}

#[derive(Clone, Debug, thiserror::Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("empty quantity")]
    Empty,

    #[error("missing a unit: {0}")]
    NoUnit(&'static str),

    #[error("invalid unit: {0}")]
    InvalidUnit(&'static str),

    #[error("quantity may not be negative")]
    Negative,

    #[error("quantity is out of range")]
    OutOfRange,

    #[error("invalid number: {0}")]
    NotANumber(String),
}

const CPU_UNITS: &str = "expected a core count (`1`) or millicores (`500m`)";
const MEMORY_UNITS: &str = "expected mebibytes (`256Mi`)";

// === impl Cpu ===

impl Cpu {
    pub const EXPECTED: &'static str = CPU_UNITS;

    pub fn from_cores(cores: f32) -> Self {
        Self {
            cores: f64::from(cores),
        }
    }

    #[inline]
    pub fn cores(&self) -> f32 {
        self.cores as f32
    }

    /// The request rounded to whole millicores.
    #[inline]
    pub fn millicores(&self) -> i64 {
        (self.cores * 1000.0).round() as i64
    }
}

impl FromStr for Cpu {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let (val, scale) = match s.strip_suffix('m') {
            Some(val) => (val, 1000.0),
            None => (s, 1.0),
        };
        // `f64::from_str` also accepts `inf`, `NaN` and exponents, none of which are quantities.
        if val.contains(|c: char| c.is_alphabetic()) {
            return Err(ParseError::InvalidUnit(CPU_UNITS));
        }

        let val = val
            .parse::<f64>()
            .map_err(|e| ParseError::NotANumber(e.to_string()))?;
        if val.is_sign_negative() && val != 0.0 {
            return Err(ParseError::Negative);
        }

        Ok(Self {
            cores: val.abs() / scale,
        })
    }
}

/// Whole millicores are written as `500m`. Anything finer is written as a bare core count so that
/// it parses back to the same request.
impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millicores = self.millicores();
        if millicores as f32 / 1000.0 == self.cores() {
            write!(f, "{millicores}m")
        } else {
            write!(f, "{}", self.cores())
        }
    }
}

// === impl Memory ===

impl Memory {
    pub const EXPECTED: &'static str = MEMORY_UNITS;

    pub fn from_megabytes(megabytes: i32) -> Self {
        Self { megabytes }
    }

    #[inline]
    pub fn megabytes(&self) -> i32 {
        self.megabytes
    }
}

impl FromStr for Memory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let val = match s.strip_suffix("Mi") {
            Some(val) => val,
            None if s.ends_with(|c: char| c.is_alphabetic()) => {
                return Err(ParseError::InvalidUnit(MEMORY_UNITS))
            }
            None => return Err(ParseError::NoUnit(MEMORY_UNITS)),
        };
        if val.contains(|c: char| c.is_alphabetic()) {
            return Err(ParseError::InvalidUnit(MEMORY_UNITS));
        }

        let val = val
            .parse::<i64>()
            .map_err(|e| ParseError::NotANumber(e.to_string()))?;
        if val < 0 {
            return Err(ParseError::Negative);
        }
        let megabytes = i32::try_from(val).map_err(|_| ParseError::OutOfRange)?;
        Ok(Self { megabytes })
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Mi", self.megabytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0m", 0.0)]
    #[case("1", 1.0)]
    #[case("1500m", 1.5)]
    #[case("100m", 0.1)]
    #[case("250m", 0.25)]
    #[case("0.5", 0.5)]
    #[case(" 2 ", 2.0)]
    fn parses_cpu(#[case] input: &str, #[case] cores: f32) {
        assert_eq!(input.parse::<Cpu>().unwrap().cores(), cores, "{input:?}");
    }

    #[rstest]
    #[case("", ParseError::Empty)]
    #[case("-1", ParseError::Negative)]
    #[case("-100m", ParseError::Negative)]
    #[case("1u", ParseError::InvalidUnit(CPU_UNITS))]
    #[case("100n", ParseError::InvalidUnit(CPU_UNITS))]
    #[case("1mm", ParseError::InvalidUnit(CPU_UNITS))]
    #[case("inf", ParseError::InvalidUnit(CPU_UNITS))]
    #[case("1e3", ParseError::InvalidUnit(CPU_UNITS))]
    fn rejects_cpu(#[case] input: &str, #[case] expected: ParseError) {
        assert_eq!(input.parse::<Cpu>().unwrap_err(), expected, "{input:?}");
    }

    #[test]
    fn rejects_cpu_garbage() {
        assert!(matches!(
            "m".parse::<Cpu>(),
            Err(ParseError::NotANumber(_))
        ));
    }

    #[rstest]
    #[case(0.1, "100m")]
    #[case(1.5, "1500m")]
    #[case(0.0, "0m")]
    #[case(2.0, "2000m")]
    #[case(0.0015, "0.0015")]
    #[case(0.0001, "0.0001")]
    fn formats_cpu(#[case] cores: f32, #[case] expected: &str) {
        let cpu = Cpu::from_cores(cores);
        assert_eq!(cpu.to_string(), expected);
        assert_eq!(cpu.to_string().parse::<Cpu>().unwrap().cores(), cores);
    }

    #[rstest]
    #[case("0Mi", 0)]
    #[case("1024Mi", 1024)]
    #[case("256Mi", 256)]
    fn parses_memory(#[case] input: &str, #[case] megabytes: i32) {
        assert_eq!(input.parse::<Memory>().unwrap().megabytes(), megabytes);
    }

    #[rstest]
    #[case("", ParseError::Empty)]
    #[case("256", ParseError::NoUnit(MEMORY_UNITS))]
    #[case("1Gi", ParseError::InvalidUnit(MEMORY_UNITS))]
    #[case("512K", ParseError::InvalidUnit(MEMORY_UNITS))]
    #[case("512Ki", ParseError::InvalidUnit(MEMORY_UNITS))]
    #[case("1G", ParseError::InvalidUnit(MEMORY_UNITS))]
    #[case("-1Mi", ParseError::Negative)]
    #[case("4294967296Mi", ParseError::OutOfRange)]
    fn rejects_memory(#[case] input: &str, #[case] expected: ParseError) {
        assert_eq!(input.parse::<Memory>().unwrap_err(), expected, "{input:?}");
    }

    #[test]
    fn rejects_fractional_memory() {
        assert!(matches!(
            "0.5Mi".parse::<Memory>(),
            Err(ParseError::NotANumber(_))
        ));
    }

    #[test]
    fn formats_memory() {
        assert_eq!(Memory::from_megabytes(256).to_string(), "256Mi");
    }
}
