use crate::{v1, v2};
use porter_app_model_core::{App, Error, Result};
use porter_app_model_yaml::{coerce, v2::VERSION as V2_VERSION, Cursor, Value};
use std::{fmt, str::FromStr};
use tracing::debug;

/// The Porter-YAML dialects [`parse_yaml`] accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    V1,
    V2,
}

const SUPPORTED: &str = "v1, v1stack, v2";

/// Parses a Porter-YAML document of either dialect into the canonical model.
pub fn parse_yaml(bytes: &[u8]) -> Result<App> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MalformedDocument {
            reason: "document is empty".to_string(),
        });
    }
    let doc = serde_yaml::from_slice::<Value>(bytes).map_err(|error| Error::MalformedDocument {
        reason: error.to_string(),
    })?;

    let dialect = Dialect::sniff(&doc)?;
    debug!(%dialect, "Parsing document");
    match dialect {
        Dialect::V1 => v1::parse(&doc),
        Dialect::V2 => v2::parse(doc),
    }
}

// === impl Dialect ===

impl Dialect {
    /// Picks a dialect from the document's top-level `version`. Documents without one are v1.
    pub fn sniff(doc: &Value) -> Result<Self> {
        if !doc.is_mapping() {
            return Err(Error::MalformedDocument {
                reason: "the top level must be a mapping".to_string(),
            });
        }
        let version = coerce::to_string(&Cursor::root(doc).child("version")?)?;
        if version.is_empty() {
            return Ok(Self::V1);
        }
        version.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => V2_VERSION,
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == V2_VERSION {
            return Ok(Self::V2);
        }
        if v1::VERSIONS.contains(&s) {
            return Ok(Self::V1);
        }
        Err(Error::UnsupportedVersion {
            version: s.to_string(),
            supported: SUPPORTED,
        })
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sniff(yaml: &str) -> Result<Dialect> {
        Dialect::sniff(&serde_yaml::from_str(yaml).expect("test documents must be valid YAML"))
    }

    #[rstest]
    #[case("apps: {}", Dialect::V1)]
    #[case("version: ~\napps: {}", Dialect::V1)]
    #[case("version: v1", Dialect::V1)]
    #[case("version: v1stack", Dialect::V1)]
    #[case("version: v2", Dialect::V2)]
    fn routes_by_version(#[case] yaml: &str, #[case] dialect: Dialect) {
        assert_eq!(sniff(yaml).unwrap(), dialect);
    }

    #[rstest]
    #[case("version: v3")]
    #[case("version: v2beta1")]
    #[case("version: V2")]
    fn rejects_unknown_versions(#[case] yaml: &str) {
        let err = sniff(yaml).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }), "{err}");
    }

    #[test]
    fn rejects_non_string_versions() {
        let err = sniff("version: 2").unwrap_err();
        assert!(
            matches!(err, Error::InvalidValue { ref field, .. } if field == "version"),
            "{err}"
        );
    }

    #[rstest]
    #[case(&b""[..])]
    #[case(&b"  \n"[..])]
    #[case(&b"- a\n- b\n"[..])]
    #[case(&b"just a string"[..])]
    #[case(&b"apps: [unclosed"[..])]
    fn rejects_malformed_documents(#[case] bytes: &[u8]) {
        let err = parse_yaml(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }), "{err}");
    }
}
