use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while canonicalizing, emitting or resolving an application.
///
/// Every variant that describes bad input names the offending field path (for example
/// `services.api.config.resources.requests.cpu`) so that it can be surfaced to users verbatim.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    #[error("unsupported version `{version}` (supported: {supported})")]
    UnsupportedVersion {
        version: String,
        supported: &'static str,
    },

    #[error("`{path}` may not be set together with `{other}`")]
    ConflictingFields { path: String, other: String },

    #[error("`{path}` is required")]
    MissingRequired { path: String },

    #[error("application declares no services and no release")]
    EmptyApp,

    #[error("cannot infer the type of service `{name}`; set `type` to one of web, worker, job")]
    UnknownServiceType { name: String },

    #[error("invalid value for `{field}`: got {got}, want {want}")]
    InvalidValue {
        field: String,
        got: String,
        want: String,
    },

    #[error("resource `{name}` is declared more than once")]
    DuplicateResource { name: String },

    #[error("resource `{from}` depends on undeclared resource `{to}`")]
    DanglingDependency { from: String, to: String },

    #[error("dependency cycle detected: `{from}` -> `{to}`")]
    Cycle { from: String, to: String },

    #[error("unsupported deployment target selector `{kind}` (supported: namespace)")]
    UnsupportedSelector { kind: String },

    #[error("env group `{name}` (version {version}) not found")]
    EnvGroupNotFound { name: String, version: u32 },

    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`], matching the terminal states of every public entry
/// point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied a document or request the core rejects.
    InvalidInput,

    /// An injected collaborator failed; the host decides whether to retry.
    Transport,

    /// The core violated one of its own invariants.
    Internal,
}

// === impl Error ===

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::InvalidInput,
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        got: impl Into<String>,
        want: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            got: got.into(),
            want: want.into(),
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingRequired { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_kinds() {
        assert_eq!(Error::EmptyApp.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            Error::Cycle {
                from: "a".into(),
                to: "b".into()
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::Transport(anyhow::anyhow!("connection reset")).kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::Internal("oops".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn messages_name_the_field() {
        let err = Error::invalid_value(
            "services.api.config.resources.requests.cpu",
            "\"1u\"",
            "cores or millicores",
        );
        assert_eq!(
            err.to_string(),
            "invalid value for `services.api.config.resources.requests.cpu`: got \"1u\", want \
             cores or millicores"
        );
        assert_eq!(
            Error::missing("services.foo.type").to_string(),
            "`services.foo.type` is required"
        );
    }
}
