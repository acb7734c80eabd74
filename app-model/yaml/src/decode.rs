use porter_app_model_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_yaml::Value;

/// Decodes a typed document, reporting serde failures against the dotted path where they occur.
///
/// A missing field becomes `MissingRequired` naming the field; every other failure (unknown
/// fields in strict types, wrong scalar types, unknown variants) becomes `InvalidValue`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|error| {
        let path = match error.path().to_string() {
            p if p == "." => String::new(),
            p => p,
        };
        let message = error.into_inner().to_string();
        classify(path, message)
    })
}

fn classify(path: String, message: String) -> Error {
    if let Some(field) = backticked(&message, "missing field `") {
        return Error::missing(join(&path, field));
    }
    if let Some(field) = backticked(&message, "unknown field `") {
        // The path already ends with the offending key.
        let path = if path == field || path.ends_with(&format!(".{field}")) {
            path
        } else {
            join(&path, field)
        };
        return Error::invalid_value(path, "an unknown field", "a known field");
    }
    let field = if path.is_empty() { ".".to_string() } else { path };
    Error::invalid_value(field, message, "a value matching the document schema")
}

/// Extracts the backticked name following `prefix`, as serde formats field errors.
fn backticked<'m>(message: &'m str, prefix: &str) -> Option<&'m str> {
    let rest = message.strip_prefix(prefix)?;
    rest.split('`').next()
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Outer {
        #[allow(dead_code)]
        inner: Inner,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Inner {
        #[allow(dead_code)]
        port: u16,
    }

    fn decode(yaml: &str) -> Result<Outer> {
        from_value(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn missing_fields_are_required() {
        let err = decode("inner: {}\n").unwrap_err();
        assert!(
            matches!(err, Error::MissingRequired { ref path } if path == "inner.port"),
            "{err}"
        );
    }

    #[test]
    fn unknown_fields_are_invalid() {
        let err = decode("inner: {port: 1, prot: 2}\n").unwrap_err();
        assert!(
            matches!(err, Error::InvalidValue { ref field, .. } if field == "inner.prot"),
            "{err}"
        );
    }

    #[test]
    fn type_errors_name_the_path() {
        let err = decode("inner: {port: http}\n").unwrap_err();
        assert!(
            matches!(err, Error::InvalidValue { ref field, .. } if field == "inner.port"),
            "{err}"
        );
    }
}
