use porter_app_model_core::{Error, Result};
use serde_yaml::Value;

/// A position in an untyped YAML tree, remembering the dotted path that led to it.
///
/// Absent keys and explicit `null`s are both treated as "not present", so readers can walk into
/// optional blocks without checking each level.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    path: String,
    value: Option<&'a Value>,
}

// === impl Cursor ===

impl<'a> Cursor<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            path: String::new(),
            value: Some(value),
        }
    }

    /// Walks into `key`.
    ///
    /// Fails when this node is present but is not a mapping; the caller asked for a key, so the
    /// document is malformed at this path.
    pub fn child(&self, key: &str) -> Result<Self> {
        let path = self.join(key);
        let value = match self.value() {
            None => None,
            Some(Value::Mapping(map)) => map.get(key).filter(|v| !v.is_null()),
            Some(other) => {
                return Err(Error::invalid_value(
                    self.display_path(),
                    describe(other),
                    "a mapping",
                ))
            }
        };
        Ok(Self { path, value })
    }

    /// Returns the entries of a mapping node, in document order. An absent node has no entries.
    pub fn entries(&self) -> Result<Vec<(String, Self)>> {
        let map = match self.value() {
            None => return Ok(Vec::new()),
            Some(Value::Mapping(map)) => map,
            Some(other) => {
                return Err(Error::invalid_value(
                    self.display_path(),
                    describe(other),
                    "a mapping",
                ))
            }
        };

        map.iter()
            .map(|(k, v)| {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => {
                        return Err(Error::invalid_value(
                            self.display_path(),
                            describe(other),
                            "string keys",
                        ))
                    }
                };
                let value = Self {
                    path: self.join(&key),
                    value: Some(v).filter(|v| !v.is_null()),
                };
                Ok((key, value))
            })
            .collect()
    }

    /// Returns the elements of a sequence node. An absent node has no elements.
    pub fn elements(&self) -> Result<Vec<Self>> {
        let seq = match self.value() {
            None => return Ok(Vec::new()),
            Some(Value::Sequence(seq)) => seq,
            Some(other) => {
                return Err(Error::invalid_value(
                    self.display_path(),
                    describe(other),
                    "a sequence",
                ))
            }
        };

        Ok(seq
            .iter()
            .enumerate()
            .map(|(i, v)| Self {
                path: format!("{}[{i}]", self.path),
                value: Some(v).filter(|v| !v.is_null()),
            })
            .collect())
    }

    #[inline]
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn display_path(&self) -> &str {
        if self.path.is_empty() {
            "."
        } else {
            &self.path
        }
    }

    fn join(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }
}

/// Describes a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Sequence(_) => "a sequence".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => format!("a value tagged {}", tagged.tag),
    }
}
