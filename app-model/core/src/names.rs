use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const DNS_LABEL_REGEX: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

/// Kubernetes limits DNS-1123 labels to 63 bytes.
const DNS_LABEL_MAX_LEN: usize = 63;

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(DNS_LABEL_REGEX).expect("DNS label regex must compile"));

pub fn is_dns_label(name: &str) -> bool {
    name.len() <= DNS_LABEL_MAX_LEN && DNS_LABEL.is_match(name)
}

/// Fails with `InvalidValue` at `path` unless `name` is a DNS-1123 label.
pub fn validate_dns_label(path: &str, name: &str) -> Result<()> {
    if is_dns_label(name) {
        return Ok(());
    }
    Err(Error::invalid_value(
        path,
        format!("{name:?}"),
        format!("a DNS label of at most {DNS_LABEL_MAX_LEN} characters matching {DNS_LABEL_REGEX}"),
    ))
}
