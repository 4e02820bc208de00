//! Dialect and version probe

use crate::domain::{Element, VersionInfo};
use crate::error::{Error, Result};
use crate::protocol::{ApiClient, SYSTEM_GET_VERSION};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version pattern"))
}

/// Issue `system-get-version` and work out dialect and version
pub async fn detect_version(client: &ApiClient) -> Result<VersionInfo> {
    let results = client.call(Element::new(SYSTEM_GET_VERSION)).await?;
    parse_version(&results)
}

/// Read dialect and version from a `system-get-version` result.
///
/// Clustering comes from `is-clustered` and defaults to false. The version
/// comes from the structured `version-tuple` when present, else from the
/// first `x.y.z` in the free-text `version` string.
pub fn parse_version(results: &Element) -> Result<VersionInfo> {
    let mut info = VersionInfo {
        clustered: results.child_str("is-clustered") == Some("true"),
        ..VersionInfo::default()
    };

    let tuple = results
        .child("version-tuple")
        .and_then(|v| v.child("system-version-tuple"));

    if let Some(tuple) = tuple {
        let field = |name: &str| tuple.child_str(name).unwrap_or("0").to_string();
        info.generation = field("generation");
        info.major = field("major");
        info.minor = field("minor");
    } else if let Some(text) = results.child_str("version") {
        let caps = version_pattern().captures(text).ok_or_else(|| {
            Error::Parse(format!("no numeric version in '{}'", text))
        })?;
        info.generation = caps[1].to_string();
        info.major = caps[2].to_string();
        info.minor = caps[3].to_string();
    }

    debug!("Detected {} array, version {}", info.dialect(), info);
    Ok(info)
}
