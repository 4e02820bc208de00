//! Counter sample extraction and instance key normalization

use crate::domain::{CounterSample, CounterSet, Element};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Map an instance name or UUID onto the flat key space used by metric
/// consumers.
///
/// Steps, in order: NFKD decomposition, drop non-ASCII, `.` to `_` and trim
/// `_`, `/` to `.` and trim `.`, then anything outside `[A-Za-z0-9._]` to
/// `_`. So `volA.rg0/plex0` becomes `volA_rg0.plex0`.
pub fn normalize_instance_key(raw: &str) -> String {
    let ascii = to_ascii(raw);
    let dotted = ascii.replace('.', "_");
    let slashed = dotted.trim_matches('_').replace('/', ".");
    slashed
        .trim_matches('.')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// NFKD-decompose a counter name and keep only its ASCII part
pub fn normalize_counter_name(raw: &str) -> String {
    to_ascii(raw)
}

fn to_ascii(raw: &str) -> String {
    raw.nfkd().filter(char::is_ascii).collect()
}

/// Wall-clock time in epoch seconds
pub(crate) fn now_epoch() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Parse an optional `timestamp` field as epoch seconds
pub(crate) fn parse_timestamp(results: &Element, operation: &str) -> Result<Option<f64>> {
    results
        .child_str("timestamp")
        .map(|raw| {
            raw.trim().parse::<f64>().map_err(|e| {
                Error::Parse(format!("{} returned timestamp '{}': {}", operation, raw, e))
            })
        })
        .transpose()
}

/// Build counter samples from a response carrying an `instances` list.
///
/// Each instance is keyed by its normalized UUID, or its name when no UUID
/// is present, and stamped with the decoding time. The response-level
/// timestamp, when present, is returned as the server sample time.
pub fn collect_instances(results: &Element, operation: &str) -> Result<CounterSet> {
    let mut samples = BTreeMap::new();

    for instance in results.children_of("instances") {
        let raw_key = match instance
            .child_str("uuid")
            .or_else(|| instance.child_str("name"))
        {
            Some(key) => key,
            None => {
                debug!("{}: skipping instance without uuid or name", operation);
                continue;
            }
        };

        let counters = instance
            .children_of("counters")
            .iter()
            .filter_map(|counter| {
                let name = counter.child_str("name")?;
                let value = counter.child_str("value").unwrap_or_default();
                Some((normalize_counter_name(name), value.to_string()))
            })
            .collect();

        samples.insert(
            normalize_instance_key(raw_key),
            CounterSample {
                counters,
                captured_at: now_epoch(),
            },
        );
    }

    Ok(CounterSet {
        samples,
        server_timestamp: parse_timestamp(results, operation)?,
    })
}
