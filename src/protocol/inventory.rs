//! Inventory queries: countable objects, counters, LUNs, volumes, aggregates

use crate::decode::{decode, FieldFilter, NormalizedRecord};
use crate::domain::{CounterDescriptor, Element, InventoryItem, ObjectDescriptor};
use crate::error::Result;
use crate::protocol::{ApiClient, PERF_OBJECT_COUNTER_LIST_INFO, PERF_OBJECT_LIST_INFO};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// Listings
// =============================================================================

/// Single-shot inventory listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    Luns,
    Volumes,
    Aggregates,
}

impl Listing {
    /// Call used against single-node arrays
    pub fn single_node_call(&self) -> &'static str {
        match self {
            Listing::Luns => "lun-list-info",
            Listing::Volumes => "volume-list-info",
            Listing::Aggregates => "aggr-list-info",
        }
    }

    /// Call used against clustered arrays
    pub fn clustered_call(&self) -> &'static str {
        match self {
            Listing::Luns => "lun-get-iter",
            Listing::Volumes => "volume-get-iter",
            Listing::Aggregates => "aggr-get-iter",
        }
    }

    /// Node holding the items in a single-node response
    pub fn single_node_container(&self) -> &'static str {
        match self {
            Listing::Luns => "luns",
            Listing::Volumes => "volumes",
            Listing::Aggregates => "aggregates",
        }
    }
}

impl std::fmt::Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listing::Luns => write!(f, "luns"),
            Listing::Volumes => write!(f, "volumes"),
            Listing::Aggregates => write!(f, "aggregates"),
        }
    }
}

/// Issue a listing call and flatten the items found under `container`
pub(crate) async fn fetch_listing(
    client: &ApiClient,
    request: Element,
    container: &str,
    listing: Listing,
    filter: Option<&FieldFilter>,
) -> Result<Vec<InventoryItem>> {
    let results = client.call(request).await?;
    let items = items_under(results.child(container), filter);
    debug!("Listed {} {}", items.len(), listing);
    Ok(items)
}

/// Decode every non-leaf child of the container into a flat item
pub(crate) fn items_under(
    container: Option<&Element>,
    filter: Option<&FieldFilter>,
) -> Vec<InventoryItem> {
    container
        .map(|c| c.children())
        .unwrap_or(&[])
        .iter()
        .filter(|item| item.has_children())
        .map(|item| into_item(decode(item, filter), item.name()))
        .collect()
}

/// Flatten one decoded item named `wrapper`.
///
/// A `{wrapper: {..}}` record (an item made only of leaves) is unwrapped.
/// A list of attribute groups, as clustered volumes return, is merged into
/// one mapping, taking the first entry of any nested list.
pub(crate) fn into_item(record: NormalizedRecord, wrapper: &str) -> InventoryItem {
    match record {
        NormalizedRecord::Map(map) if is_wrapped(&map, wrapper) => {
            match map.into_iter().next() {
                Some((_, NormalizedRecord::Map(inner))) => inner,
                _ => IndexMap::new(),
            }
        }
        NormalizedRecord::Map(map) => map,
        NormalizedRecord::List(groups) => {
            let mut merged = IndexMap::new();
            for group in groups {
                let group = match group {
                    NormalizedRecord::List(nested) => nested.into_iter().next(),
                    other => Some(other),
                };
                if let Some(NormalizedRecord::Map(fields)) = group {
                    merged.extend(fields);
                }
            }
            merged
        }
        scalar @ NormalizedRecord::Scalar(_) => {
            let mut item = IndexMap::new();
            item.insert(wrapper.to_string(), scalar);
            item
        }
    }
}

fn is_wrapped(map: &IndexMap<String, NormalizedRecord>, wrapper: &str) -> bool {
    map.len() == 1 && matches!(map.get(wrapper), Some(NormalizedRecord::Map(_)))
}

// =============================================================================
// Performance Objects
// =============================================================================

/// List countable objects with their description and privilege level
pub async fn list_objects(client: &ApiClient) -> Result<BTreeMap<String, ObjectDescriptor>> {
    let results = client.call(Element::new(PERF_OBJECT_LIST_INFO)).await?;
    Ok(parse_objects(&results))
}

pub(crate) fn parse_objects(results: &Element) -> BTreeMap<String, ObjectDescriptor> {
    results
        .children_of("objects")
        .iter()
        .filter_map(|object| {
            let name = object.child_str("name")?;
            Some((
                name.to_string(),
                ObjectDescriptor {
                    description: object.child_str("description").unwrap_or_default().to_string(),
                    privilege_level: object
                        .child_str("privilege-level")
                        .unwrap_or_default()
                        .to_string(),
                },
            ))
        })
        .collect()
}

/// List the counters of one countable object
pub async fn list_counters(
    client: &ApiClient,
    object: &str,
) -> Result<BTreeMap<String, CounterDescriptor>> {
    let request = Element::new(PERF_OBJECT_COUNTER_LIST_INFO).with_value("objectname", object);
    let results = client.call(request).await?;
    Ok(parse_counters(&results))
}

pub(crate) fn parse_counters(results: &Element) -> BTreeMap<String, CounterDescriptor> {
    results
        .children_of("counters")
        .iter()
        .filter_map(|counter| {
            let name = counter.child_str("name")?;
            let text = |field: &str| counter.child_str(field).unwrap_or_default().to_string();
            let labels: Vec<String> = counter
                .child("labels")
                .and_then(|l| l.child_str("label-info"))
                .map(|raw| raw.split(',').map(|l| l.trim().to_string()).collect())
                .unwrap_or_default();
            Some((
                name.to_string(),
                CounterDescriptor {
                    unit: text("unit"),
                    properties: text("properties"),
                    base_counter: text("base-counter"),
                    privilege_level: text("privilege-level"),
                    description: text("desc"),
                    labels,
                },
            ))
        })
        .collect()
}
