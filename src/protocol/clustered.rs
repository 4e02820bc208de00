//! Clustered dialect
//!
//! Instances are addressed by UUID. Enumeration is one combined list+advance
//! call repeated with the previous `next-tag`; there is no cursor to release.
//! Counters come back from a single `perf-object-get-instances` call.

use crate::decode::FieldFilter;
use crate::domain::{CounterSet, Dialect, Element, InstanceId, InventoryItem};
use crate::error::Result;
use crate::protocol::inventory::{fetch_listing, Listing};
use crate::protocol::samples::collect_instances;
use crate::protocol::{
    record_count, string_list, ApiClient, DialectProtocol, IterOutcome, GET_INSTANCES,
    INSTANCE_LIST_ITER,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Strategy for clustered arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusteredProtocol;

#[async_trait]
impl DialectProtocol for ClusteredProtocol {
    fn dialect(&self) -> Dialect {
        Dialect::Clustered
    }

    async fn list(
        &self,
        client: &ApiClient,
        listing: Listing,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<InventoryItem>> {
        // single bounded page; later pages are not fetched
        let request =
            Element::new(listing.clustered_call()).with_value("max-records", client.max_records());
        fetch_listing(client, request, "attributes-list", listing, filter).await
    }

    async fn enumerate_instances(
        &self,
        client: &ApiClient,
        object: &str,
        filter: Option<&str>,
    ) -> Result<IterOutcome<Vec<InstanceId>>> {
        let page_size = client.max_records();
        let filter = filter.filter(|f| !f.is_empty());
        let mut next_tag = String::new();
        let mut uuids = Vec::new();
        let mut records = page_size;

        while records == page_size {
            let mut request = Element::new(INSTANCE_LIST_ITER).with_value("objectname", object);
            if let Some(filter) = filter {
                request.push_child(Element::leaf("filter-data", filter));
            }
            if !next_tag.is_empty() {
                request.push_child(Element::leaf("tag", next_tag.as_str()));
            }
            request.push_child(Element::leaf("max-records", page_size.to_string()));

            let page = client.call(request).await?;
            records = record_count(&page, "num-records", INSTANCE_LIST_ITER)?;
            uuids.extend(
                page.children_of("attributes-list")
                    .iter()
                    .filter_map(|inst| inst.child_str("uuid"))
                    .map(InstanceId::from),
            );
            debug!("{}: {} records, {} uuids so far", INSTANCE_LIST_ITER, records, uuids.len());

            next_tag = page.child_str("next-tag").unwrap_or_default().to_string();
            if records == page_size && next_tag.is_empty() {
                // without a tag the next call would restart from the first page
                warn!("{} returned a full page without next-tag; stopping", INSTANCE_LIST_ITER);
                break;
            }
        }

        Ok(IterOutcome::complete(uuids))
    }

    async fn collect_counters(
        &self,
        client: &ApiClient,
        object: &str,
        instances: &[InstanceId],
        counters: &[String],
    ) -> Result<IterOutcome<CounterSet>> {
        let mut request = Element::new(GET_INSTANCES);
        if !instances.is_empty() {
            request.push_child(string_list(
                "instance-uuids",
                "instance-uuid",
                instances.iter().map(InstanceId::as_str),
            ));
        }
        request.push_child(Element::leaf("objectname", object));
        if !counters.is_empty() {
            request.push_child(string_list(
                "counters",
                "counter",
                counters.iter().map(String::as_str),
            ));
        }

        let results = client.call(request).await?;
        let set = collect_instances(&results, GET_INSTANCES)?;
        debug!("{}: {} instances for {}", GET_INSTANCES, set.len(), object);
        Ok(IterOutcome::complete(set))
    }
}
