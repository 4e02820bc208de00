//! Single-node dialect
//!
//! Instances are addressed by name. Enumeration and counter collection run
//! a server-side iterator: `iter-start` hands out a tag, `iter-next` pages
//! until a short page, and `iter-end` releases the tag.

use crate::decode::FieldFilter;
use crate::domain::{CounterSet, Dialect, Element, InstanceId, InventoryItem};
use crate::error::{Error, Result};
use crate::protocol::inventory::{fetch_listing, Listing};
use crate::protocol::samples::{collect_instances, parse_timestamp};
use crate::protocol::{
    record_count, release_cursor, string_list, ApiClient, DialectProtocol, IterOutcome,
    GET_INSTANCES_ITER_END, GET_INSTANCES_ITER_NEXT, GET_INSTANCES_ITER_START,
    INSTANCE_LIST_ITER_END, INSTANCE_LIST_ITER_NEXT, INSTANCE_LIST_ITER_START,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Strategy for single-node arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNodeProtocol;

impl SingleNodeProtocol {
    async fn start_iterator(&self, client: &ApiClient, request: Element) -> Result<(String, Element)> {
        let operation = request.name().to_string();
        let results = client.call(request).await?;
        let tag = results
            .child_str("tag")
            .ok_or_else(|| Error::unexpected(&operation, "no iterator tag"))?
            .to_string();
        Ok((tag, results))
    }

    /// Page through instance names until a short page
    async fn drain_instance_names(&self, client: &ApiClient, tag: &str) -> Result<Vec<InstanceId>> {
        let page_size = client.max_records();
        let mut names = Vec::new();
        let mut records = page_size;

        while records == page_size {
            let request = Element::new(INSTANCE_LIST_ITER_NEXT)
                .with_value("tag", tag)
                .with_value("maximum", page_size);
            let page = client.call(request).await?;
            records = record_count(&page, "records", INSTANCE_LIST_ITER_NEXT)?;

            names.extend(
                page.children_of("instances")
                    .iter()
                    .filter_map(|inst| inst.child_str("name"))
                    .map(InstanceId::from),
            );
            debug!("{}: {} records, {} names so far", INSTANCE_LIST_ITER_NEXT, records, names.len());
        }

        Ok(names)
    }

    /// Page through counter samples, merging instances split across pages
    async fn drain_counter_pages(
        &self,
        client: &ApiClient,
        tag: &str,
        mut accumulated: CounterSet,
    ) -> Result<CounterSet> {
        let page_size = client.max_records();
        let mut records = page_size;

        while records == page_size {
            let request = Element::new(GET_INSTANCES_ITER_NEXT)
                .with_value("tag", tag)
                .with_value("maximum", page_size);
            let page = client.call(request).await?;
            records = record_count(&page, "records", GET_INSTANCES_ITER_NEXT)?;

            let partial = collect_instances(&page, GET_INSTANCES_ITER_NEXT)?;
            debug!("{}: {} records, {} instances", GET_INSTANCES_ITER_NEXT, records, partial.len());
            accumulated.merge_page(partial);
        }

        Ok(accumulated)
    }
}

/// Release the iterator, then return the drained value or the primary error
async fn finish<T>(
    client: &ApiClient,
    end_call: &str,
    tag: &str,
    drained: Result<T>,
) -> Result<IterOutcome<T>> {
    let released = release_cursor(client, end_call, tag).await;
    match drained {
        Ok(value) => Ok(IterOutcome::new(value, released.err())),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl DialectProtocol for SingleNodeProtocol {
    fn dialect(&self) -> Dialect {
        Dialect::SingleNode
    }

    async fn list(
        &self,
        client: &ApiClient,
        listing: Listing,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<InventoryItem>> {
        let request = Element::new(listing.single_node_call());
        fetch_listing(client, request, listing.single_node_container(), listing, filter).await
    }

    async fn enumerate_instances(
        &self,
        client: &ApiClient,
        object: &str,
        filter: Option<&str>,
    ) -> Result<IterOutcome<Vec<InstanceId>>> {
        if filter.is_some_and(|f| !f.is_empty()) {
            warn!("Instance filters are not supported by single-node arrays; ignoring");
        }

        let start = Element::new(INSTANCE_LIST_ITER_START).with_value("objectname", object);
        let (tag, _) = self.start_iterator(client, start).await?;

        let drained = self.drain_instance_names(client, &tag).await;
        finish(client, INSTANCE_LIST_ITER_END, &tag, drained).await
    }

    async fn collect_counters(
        &self,
        client: &ApiClient,
        object: &str,
        instances: &[InstanceId],
        counters: &[String],
    ) -> Result<IterOutcome<CounterSet>> {
        let mut start = Element::new(GET_INSTANCES_ITER_START).with_value("objectname", object);
        if !counters.is_empty() {
            start.push_child(string_list(
                "counters",
                "counter",
                counters.iter().map(String::as_str),
            ));
        }
        if !instances.is_empty() {
            start.push_child(string_list(
                "instances",
                "instance",
                instances.iter().map(InstanceId::as_str),
            ));
        }

        let (tag, started) = self.start_iterator(client, start).await?;
        let accumulated = match parse_timestamp(&started, GET_INSTANCES_ITER_START) {
            Ok(server_timestamp) => CounterSet {
                server_timestamp,
                ..CounterSet::default()
            },
            Err(e) => return finish(client, GET_INSTANCES_ITER_END, &tag, Err(e)).await,
        };

        let drained = self.drain_counter_pages(client, &tag, accumulated).await;
        finish(client, GET_INSTANCES_ITER_END, &tag, drained).await
    }
}
