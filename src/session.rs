//! Array Session
//!
//! One session per array: it owns the transport handle, the detected
//! version, the namespace selector and the dialect strategy picked at
//! detection time. Every operation runs its remote calls sequentially;
//! cursors live only for the duration of the call that opened them.

use crate::config::ArrayConfig;
use crate::decode::FieldFilter;
use crate::domain::{
    ApiResponse, ArrayTransport, CounterDescriptor, CounterSet, Dialect, Element, InstanceId,
    InventoryItem, ObjectDescriptor, VersionInfo,
};
use crate::error::Result;
use crate::protocol::{
    detect_version, inventory, protocol_for, ApiClient, DialectProtocol, IterOutcome, Listing,
};
use crate::transport::HttpTransport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// A connected array
pub struct Session {
    client: ApiClient,
    device: String,
    vserver: Option<String>,
    version: VersionInfo,
    protocol: Box<dyn DialectProtocol>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("vserver", &self.vserver)
            .field("version", &self.version)
            .field("max_records", &self.client.max_records())
            .finish()
    }
}

impl Session {
    /// Connect over HTTP and detect the array's dialect
    pub async fn connect(config: &ArrayConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::connect(config)?);
        Self::with_transport(transport, config).await
    }

    /// Build a session on an injected transport and detect the dialect
    pub async fn with_transport(
        transport: Arc<dyn ArrayTransport>,
        config: &ArrayConfig,
    ) -> Result<Self> {
        config.validate()?;

        let vserver = config.namespace().map(str::to_string);
        transport.select_namespace(vserver.as_deref());

        let client = ApiClient::new(transport, config.max_records);
        let version = detect_version(&client).await?;
        info!(
            "Connected to {} ({} array, version {})",
            config.address,
            version.dialect(),
            version
        );

        Ok(Self {
            client,
            device: config.address.clone(),
            vserver,
            protocol: protocol_for(version.dialect()),
            version,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn vserver(&self) -> Option<&str> {
        self.vserver.as_deref()
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn is_clustered(&self) -> bool {
        self.version.clustered
    }

    pub fn dialect(&self) -> Dialect {
        self.protocol.dialect()
    }

    pub fn max_records(&self) -> u32 {
        self.client.max_records()
    }

    /// Scope subsequent calls to a namespace; `None` or empty clears it
    pub fn set_vserver(&mut self, vserver: Option<&str>) {
        let vserver = vserver.filter(|v| !v.is_empty());
        self.client.transport().select_namespace(vserver);
        self.vserver = vserver.map(str::to_string);
    }

    /// Probe the version again and reselect the dialect strategy
    pub async fn refresh_version(&mut self) -> Result<&VersionInfo> {
        let version = detect_version(&self.client).await?;
        if version.dialect() != self.protocol.dialect() {
            info!("{} now reports a {} array", self.device, version.dialect());
            self.protocol = protocol_for(version.dialect());
        }
        self.version = version;
        Ok(&self.version)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Countable objects with description and privilege level
    pub async fn list_objects(&self) -> Result<BTreeMap<String, ObjectDescriptor>> {
        inventory::list_objects(&self.client).await
    }

    /// Counters of one countable object
    pub async fn list_counters(&self, object: &str) -> Result<BTreeMap<String, CounterDescriptor>> {
        inventory::list_counters(&self.client, object).await
    }

    pub async fn list_luns(&self, filter: Option<&FieldFilter>) -> Result<Vec<InventoryItem>> {
        self.protocol.list(&self.client, Listing::Luns, filter).await
    }

    pub async fn list_volumes(&self, filter: Option<&FieldFilter>) -> Result<Vec<InventoryItem>> {
        self.protocol.list(&self.client, Listing::Volumes, filter).await
    }

    pub async fn list_aggregates(&self, filter: Option<&FieldFilter>) -> Result<Vec<InventoryItem>> {
        self.protocol.list(&self.client, Listing::Aggregates, filter).await
    }

    // =========================================================================
    // Performance Counters
    // =========================================================================

    /// Every instance of a countable object.
    ///
    /// `filter` is passed to clustered arrays as `filter-data`.
    pub async fn enumerate_instances(
        &self,
        object: &str,
        filter: Option<&str>,
    ) -> Result<IterOutcome<Vec<InstanceId>>> {
        self.protocol
            .enumerate_instances(&self.client, object, filter)
            .await
    }

    /// Counter samples for the given instances, keyed by normalized
    /// instance key
    pub async fn collect_counters(
        &self,
        object: &str,
        instances: &[InstanceId],
        counters: &[String],
    ) -> Result<IterOutcome<CounterSet>> {
        self.protocol
            .collect_counters(&self.client, object, instances, counters)
            .await
    }

    /// Invoke an arbitrary call and return the raw response, status included
    pub async fn invoke_raw(&self, request: &Element) -> Result<ApiResponse> {
        self.client.transport().invoke(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{
        GET_INSTANCES, GET_INSTANCES_ITER_END, GET_INSTANCES_ITER_NEXT, GET_INSTANCES_ITER_START,
        INSTANCE_LIST_ITER, INSTANCE_LIST_ITER_START, PERF_OBJECT_COUNTER_LIST_INFO,
        PERF_OBJECT_LIST_INFO, SYSTEM_GET_VERSION,
    };
    use crate::transport::ScriptedTransport;
    use assert_matches::assert_matches;

    fn clustered_version() -> Element {
        Element::new("results")
            .with_value("is-clustered", "true")
            .with_child(
                Element::new("version-tuple").with_child(
                    Element::new("system-version-tuple")
                        .with_value("generation", 9)
                        .with_value("major", 8)
                        .with_value("minor", 1),
                ),
            )
    }

    fn single_node_version() -> Element {
        Element::new("results").with_value("version", "NetApp Release 7.3.2")
    }

    async fn session(transport: &Arc<ScriptedTransport>, config: &ArrayConfig) -> Session {
        Session::with_transport(transport.clone(), config).await.unwrap()
    }

    #[tokio::test]
    async fn test_detects_clustered_and_selects_namespace() {
        let transport = Arc::new(ScriptedTransport::new("cluster01"));
        transport.respond_ok(SYSTEM_GET_VERSION, clustered_version());
        let mut config = ArrayConfig::new("cluster01", "admin", "pw");
        config.vserver = Some("svm1".into());

        let session = session(&transport, &config).await;
        assert!(session.is_clustered());
        assert_eq!(session.dialect(), Dialect::Clustered);
        assert_eq!(session.version().to_string(), "9.8.1");
        assert_eq!(session.vserver(), Some("svm1"));
        assert_eq!(transport.namespace().as_deref(), Some("svm1"));
        assert_eq!(session.max_records(), 999);
    }

    #[tokio::test]
    async fn test_detects_single_node() {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport.respond_ok(SYSTEM_GET_VERSION, single_node_version());
        let session = session(&transport, &ArrayConfig::new("filer01", "root", "pw")).await;

        assert!(!session.is_clustered());
        assert_eq!(session.dialect(), Dialect::SingleNode);
        assert_eq!(session.version().major, "3");
    }

    #[tokio::test]
    async fn test_version_failure_aborts_session() {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport.respond_err(SYSTEM_GET_VERSION, 13005, "Unable to find API");
        let err = Session::with_transport(transport.clone(), &ArrayConfig::new("filer01", "root", "pw"))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Protocol { ref reason, .. } if reason == "Unable to find API");
    }

    #[tokio::test]
    async fn test_single_node_page_sequence() {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, single_node_version())
            .respond_ok(
                GET_INSTANCES_ITER_START,
                Element::new("results").with_value("tag", "t"),
            );
        for records in [999, 999, 437] {
            transport.respond_ok(
                GET_INSTANCES_ITER_NEXT,
                Element::new("results").with_value("records", records),
            );
        }
        transport.respond_ok(GET_INSTANCES_ITER_END, Element::new("results"));

        let session = session(&transport, &ArrayConfig::new("filer01", "root", "pw")).await;
        let outcome = session.collect_counters("disk", &[], &[]).await.unwrap();

        assert!(outcome.released());
        assert_eq!(transport.count(GET_INSTANCES_ITER_NEXT), 3);
        assert_eq!(transport.count(GET_INSTANCES_ITER_END), 1);
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn test_every_call_reports_failures() {
        let transport = Arc::new(ScriptedTransport::new("cluster01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, clustered_version())
            .respond_err(PERF_OBJECT_LIST_INFO, 1, "objects down")
            .respond_err(PERF_OBJECT_COUNTER_LIST_INFO, 2, "counters down")
            .respond_err("lun-get-iter", 3, "luns down")
            .respond_err("volume-get-iter", 4, "volumes down")
            .respond_err("aggr-get-iter", 5, "aggregates down")
            .respond_err(INSTANCE_LIST_ITER, 6, "instances down")
            .respond_err(GET_INSTANCES, 7, "samples down");
        let session = session(&transport, &ArrayConfig::new("cluster01", "admin", "pw")).await;

        let reason = |e: Error| match e {
            Error::Protocol { reason, .. } => reason,
            other => panic!("unexpected error {other}"),
        };
        assert_eq!(reason(session.list_objects().await.unwrap_err()), "objects down");
        assert_eq!(reason(session.list_counters("volume").await.unwrap_err()), "counters down");
        assert_eq!(reason(session.list_luns(None).await.unwrap_err()), "luns down");
        assert_eq!(reason(session.list_volumes(None).await.unwrap_err()), "volumes down");
        assert_eq!(reason(session.list_aggregates(None).await.unwrap_err()), "aggregates down");
        assert_eq!(
            reason(session.enumerate_instances("volume", None).await.unwrap_err()),
            "instances down"
        );
        assert_eq!(
            reason(session.collect_counters("volume", &[], &[]).await.unwrap_err()),
            "samples down"
        );
    }

    #[tokio::test]
    async fn test_every_single_node_call_reports_failures() {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, single_node_version())
            .respond_err(PERF_OBJECT_LIST_INFO, 1, "objects down")
            .respond_err(PERF_OBJECT_COUNTER_LIST_INFO, 2, "counters down")
            .respond_err("lun-list-info", 3, "luns down")
            .respond_err("volume-list-info", 4, "volumes down")
            .respond_err("aggr-list-info", 5, "aggregates down")
            .respond_err(INSTANCE_LIST_ITER_START, 6, "instances down")
            .respond_err(GET_INSTANCES_ITER_START, 7, "samples down")
            .respond_ok(GET_INSTANCES_ITER_START, Element::new("results").with_value("tag", "t"))
            .respond_err(GET_INSTANCES_ITER_NEXT, 8, "page down")
            .respond_ok(GET_INSTANCES_ITER_END, Element::new("results"));
        let session = session(&transport, &ArrayConfig::new("filer01", "root", "pw")).await;

        let failure = |e: Error| match e {
            Error::Protocol {
                operation,
                errno,
                reason,
            } => (operation, errno, reason),
            other => panic!("unexpected error {other}"),
        };
        let wanted = |operation: &str, errno: i64, reason: &str| {
            (operation.to_string(), errno, reason.to_string())
        };

        assert_eq!(
            failure(session.list_objects().await.unwrap_err()),
            wanted(PERF_OBJECT_LIST_INFO, 1, "objects down")
        );
        assert_eq!(
            failure(session.list_counters("volume").await.unwrap_err()),
            wanted(PERF_OBJECT_COUNTER_LIST_INFO, 2, "counters down")
        );
        assert_eq!(
            failure(session.list_luns(None).await.unwrap_err()),
            wanted("lun-list-info", 3, "luns down")
        );
        assert_eq!(
            failure(session.list_volumes(None).await.unwrap_err()),
            wanted("volume-list-info", 4, "volumes down")
        );
        assert_eq!(
            failure(session.list_aggregates(None).await.unwrap_err()),
            wanted("aggr-list-info", 5, "aggregates down")
        );
        assert_eq!(
            failure(session.enumerate_instances("volume", None).await.unwrap_err()),
            wanted(INSTANCE_LIST_ITER_START, 6, "instances down")
        );
        assert_eq!(
            failure(session.collect_counters("volume", &[], &[]).await.unwrap_err()),
            wanted(GET_INSTANCES_ITER_START, 7, "samples down")
        );
        assert_eq!(
            failure(session.collect_counters("volume", &[], &[]).await.unwrap_err()),
            wanted(GET_INSTANCES_ITER_NEXT, 8, "page down")
        );

        // a failed start leaves nothing to release; a failed page still releases
        assert_eq!(transport.count(GET_INSTANCES_ITER_END), 1);
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn test_refresh_switches_strategy() {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, single_node_version())
            .respond_ok(SYSTEM_GET_VERSION, clustered_version());
        let mut session = session(&transport, &ArrayConfig::new("filer01", "root", "pw")).await;
        assert_eq!(session.dialect(), Dialect::SingleNode);

        session.refresh_version().await.unwrap();
        assert_eq!(session.dialect(), Dialect::Clustered);
        assert_eq!(session.version().generation, "9");
    }

    #[tokio::test]
    async fn test_set_vserver_and_raw_invoke() {
        let transport = Arc::new(ScriptedTransport::new("cluster01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, clustered_version())
            .respond_err("system-node-get-iter", 13003, "denied");
        let mut session = session(&transport, &ArrayConfig::new("cluster01", "admin", "pw")).await;

        session.set_vserver(Some("svm2"));
        assert_eq!(transport.namespace().as_deref(), Some("svm2"));
        session.set_vserver(Some(""));
        assert_eq!(session.vserver(), None);

        let raw = session
            .invoke_raw(&Element::new("system-node-get-iter"))
            .await
            .unwrap();
        assert!(!raw.is_passed());
        assert_eq!(raw.results_reason(), "denied");
    }
}
