//! Multi-Array Collector
//!
//! Runs one enumeration + collection plan against many arrays at once. Each
//! array gets its own task owning its session and cursors; nothing is shared
//! between tasks.

use crate::config::ArrayConfig;
use crate::domain::CounterSet;
use crate::error::{Error, Result};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

// =============================================================================
// Plan and Reports
// =============================================================================

/// What to collect from every array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPlan {
    /// Countable object kind (e.g. `volume`)
    pub object: String,
    /// Counters to fetch; empty fetches all
    #[serde(default)]
    pub counters: Vec<String>,
    /// Instance filter passed to clustered arrays
    #[serde(default)]
    pub instance_filter: Option<String>,
}

/// Counters gathered from one array
#[derive(Debug, Clone, Serialize)]
pub struct ArrayCollection {
    pub instances: usize,
    pub samples: CounterSet,
    /// Cursor releases that failed after the data was gathered
    pub release_errors: Vec<String>,
}

/// Outcome for one array
#[derive(Debug)]
pub struct ArrayReport {
    pub device: String,
    pub outcome: Result<ArrayCollection>,
}

// =============================================================================
// Collector
// =============================================================================

/// Fans a collection plan out over independent sessions
pub struct MultiArrayCollector {
    plan: Arc<CollectionPlan>,
}

impl MultiArrayCollector {
    pub fn new(plan: CollectionPlan) -> Self {
        Self {
            plan: Arc::new(plan),
        }
    }

    pub fn plan(&self) -> &CollectionPlan {
        &self.plan
    }

    /// Connect to every configured array over HTTP and collect concurrently
    pub async fn collect_from_configs(&self, configs: Vec<ArrayConfig>) -> Vec<ArrayReport> {
        let mut tasks = JoinSet::new();
        for config in configs {
            let plan = self.plan.clone();
            tasks.spawn(async move {
                let outcome = match Session::connect(&config).await {
                    Ok(session) => run_plan(&session, &plan).await,
                    Err(e) => Err(e),
                };
                ArrayReport {
                    device: config.address,
                    outcome,
                }
            });
        }
        join_reports(tasks).await
    }

    /// Collect concurrently from already established sessions
    pub async fn collect_from_sessions(&self, sessions: Vec<Session>) -> Vec<ArrayReport> {
        let mut tasks = JoinSet::new();
        for session in sessions {
            let plan = self.plan.clone();
            tasks.spawn(async move {
                let outcome = run_plan(&session, &plan).await;
                ArrayReport {
                    device: session.device().to_string(),
                    outcome,
                }
            });
        }
        join_reports(tasks).await
    }
}

async fn join_reports(mut tasks: JoinSet<ArrayReport>) -> Vec<ArrayReport> {
    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Collection task failed: {}", e);
                reports.push(ArrayReport {
                    device: String::from("<unknown>"),
                    outcome: Err(Error::Internal(format!("collection task failed: {}", e))),
                });
            }
        }
    }
    reports.sort_by(|a, b| a.device.cmp(&b.device));
    reports
}

/// Enumerate the plan's object on one array, then collect its counters
pub async fn run_plan(session: &Session, plan: &CollectionPlan) -> Result<ArrayCollection> {
    let mut release_errors = Vec::new();

    let enumerated = session
        .enumerate_instances(&plan.object, plan.instance_filter.as_deref())
        .await?;
    if let Some(e) = enumerated.release_error {
        release_errors.push(e.to_string());
    }
    let instances = enumerated.value;
    debug!("{}: {} {} instances", session.device(), instances.len(), plan.object);

    let collected = session
        .collect_counters(&plan.object, &instances, &plan.counters)
        .await?;
    if let Some(e) = collected.release_error {
        release_errors.push(e.to_string());
    }

    info!(
        "{}: collected {} samples of {}",
        session.device(),
        collected.value.len(),
        plan.object
    );

    Ok(ArrayCollection {
        instances: instances.len(),
        samples: collected.value,
        release_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Element;
    use crate::protocol::{
        GET_INSTANCES, GET_INSTANCES_ITER_END, GET_INSTANCES_ITER_NEXT, GET_INSTANCES_ITER_START,
        INSTANCE_LIST_ITER, INSTANCE_LIST_ITER_END, INSTANCE_LIST_ITER_NEXT,
        INSTANCE_LIST_ITER_START, SYSTEM_GET_VERSION,
    };
    use crate::transport::ScriptedTransport;

    fn sample_results(key_field: &str, key: &str, value: &str) -> Element {
        Element::new("results")
            .with_value("records", 1)
            .with_child(
                Element::new("instances").with_child(
                    Element::new("instance-data")
                        .with_value(key_field, key)
                        .with_child(
                            Element::new("counters").with_child(
                                Element::new("counter-data")
                                    .with_value("name", "total_ops")
                                    .with_value("value", value),
                            ),
                        ),
                ),
            )
    }

    async fn clustered_session() -> Session {
        let transport = Arc::new(ScriptedTransport::new("cluster01"));
        transport
            .respond_ok(
                SYSTEM_GET_VERSION,
                Element::new("results")
                    .with_value("is-clustered", "true")
                    .with_value("version", "NetApp Release 9.8.1"),
            )
            .respond_ok(
                INSTANCE_LIST_ITER,
                Element::new("results").with_value("num-records", 1).with_child(
                    Element::new("attributes-list")
                        .with_child(Element::new("instance-info").with_value("uuid", "u-1")),
                ),
            )
            .respond_ok(GET_INSTANCES, sample_results("uuid", "u-1", "10"));
        Session::with_transport(transport, &ArrayConfig::new("cluster01", "admin", "pw"))
            .await
            .unwrap()
    }

    async fn single_node_session(release_ok: bool) -> Session {
        let transport = Arc::new(ScriptedTransport::new("filer01"));
        transport
            .respond_ok(SYSTEM_GET_VERSION, Element::new("results").with_value("version", "7.3.2"))
            .respond_ok(INSTANCE_LIST_ITER_START, Element::new("results").with_value("tag", "i"))
            .respond_ok(
                INSTANCE_LIST_ITER_NEXT,
                Element::new("results").with_value("records", 1).with_child(
                    Element::new("instances")
                        .with_child(Element::new("instance-info").with_value("name", "vol0")),
                ),
            )
            .respond_ok(INSTANCE_LIST_ITER_END, Element::new("results"))
            .respond_ok(GET_INSTANCES_ITER_START, Element::new("results").with_value("tag", "c"))
            .respond_ok(GET_INSTANCES_ITER_NEXT, sample_results("name", "vol0", "20"));
        if release_ok {
            transport.respond_ok(GET_INSTANCES_ITER_END, Element::new("results"));
        } else {
            transport.respond_err(GET_INSTANCES_ITER_END, 13001, "invalid tag");
        }
        Session::with_transport(transport, &ArrayConfig::new("filer01", "root", "pw"))
            .await
            .unwrap()
    }

    fn plan() -> CollectionPlan {
        CollectionPlan {
            object: "volume".into(),
            counters: vec!["total_ops".into()],
            instance_filter: None,
        }
    }

    #[tokio::test]
    async fn test_collects_from_both_dialects() {
        let sessions = vec![single_node_session(true).await, clustered_session().await];
        let reports = MultiArrayCollector::new(plan())
            .collect_from_sessions(sessions)
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].device, "cluster01");
        assert_eq!(reports[1].device, "filer01");

        let cluster = reports[0].outcome.as_ref().unwrap();
        assert_eq!(cluster.instances, 1);
        assert_eq!(
            cluster.samples.get("u_1").unwrap().counters.get("total_ops").map(String::as_str),
            Some("10")
        );

        let filer = reports[1].outcome.as_ref().unwrap();
        assert!(filer.release_errors.is_empty());
        assert!(filer.samples.get("vol0").is_some());
    }

    #[tokio::test]
    async fn test_release_errors_are_reported_not_fatal() {
        let session = single_node_session(false).await;
        let collection = run_plan(&session, &plan()).await.unwrap();
        assert_eq!(collection.samples.len(), 1);
        assert_eq!(collection.release_errors.len(), 1);
        assert!(collection.release_errors[0].contains("invalid tag"));
    }
}
