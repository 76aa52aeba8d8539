//! Discovery engine: probe candidates with bounded concurrency and
//! deduplicate confirmed nodes by identity.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use node_monitor_sdk::{
    Candidate, CandidateSource, MonitorError, Node, NodeId, NodeProber, RejectReason,
};

/// Result of one scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Confirmed nodes, unique by node id, in completion order.
    pub nodes: Vec<Node>,
    pub rejections: Vec<(Candidate, RejectReason)>,
}

impl ScanReport {
    #[must_use]
    pub fn unreachable(&self) -> usize {
        self.rejections
            .iter()
            .filter(|(_, reason)| reason.is_unreachable())
            .count()
    }
}

pub struct DiscoveryEngine {
    prober: Arc<dyn NodeProber>,
    timeout: Duration,
}

impl DiscoveryEngine {
    pub fn new(prober: Arc<dyn NodeProber>, timeout: Duration) -> Self {
        Self { prober, timeout }
    }

    /// Gather candidates from every source.
    ///
    /// A source that fails for environmental reasons (Docker not running)
    /// is logged and skipped.
    ///
    /// # Errors
    /// Propagates configuration errors from a source.
    pub async fn collect(
        &self,
        host: &str,
        sources: &[Arc<dyn CandidateSource>],
    ) -> Result<Vec<Candidate>, MonitorError> {
        let mut candidates = Vec::new();
        for source in sources {
            match source.candidates(host).await {
                Ok(found) => {
                    tracing::debug!(source = source.name(), count = found.len(), "candidates collected");
                    candidates.extend(found);
                }
                Err(e @ MonitorError::Configuration { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "candidate source unavailable");
                }
            }
        }
        Ok(candidates)
    }

    /// Collect from `sources`, then [`scan`](Self::scan).
    ///
    /// # Errors
    /// Same as [`collect`](Self::collect) and [`scan`](Self::scan).
    pub async fn discover(
        &self,
        host: &str,
        sources: &[Arc<dyn CandidateSource>],
        concurrency_limit: usize,
    ) -> Result<ScanReport, MonitorError> {
        let candidates = self.collect(host, sources).await?;
        self.scan(host, candidates, concurrency_limit).await
    }

    /// Probe every candidate, at most `concurrency_limit` at a time.
    ///
    /// The first confirmation of a node id wins; later ones are dropped.
    /// A limit of zero is treated as one.
    ///
    /// # Errors
    /// Returns [`MonitorError::Configuration`] for an empty candidate list or
    /// a host that is empty or cannot be resolved. Individual probe failures
    /// are reported in [`ScanReport::rejections`].
    pub async fn scan(
        &self,
        host: &str,
        candidates: Vec<Candidate>,
        concurrency_limit: usize,
    ) -> Result<ScanReport, MonitorError> {
        if candidates.is_empty() {
            return Err(MonitorError::configuration("no candidates to probe"));
        }
        resolve_host(host).await?;

        let total = candidates.len();
        tracing::info!(host, candidates = total, concurrency = concurrency_limit.max(1), "starting scan");

        let prober = &self.prober;
        let timeout = self.timeout;
        let mut results = futures::stream::iter(candidates)
            .map(|candidate| async move {
                let result = prober.probe(&candidate, timeout).await;
                (candidate, result)
            })
            .buffer_unordered(concurrency_limit.max(1));

        let mut report = ScanReport::default();
        let mut seen: HashSet<NodeId> = HashSet::new();
        while let Some((candidate, result)) = results.next().await {
            match result {
                Ok(node) => {
                    if seen.insert(node.node_id().clone()) {
                        report.nodes.push(node);
                    } else {
                        tracing::debug!(
                            node_id = %node.node_id(),
                            candidate = %candidate,
                            "duplicate node dropped"
                        );
                    }
                }
                Err(reason) => {
                    tracing::debug!(candidate = %candidate, reason = %reason, "candidate rejected");
                    report.rejections.push((candidate, reason));
                }
            }
        }

        tracing::info!(
            found = report.nodes.len(),
            rejected = report.rejections.len(),
            "scan finished"
        );
        Ok(report)
    }
}

async fn resolve_host(host: &str) -> Result<(), MonitorError> {
    if host.trim().is_empty() {
        return Err(MonitorError::configuration("host must not be empty"));
    }
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| MonitorError::configuration(format!("cannot resolve host '{host}': {e}")))?;
    if addrs.next().is_none() {
        return Err(MonitorError::configuration(format!(
            "host '{host}' resolved to no addresses"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use node_monitor_sdk::{
        Bandwidth, DiskSpace, NodeEndpoint, NodeStats, NodeStatus, SourceHint, StatusReport,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps ports to node ids; ports not listed are unreachable.
    struct FakeProber {
        nodes: Vec<(u16, &'static str)>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeProber {
        fn new(nodes: Vec<(u16, &'static str)>) -> Self {
            Self {
                nodes,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    fn node(id: &str, candidate: &Candidate) -> Node {
        let report = StatusReport {
            node_id: NodeId::parse(id).unwrap(),
            stats: NodeStats {
                version: "1.95.1".to_owned(),
                status: NodeStatus::Online,
                disk_space: DiskSpace::default(),
                bandwidth: Bandwidth::default(),
                earnings: None,
                audit_score: None,
                suspension_score: None,
                uptime: 0,
                last_contact: None,
                satellites: Vec::new(),
            },
        };
        let endpoint = NodeEndpoint {
            host: candidate.host.clone(),
            dashboard_port: candidate.port,
            storage_port: 28967,
        };
        Node::new(report, endpoint, candidate.hint.clone())
    }

    #[async_trait]
    impl NodeProber for FakeProber {
        async fn probe(&self, candidate: &Candidate, _timeout: Duration) -> Result<Node, RejectReason> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.nodes
                .iter()
                .find(|(port, _)| *port == candidate.port)
                .map(|(_, id)| node(id, candidate))
                .ok_or_else(|| RejectReason::Unreachable("connection refused".to_owned()))
        }
    }

    fn candidates(ports: &[u16]) -> Vec<Candidate> {
        ports
            .iter()
            .map(|&p| Candidate::new("127.0.0.1", p, SourceHint::ExplicitPort))
            .collect()
    }

    #[tokio::test]
    async fn duplicates_collapse_to_one_node() {
        let prober = Arc::new(FakeProber::new(vec![(14000, "A"), (14001, "A"), (14002, "B")]));
        let engine = DiscoveryEngine::new(prober, Duration::from_secs(1));
        let report = engine
            .scan("127.0.0.1", candidates(&[14000, 14001, 14002, 14000]), 4)
            .await
            .unwrap();

        let mut ids: Vec<_> = report.nodes.iter().map(|n| n.node_id().to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(report.rejections.is_empty());
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let ports: Vec<u16> = (14000..14032).collect();
        let prober = Arc::new(FakeProber::new(Vec::new()));
        let engine = DiscoveryEngine::new(prober.clone(), Duration::from_secs(1));
        let report = engine.scan("127.0.0.1", candidates(&ports), 3).await.unwrap();

        assert_eq!(report.unreachable(), 32);
        assert!(prober.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_limit_still_scans() {
        let prober = Arc::new(FakeProber::new(vec![(14000, "A")]));
        let engine = DiscoveryEngine::new(prober, Duration::from_secs(1));
        let report = engine.scan("127.0.0.1", candidates(&[14000]), 0).await.unwrap();
        assert_eq!(report.nodes.len(), 1);
    }

    #[tokio::test]
    async fn empty_candidates_or_host_is_configuration_error() {
        let engine = DiscoveryEngine::new(Arc::new(FakeProber::new(Vec::new())), Duration::from_secs(1));
        assert!(matches!(
            engine.scan("127.0.0.1", Vec::new(), 4).await,
            Err(MonitorError::Configuration { .. })
        ));
        assert!(matches!(
            engine.scan("", candidates(&[14000]), 4).await,
            Err(MonitorError::Configuration { .. })
        ));
    }

    struct BrokenSource;

    #[async_trait]
    impl CandidateSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn candidates(&self, _host: &str) -> Result<Vec<Candidate>, MonitorError> {
            Err(MonitorError::unreachable("docker", "socket missing"))
        }
    }

    #[tokio::test]
    async fn unavailable_source_is_skipped() {
        let engine = DiscoveryEngine::new(Arc::new(FakeProber::new(vec![(14000, "A")])), Duration::from_secs(1));
        let sources: Vec<Arc<dyn CandidateSource>> = vec![
            Arc::new(BrokenSource),
            Arc::new(crate::domain::candidates::ExplicitPorts::new(vec![14000])),
        ];
        let report = engine.discover("127.0.0.1", &sources, 2).await.unwrap();
        assert_eq!(report.nodes.len(), 1);
    }
}
