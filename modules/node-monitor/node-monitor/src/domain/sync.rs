//! Sync engine.
//!
//! Every tick fetches the registered-node list from the dashboard, splits it
//! into fixed-size batches, polls each node and pushes its metrics back.
//! Batches run with bounded parallelism; nodes inside a batch run together.
//! The node list is re-read every tick, so a node that failed stays in the
//! working set until it is deregistered on the dashboard.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::ops::Range;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use node_monitor_sdk::{MonitorError, PollError, RegisteredNode, SyncOutcome, TickSummary};
use sc_http::Backoff;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::DashboardError;
use super::poller::MetricsPoller;
use super::ports::{DashboardApi, NodeStatusApi};
use crate::config::{FatalPolicy, SyncConfig};

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for the next tick.
    Idle,
    /// Fetching and partitioning the node list.
    Ticking,
    /// Batches in flight.
    AwaitingBatches,
    /// Terminal.
    Cancelled,
}

/// Contiguous slice of one tick's node snapshot.
#[derive(Debug, Clone)]
pub struct SyncBatch {
    pub index: usize,
    snapshot: Arc<[RegisteredNode]>,
    range: Range<usize>,
}

impl SyncBatch {
    #[must_use]
    pub fn nodes(&self) -> &[RegisteredNode] {
        &self.snapshot[self.range.clone()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split a snapshot into batches of at most `batch_size`, keeping input order.
#[must_use]
pub fn partition(snapshot: &Arc<[RegisteredNode]>, batch_size: usize) -> Vec<SyncBatch> {
    let mut start = 0;
    snapshot
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| {
            let range = start..start + chunk.len();
            start = range.end;
            SyncBatch {
                index,
                snapshot: Arc::clone(snapshot),
                range,
            }
        })
        .collect()
}

enum Failure {
    Poll(PollError),
    Push(DashboardError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll(e) => write!(f, "poll failed: {e}"),
            Self::Push(e) => write!(f, "push failed: {e}"),
        }
    }
}

/// One node's outcome plus what the dashboard said, if it was reached.
struct NodeRun {
    outcome: SyncOutcome,
    push_error: Option<DashboardError>,
}

impl NodeRun {
    fn reached_dashboard(&self) -> bool {
        self.outcome.success || self.push_error.is_some()
    }
}

pub struct SyncEngine {
    dashboard: Arc<dyn DashboardApi>,
    poller: MetricsPoller,
    backoff: Backoff,
    config: SyncConfig,
    state: watch::Sender<SyncState>,
}

impl SyncEngine {
    pub fn new(
        dashboard: Arc<dyn DashboardApi>,
        status: Arc<dyn NodeStatusApi>,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            dashboard,
            poller: MetricsPoller::new(status, config.poll_timeout),
            backoff: config.backoff.to_backoff(),
            config,
            state,
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
    }

    /// Tick until `cancel` fires. The first tick starts immediately.
    ///
    /// # Errors
    /// Returns the tick error when its [`FatalPolicy`] is `Terminate`:
    /// [`MonitorError::Authentication`] (`on_auth_failure`) or
    /// [`MonitorError::SystemicFailure`] (`on_dashboard_unreachable`).
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MonitorError> {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "sync engine started"
        );

        let mut tick: u64 = 0;
        loop {
            self.set_state(SyncState::Idle);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            tick += 1;
            match self.tick(tick, &cancel).await {
                Ok(summary) if summary.cancelled => break,
                Ok(_) => {}
                Err(err) if self.policy_for(&err) == FatalPolicy::Terminate => {
                    tracing::error!(tick, error = %err, "sync stopped by fatal error");
                    self.set_state(SyncState::Cancelled);
                    return Err(err);
                }
                Err(err) => tracing::error!(tick, error = %err, "sync tick failed, continuing"),
            }
        }

        self.set_state(SyncState::Cancelled);
        tracing::info!(ticks = tick, "sync engine stopped");
        Ok(())
    }

    fn policy_for(&self, err: &MonitorError) -> FatalPolicy {
        match err {
            MonitorError::Authentication { .. } => self.config.on_auth_failure,
            _ => self.config.on_dashboard_unreachable,
        }
    }

    /// Run one tick.
    ///
    /// Cancellation stops new batches; in-flight nodes get the grace period
    /// and are then dropped. Outcomes that completed are always kept.
    ///
    /// # Errors
    /// - [`MonitorError::Authentication`] when the dashboard rejects the token
    /// - [`MonitorError::SystemicFailure`] when the node list cannot be fetched
    ///   or every push failed to reach the dashboard
    pub async fn tick(
        &self,
        tick: u64,
        cancel: &CancellationToken,
    ) -> Result<TickSummary, MonitorError> {
        self.set_state(SyncState::Ticking);
        let mut summary = TickSummary::new(tick);

        let listed = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                summary.cancelled = true;
                return Ok(summary);
            }
            listed = self.dashboard.list_nodes() => listed,
        };
        let nodes = match listed {
            Ok(nodes) => nodes,
            Err(e) if e.is_auth() => return Err(MonitorError::authentication(e.to_string())),
            Err(e) => {
                return Err(MonitorError::systemic(format!(
                    "cannot fetch registered nodes: {e}"
                )));
            }
        };
        if nodes.is_empty() {
            tracing::debug!(tick, "no registered nodes");
            return Ok(summary);
        }

        let snapshot: Arc<[RegisteredNode]> = nodes.into();
        let batches = partition(&snapshot, self.config.batch_size);
        summary.batches = batches.len();
        tracing::info!(tick, nodes = snapshot.len(), batches = batches.len(), "syncing nodes");
        self.set_state(SyncState::AwaitingBatches);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let work = futures::stream::iter(batches)
            .take_until(cancel.cancelled())
            .map(|batch| {
                let tx = tx.clone();
                async move { self.run_batch(&batch, &tx).await }
            })
            .buffer_unordered(self.config.max_parallel_batches.max(1))
            .for_each(|()| async {});
        let (deadline_exceeded, cancelled) = self.drive(work, cancel).await;
        drop(tx);

        let mut runs = Vec::with_capacity(snapshot.len());
        while let Ok(run) = rx.try_recv() {
            runs.push(run);
        }
        self.finish(summary, &snapshot, runs, deadline_exceeded, cancelled)
    }

    /// Await `work` against cancellation and the tick deadline.
    /// Returns `(deadline_exceeded, cancelled)`.
    async fn drive(&self, work: impl Future<Output = ()>, cancel: &CancellationToken) -> (bool, bool) {
        tokio::pin!(work);
        let deadline = tokio::time::sleep(self.config.effective_tick_deadline());

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if tokio::time::timeout(self.config.grace_period, &mut work).await.is_err() {
                    tracing::warn!(
                        grace_ms = u64::try_from(self.config.grace_period.as_millis()).unwrap_or(u64::MAX),
                        "grace period elapsed, abandoning in-flight nodes"
                    );
                }
                (false, true)
            }
            () = &mut work => (false, false),
            () = deadline => {
                tracing::warn!("tick deadline exceeded, abandoning outstanding nodes");
                (true, false)
            }
        }
    }

    fn finish(
        &self,
        mut summary: TickSummary,
        snapshot: &[RegisteredNode],
        runs: Vec<NodeRun>,
        deadline_exceeded: bool,
        cancelled: bool,
    ) -> Result<TickSummary, MonitorError> {
        summary.deadline_exceeded = deadline_exceeded;
        summary.cancelled = cancelled;

        let auth_rejected = runs
            .iter()
            .any(|r| r.push_error.as_ref().is_some_and(DashboardError::is_auth));
        let reached: Vec<&NodeRun> = runs.iter().filter(|r| r.reached_dashboard()).collect();
        let dashboard_down = !reached.is_empty()
            && reached
                .iter()
                .all(|r| r.push_error.as_ref().is_some_and(DashboardError::is_unreachable));

        let finished: HashSet<String> = runs.iter().map(|r| r.outcome.node.id.clone()).collect();
        summary.outcomes = runs.into_iter().map(|r| r.outcome).collect();
        if deadline_exceeded {
            summary.outcomes.extend(
                snapshot
                    .iter()
                    .filter(|n| !finished.contains(&n.id))
                    .map(|n| SyncOutcome::failed(n.clone(), "deadline exceeded", 0)),
            );
        }

        for outcome in summary.outcomes.iter().filter(|o| !o.success) {
            tracing::warn!(
                node_id = %outcome.node.node_id,
                retries = outcome.retries_used,
                error = outcome.error.as_deref().unwrap_or_default(),
                "node sync failed"
            );
        }
        tracing::info!(
            tick = summary.tick,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            cancelled,
            deadline_exceeded,
            "sync tick completed"
        );

        if auth_rejected {
            return Err(MonitorError::authentication(
                "dashboard rejected the API token while pushing metrics",
            ));
        }
        if dashboard_down {
            return Err(MonitorError::systemic(
                "dashboard ingest endpoint unreachable for the whole tick",
            ));
        }
        Ok(summary)
    }

    async fn run_batch(&self, batch: &SyncBatch, tx: &mpsc::UnboundedSender<NodeRun>) {
        tracing::debug!(batch = batch.index, size = batch.len(), "batch started");
        join_all(batch.nodes().iter().map(|node| async move {
            let run = self.sync_node(node).await;
            // The receiver outlives every batch
            let _ = tx.send(run);
        }))
        .await;
    }

    /// Poll and push one node, retrying per policy. Token rejections are
    /// never retried.
    async fn sync_node(&self, node: &RegisteredNode) -> NodeRun {
        let budget = self.config.retry_budget();
        let mut retries: u32 = 0;

        loop {
            let failure = match self.poller.poll(node).await {
                Ok(snapshot) => match self.dashboard.push_metrics(&snapshot).await {
                    Ok(()) => {
                        tracing::debug!(node_id = %node.node_id, retries, "node synced");
                        return NodeRun {
                            outcome: SyncOutcome::succeeded(node.clone(), retries),
                            push_error: None,
                        };
                    }
                    Err(e) => Failure::Push(e),
                },
                Err(e) => Failure::Poll(e),
            };

            let auth = matches!(&failure, Failure::Push(e) if e.is_auth());
            if auth || retries >= budget {
                let message = failure.to_string();
                return NodeRun {
                    outcome: SyncOutcome::failed(node.clone(), message, retries),
                    push_error: match failure {
                        Failure::Push(e) => Some(e),
                        Failure::Poll(_) => None,
                    },
                };
            }

            let delay = self
                .backoff
                .delay(usize::try_from(retries).unwrap_or(usize::MAX));
            tracing::debug!(
                node_id = %node.node_id,
                retry = retries + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "retrying node"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(count: usize) -> Arc<[RegisteredNode]> {
        (0..count)
            .map(|i| RegisteredNode {
                id: format!("id-{i}"),
                node_id: format!("node-{i}"),
                address: "127.0.0.1".to_owned(),
                dashboard_port: 14002,
            })
            .collect()
    }

    #[test]
    fn twenty_five_nodes_in_batches_of_ten() {
        let snapshot = nodes(25);
        let batches = partition(&snapshot, 10);
        let sizes: Vec<_> = batches.iter().map(SyncBatch::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        let order: Vec<_> = batches
            .iter()
            .flat_map(|b| b.nodes().iter().map(|n| n.id.clone()))
            .collect();
        let expected: Vec<_> = snapshot.iter().map(|n| n.id.clone()).collect();
        assert_eq!(order, expected);
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn zero_batch_size_treated_as_one() {
        let batches = partition(&nodes(3), 0);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn empty_snapshot_has_no_batches() {
        assert!(partition(&nodes(0), 10).is_empty());
    }
}
