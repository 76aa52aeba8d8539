//! Discovery extension traits.
//!
//! The discovery engine depends only on these two capabilities, so new
//! candidate sources or probe strategies plug in without touching it.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{MonitorError, RejectReason};
use crate::models::{Candidate, Node};

/// Produces the candidates to probe on a host.
///
/// Each call returns a fresh, finite sequence; calling twice against an
/// unchanged environment yields the same candidates.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Short name used in logs (`ports`, `range`, `docker`).
    fn name(&self) -> &'static str;

    /// Enumerate candidates for `host`.
    ///
    /// # Errors
    /// Returns [`MonitorError::Configuration`] when the source itself is
    /// misconfigured. Per-item problems (a container without a usable port)
    /// yield fewer candidates, not errors.
    async fn candidates(&self, host: &str) -> Result<Vec<Candidate>, MonitorError>;
}

/// Confirms whether a candidate is a storage node.
#[async_trait]
pub trait NodeProber: Send + Sync {
    /// Probe one candidate.
    ///
    /// # Errors
    /// Returns a [`RejectReason`] when the candidate is not a reachable,
    /// well-formed node. Rejections never abort a scan.
    async fn probe(&self, candidate: &Candidate, timeout: Duration) -> Result<Node, RejectReason>;
}
