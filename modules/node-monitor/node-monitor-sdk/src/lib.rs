//! Node monitor SDK
//!
//! Public contract of the node-monitor module: the models produced by
//! discovery and sync, the error kinds callers can observe, and the traits
//! that let other candidate sources and probers plug into the discovery
//! engine.
//!
//! Models carry no serde derives. Wire shapes live next to the HTTP clients
//! that speak them.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod errors;
pub mod models;

pub use api::{CandidateSource, NodeProber};

pub use errors::{MonitorError, PollError, RejectReason};

pub use models::{
    AuthIdentity, Bandwidth, Candidate, ContainerRef, DEFAULT_DASHBOARD_PORT, DEFAULT_STORAGE_PORT,
    DiskSpace, MetricsSnapshot, Node, NodeEndpoint, NodeId, NodeStats, NodeStatus,
    RegisteredNode, RegistrationResult, RegistrationSummary, SatelliteLink, SourceHint,
    StatusReport, SyncOutcome, TickSummary,
};
