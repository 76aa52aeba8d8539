pub mod candidates;
pub mod discovery;
pub mod error;
pub mod poller;
pub mod ports;
pub mod registrar;
pub mod sync;
pub mod validator;

pub use discovery::{DiscoveryEngine, ScanReport};
pub use poller::MetricsPoller;
pub use registrar::Registrar;
pub use sync::{SyncEngine, SyncState};
pub use validator::PortValidator;
