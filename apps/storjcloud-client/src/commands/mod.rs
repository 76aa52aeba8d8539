pub mod auth;
pub mod config;
pub mod discover;
pub mod sync;

pub use auth::AuthArgs;
pub use config::ConfigArgs;
pub use discover::DiscoverArgs;
pub use sync::SyncArgs;
