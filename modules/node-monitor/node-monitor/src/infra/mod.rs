pub mod dashboard;
pub mod docker;
pub mod status_api;
