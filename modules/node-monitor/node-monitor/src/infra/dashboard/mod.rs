//! Monitoring dashboard REST API.

mod client;
pub mod dto;
mod mapper;

pub use client::DashboardClient;
