//! Storage node status API (`GET /api/sno`).

mod client;
pub mod dto;
mod mapper;

pub use client::StatusApiClient;
