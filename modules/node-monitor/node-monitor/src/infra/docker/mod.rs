//! Docker Engine API, used to find storage node containers.

mod client;
pub mod dto;

pub use client::{DockerClient, DockerError};
