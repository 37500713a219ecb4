//! HTTP client for the presentation generation service.
//!
//! Opens the long-lived generation stream and exposes the by-id lookup,
//! listing and binary deck export endpoints.

pub mod client;
pub mod config;

pub use client::{ChunkStream, PresentationClient};
pub use config::ClientConfig;
