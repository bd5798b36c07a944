//! Prometheus exporter for Minecraft servers.
//!
//! The exporter answers each Prometheus scrape by querying a running server
//! over RCON and republishing what it learns as labeled metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Minecraft server│<───>│   Collectors    │────>│   HTTP Server   │
//! │     (RCON)      │     │ (parse replies) │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Facts are pulled fresh on every scrape: one scrape opens one RCON
//! connection per command, so nothing is cached between scrapes and a
//! disconnected player simply stops appearing.
//!
//! # Usage
//!
//! ```bash
//! minecraft-exporter --config config.json5 --rcon-password hunter2
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod http;
pub mod parse;
pub mod rcon;
pub mod scrape;

pub use collector::CollectorRegistry;
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use rcon::{RawReply, RconClient, Transport};
