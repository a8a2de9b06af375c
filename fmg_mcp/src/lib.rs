//! FortiManager MCP server.
//!
//! Exposes the FortiManager JSON-RPC API as MCP tools over stdio. The
//! heavy lifting (client, error mapping, task poller) lives in `fmg_api`;
//! this crate carries the tool registry, the `rmcp` service, settings and
//! logging.

pub mod config;
pub mod logging;
pub mod service;
pub mod tools;

pub use config::Settings;
pub use service::FmgMcpService;
