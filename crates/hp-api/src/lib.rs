//! HTTP API layer: the transport surface external callers and agents use
//! to drive the daemon's domain services.
//!
//! Key modules:
//! - [`routes`] — every authenticated REST endpoint
//! - [`sse`] / [`ws`] — no-auth broadcast-event streams
//! - [`auth`] — API key authentication middleware
//! - [`rate_limit_middleware`] — three-tier rate limiting
//! - [`agent_id`] — `X-Agent-ID` header extraction
//! - [`event_bus`] — pub/sub fanout of [`protocol::BroadcastEvent`]

pub mod agent_id;
pub mod api_error;
pub mod auth;
pub mod event_bus;
pub mod protocol;
pub mod rate_limit_middleware;
pub mod routes;
pub mod sse;
pub mod state;
pub mod ws;
