//! Server-side building blocks shared by the `quartet-server` binary and the
//! integration tests.
//!
//! ## Structure
//!
//! - [`arrival`] - stamps when each request entered the server stack.
//! - [`config`] - CLI and environment configuration.
//! - [`service`] - gRPC handlers for every service.
//! - [`telemetry`] - logging, optional OpenTelemetry export and metrics.

pub mod arrival;
pub mod config;
pub mod service;
pub mod telemetry;
