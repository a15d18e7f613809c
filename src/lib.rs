//! Loadgauge - synthetic HTTP load emitter
//!
//! Serves a fixed set of weighted endpoints. Every hit counts the request and
//! moves a shared load gauge by the endpoint's weight, producing controllable,
//! labeled Prometheus signal for exercising metrics and alerting pipelines.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod respond;
pub mod server;
pub mod telemetry;
pub mod weights;
