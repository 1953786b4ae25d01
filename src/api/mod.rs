//! API Module
//!
//! HTTP handlers and routing for the key-value REST API.
//!
//! # Endpoints
//! - `GET /api/keys[/:id]?filter=<regex>` - Read keys
//! - `PUT /api/keys[/:id]?expiry=<seconds>` - Write a JSON object of pairs
//! - `DELETE /api/keys[/:id]` - Delete one key or all keys
//! - `HEAD /api/keys[/:id]` - Presence check
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
