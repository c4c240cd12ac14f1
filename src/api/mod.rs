//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value with optional TTL, tags and provider
//! - `GET /get/:key` - Retrieve a value with its metadata
//! - `DELETE /del/:key` - Delete a key
//! - `POST /invalidate/tags` - Remove entries carrying any of the given tags
//! - `POST /invalidate/pattern` - Remove entries whose key matches a pattern
//! - `GET /stats` - Get cache statistics
//! - `POST /stats/reset` - Zero the statistics counters
//! - `GET /providers` - List registered providers
//! - `GET /health` - Health check endpoint
//!
//! Every endpoint that touches entries accepts an optional provider name and
//! answers 404 when it is unknown.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
