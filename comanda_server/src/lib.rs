//! # Comanda server
//! The HTTP front end of the comanda order backend. It is responsible for:
//! * Working out which tenant each request acts for, from the credentials it carries.
//! * Driving orders through their lifecycle on behalf of stores and their integrations.
//! * Notifying customers on WhatsApp when their order leaves for delivery, within the tenant's message quota.
//! * Streaming a live feed of a store's current orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth/login`, `/auth/logout`: Operator sessions.
//! * `/api/orders/...`: Order intake and status changes. See [routes](routes/index.html).
//! * `/api/orders/stream`: The live order feed, as server-sent events.
//! * `/api/message-usage`: The message quota snapshot.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
