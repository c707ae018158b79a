//! access-gate — library crate for the server, the polling client and
//! integration tests.
//!
//! A client polls `GET /check-access?email=...`; the first poll records the
//! email as pending, an operator approves or rejects it from `/admin`, and
//! once approved the gate releases the protected script.

pub mod api;
pub mod config;
pub mod errors;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod poller;
pub mod store;
