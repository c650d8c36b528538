//! Axum web layer for the voice lecture backend.
//!
//! The interesting work lives in `script_core` (text pipeline) and
//! `lightning_core` (upstream streaming client); this crate wires them
//! into HTTP routes and carries the process configuration.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod validation;
