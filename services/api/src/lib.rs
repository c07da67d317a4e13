//! services/api/src/lib.rs
//!
//! The HTTP service around `notebase_core`: storage and delivery adapters,
//! configuration, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
