//! Test utilities for alertctl and its client.
//!
//! This crate provides utilities to facilitate testing against a management API without a real
//! server. See the modules for all available utilities.

pub mod server;
pub mod tracing;
