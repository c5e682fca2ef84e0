//! The alertctl command line tool.
//!
//! This builds on top of [`alertctl_client`] and runs a single delete-by-name workflow against a
//! management endpoint: log in, fetch a collection, look up one resource by its exact name, and
//! delete it if it exists. Settings come from defaults, an optional YAML file, and `ALERTCTL__`
//! environment variables. See [`config`] for the available options.
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod observability;
pub mod workflow;
