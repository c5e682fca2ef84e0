//! # alertctl Client
//!
//! The client talks to the REST management port of a Splunk-style server. It handles the login
//! handshake, addresses collections in their namespaces, and deletes single resources found by
//! name.
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use alertctl_client::{ConnectionConfig, Session};
//!
//! #[tokio::main]
//! # async fn main() -> alertctl_client::Result<()> {
//!     let config = ConnectionConfig {
//!         host: "splunk.example.com".into(),
//!         ..Default::default()
//!     };
//!
//!     let session = Session::builder(config)
//!         // The management port serves a self-signed certificate by default
//!         .accept_invalid_certs(true)
//!         .timeout(Duration::from_secs(10))
//!         .build()?
//!         .login()
//!         .await?;
//!
//!     let alerts = session.saved_searches().fetch().await?;
//!     if let Some(alert) = alerts.lookup("My Awesome Alert") {
//!         session.delete(alert).send().await?;
//!     }
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod client;
mod collection;
mod config;
mod delete;
mod error;
mod login;

pub use client::*;
pub use collection::*;
pub use config::*;
pub use delete::*;
pub use error::*;
