//! # blockinho
//!
//! A small control panel for a DNS blocking service (Blocky-compatible API).
//!
//! The panel keeps two pattern lists, `allow` and `deny`, as newline-delimited
//! files the blocking service is configured to read, and proxies the service's
//! pause/resume/refresh endpoints. A [`Reconciler`] mirrors the upstream
//! blocking state locally, including a countdown for timed pauses.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use blockinho::{ListKind, PanelClient, PanelConfig, Reconciler};
//!
//! // Server side.
//! let config = PanelConfig::new("/etc/blocky/lists", "http://localhost:4000");
//! blockinho::server::serve(&config).await?;
//!
//! // Presentation side.
//! let client = PanelClient::new("http://localhost:3000")?;
//! client.add_pattern(ListKind::Deny, "*.ads.example.com").await?;
//!
//! let mut reconciler = Reconciler::new(client);
//! reconciler.refresh().await?;
//! reconciler.pause("300s").await?;
//! println!("{}", reconciler.label()); // "5m 0s"
//! ```
//!
//! ## Files
//!
//! Lists are stored as `<config_dir>/<prefix>-allow.txt` and
//! `<config_dir>/<prefix>-deny.txt`, one pattern per line. Every change
//! rewrites both files. Nothing is locked: this is a single-user tool.
//!
//! ## Consistency
//!
//! The upstream is the authority on blocking state. Every mutating action is
//! followed by a status fetch that overwrites the local mirror, so local
//! countdown drift is bounded by the time between fetches.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod list_store;
pub mod pattern;
pub mod reconciler;
pub mod server;
pub mod upstream;

pub use client::PanelClient;
pub use config::PanelConfig;
pub use error::{PanelError, Result};
pub use list_store::{ListKind, ListStore, Lists};
pub use reconciler::{BlockingState, Countdown, Reconciler, format_remaining};
pub use upstream::{BlockingControl, BlockingStatus, BlockyClient, Forwarded};
