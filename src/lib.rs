//! treesync — directory listing and live sync engine.
//!
//! Produces a filtered, annotated listing of the files under a root
//! directory (suitable for pasting into an LLM prompt) and keeps that
//! listing synchronized as the directory changes on disk.
//!
//! The public surface is [`sync::SyncCoordinator`]: open a root to scan it
//! and receive the initial listing, then consume the coordinator's event
//! stream for progress updates and incremental add/update/remove deltas.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
