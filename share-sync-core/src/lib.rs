#![doc = "share-sync-core: core logic library for share-sync."]

//! This crate holds the domain types, the client and recorder contracts, the
//! OCS share response decoder and the sync driver. Transport, configuration
//! files and persistence backends live in the `share-sync` crate.
//!
//! # Usage
//! Build a [`config::Configuration`], hand an implementation of
//! [`contract::ShareClient`] and [`contract::LinkRecorder`] to
//! [`synchronise::synchronise`], and inspect the returned report.

pub mod config;
pub mod contract;
pub mod error;
pub mod share;
pub mod synchronise;

pub use error::{SyncError, SyncResult};
