//! ClimateBox climate chamber client library.
//!
//! Exposes the protocol, session, interlock and monitor layers for the
//! binary and for integration testing.
//!
//! ```text
//!   protocol (registry · codec · transport)
//!        │
//!   chamber (session · status)      sensors (ambient · dewpoint)
//!        │                               │
//!        └──────────▶ safety ◀───────────┘
//!                        │
//!                   app::monitor ──▶ adapters
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod chamber;
pub mod config;
pub mod error;
pub mod protocol;
pub mod safety;
pub mod sensors;

pub use error::{Error, Result};
