//! Application core: the polling loop and its ports.
//!
//! The [`monitor`] drives the chamber session, the auxiliary sensors and
//! the condensation interlock. Everything outside (how sessions are
//! opened, where events go) is reached through the traits in [`ports`],
//! so the loop runs unchanged against in-memory fakes.

pub mod events;
pub mod monitor;
pub mod ports;
