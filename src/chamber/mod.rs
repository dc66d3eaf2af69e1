//! The chamber as a typed device: one [`ChamberSession`] per connection
//! and the status words it decodes.

pub mod session;
pub mod status;

pub use session::{ChamberSession, Utility};
