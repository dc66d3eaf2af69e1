//! Chamber wire protocol.
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌─────────────┐
//! │ registry     │──▶│  codec   │──▶│  transport  │
//! │ path → id    │   │ framing  │   │ byte stream │
//! └──────────────┘   └──────────┘   └─────────────┘
//! ```

pub mod codec;
pub mod registry;
pub mod transport;
