//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one layer against the
//! in-memory chamber fakes in `mock_chamber`. No network access needed.

mod mock_chamber;
mod monitor_tests;
