//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host with no real GPIO
//! required.

mod mock_hw;
mod monitor_tests;
mod refill_tests;
mod teardown_tests;
