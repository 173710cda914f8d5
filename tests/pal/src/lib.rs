// Licensed under the Apache-2.0 license

//! Integration tests for pal-os
//!
//! This module organizes all integration tests in a single library
//! to avoid the need to list each test file in Cargo.toml


// Test modules - each contains its own #[test] functions
#[cfg(test)]
pub mod test_timer_firing;


#[cfg(test)]
pub mod test_timer_lifecycle;
