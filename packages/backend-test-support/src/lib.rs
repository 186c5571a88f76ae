//! Backend test support utilities
//!
//! Shared helpers for the backend integration test binaries.

pub mod logging;
