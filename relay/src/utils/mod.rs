//! Utility functions for the relay

pub mod file;
pub mod json;
