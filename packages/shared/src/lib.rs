//! Shared utilities for the vgtalk client and mock server.

pub mod logger;
pub mod time;
