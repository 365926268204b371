//! Shared code for the ferry upload service: wire-protocol types,
//! upload validation rules, and configuration parsing.

pub mod config;
pub mod protocol;
pub mod validate;
