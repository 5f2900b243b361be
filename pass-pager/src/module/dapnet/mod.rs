//! DAPNET paging gateway
//!
//! Calls are posted as JSON with HTTP basic authentication. One attempt
//! per message; a failed call is reported to the caller and never retried
//! here.

pub mod types;
pub mod client;

pub use types::DapnetCall;
pub use client::{DapnetClient, Notifier};
