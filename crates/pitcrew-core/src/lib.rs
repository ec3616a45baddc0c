//! Core plumbing for pitcrew: CI/CD operations automation.
//!
//! This crate provides the pieces every pitcrew command is built from:
//! a thin blocking REST client, a sleep-and-poll helper for waiting on
//! external systems, environment variable resolution, and logging setup.
//! Commands themselves live in the `pitcrew` binary crate.

pub mod http;
pub mod logging;
pub mod poll;
pub mod settings;

pub use http::{ApiClient, Auth, HttpError};
pub use poll::{PollOutcome, poll_until};
