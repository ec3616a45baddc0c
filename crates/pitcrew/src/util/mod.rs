//! Shared CLI utilities

pub mod browser;
