//! Shared typed values used across Ferry crates.

pub mod id;
