//! Trait seams between Ferry crates.

pub mod connector;
