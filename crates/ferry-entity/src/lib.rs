//! # ferry-entity
//!
//! Domain entity models for Ferry. Every struct in this crate represents a
//! record in the durable task file or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, and `Deserialize`.

pub mod task;
