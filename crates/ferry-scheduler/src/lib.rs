//! # ferry-scheduler
//!
//! The scheduling engine: durable task store, caller-facing control surface,
//! and the background execution loop that dispatches due tasks to a
//! [`TransferConnector`](ferry_core::traits::connector::TransferConnector).

pub mod scheduler;
pub mod store;

mod runner;

pub use scheduler::{TaskCreateParams, TaskScheduler};
pub use store::TaskStore;
