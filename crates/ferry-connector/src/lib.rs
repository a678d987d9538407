//! # ferry-connector
//!
//! [`TransferConnector`](ferry_core::traits::connector::TransferConnector)
//! implementations. Ships the local-directory connector used for tests and
//! single-machine operation; network protocol connectors plug in behind the
//! same trait.

pub mod local;

pub use local::LocalDirConnector;
