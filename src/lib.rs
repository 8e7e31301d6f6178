#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod channel;
pub mod consumer;
pub mod data_consumer;
pub mod data_producer;
pub mod entity_state;
pub mod error;
pub mod event;
pub mod ortc;
pub mod producer;
pub mod router;
pub mod rtp_parameters;
pub mod stats;
pub mod transport;
pub mod worker;

pub use error::{Error, Result};

#[macro_use]
extern crate lazy_static;

/// AppData is opaque user data attached to an entity. It is never sent to
/// the worker.
pub type AppData = serde_json::Value;
