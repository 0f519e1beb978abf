//! Wire schema, structural codec, and entity model for the bot platform.
//!
//! This crate is runtime-agnostic: decoding, encoding, and the schema
//! tables carry no async or HTTP dependency. Transport and the update feed
//! live in `wiregram-client`.

pub mod attachment;
pub mod botapi;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod logging;
pub mod record;
pub mod schema;
pub mod update;
pub mod wire;

pub use errors::{Error, Result, SchemaError};
