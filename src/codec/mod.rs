//! Codec module - conversion between typed payloads and wire values.
//!
//! - [`JsonCodec`] - `serde_json` based, used for every envelope payload
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so call sites stay monomorphic and the wire value type stays visible.

mod json;

pub use json::JsonCodec;
