//! XML codec for metastore files.
//!
//! Every element lives in its own `<id>.xml` file and every element type
//! keeps its metadata in a `.type.xml` file. [`XmlCodec`] converts between
//! those files and the [`metastore_types`] model.
//!
//! Scalar values are written with an explicit type tag so a round trip
//! never coerces a value to another type. Missing nodes decode as absent
//! values rather than errors, which keeps older layouts readable.

pub mod codec;
pub mod error;
mod schema;

pub use codec::XmlCodec;
pub use error::{CodecError, CodecResult};
