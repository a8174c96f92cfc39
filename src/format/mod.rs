//! The KDBX container: header layout, byte stream, tamper checks,
//! compression, and the load/save pipelines tying them together.

pub mod checks;
pub mod gzip;
pub mod header;
pub mod kdbx;
pub mod stream;

pub use header::{Compression, KdbxHeader};
pub use kdbx::{KdbxFormat, DEFAULT_MAX_TRANSFORM_ROUNDS};
pub use stream::BinaryStream;
