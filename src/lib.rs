pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod format;
pub mod logging;
pub mod model;
pub mod xml;

pub use crypto::{CompositeKey, Credentials};
pub use errors::{KdbxError, Result};
pub use format::{KdbxFormat, KdbxHeader};
pub use model::Database;
