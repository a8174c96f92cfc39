//! Cryptographic building blocks for the KDBX pipeline.
//!
//! This module provides:
//! - AES-256-CBC body encryption (`cipher`)
//! - AES-KDF key stretching (`kdf`)
//! - Master key derivation with scoped wiping of intermediates (`keys`)
//! - Password/keyfile credentials (`credentials`)
//! - Hashed-block integrity framing (`hashed_block`)
//! - The inner keystream for protected values (`protect`)

pub mod cipher;
pub mod credentials;
pub mod hash;
pub mod hashed_block;
pub mod kdf;
pub mod keys;
pub mod protect;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{Credentials, derive_master_key, ...};
pub use cipher::{AesCbc, BodyCipher};
pub use credentials::{generate_keyfile, load_keyfile, CompositeKey, Credentials};
pub use kdf::{AesKdf, KeyStretcher, DEFAULT_TRANSFORM_ROUNDS};
pub use keys::{derive_master_key, MasterKey};
pub use protect::ProtectSaltGenerator;
