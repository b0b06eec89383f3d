//! Cryptographic functions for dumpvault
//!
//! Provides streaming AES-256-CTR encryption of remote copies, keyed per
//! artifact with Argon2id from the configured passphrase.

pub mod key_derivation;
pub mod secure_memory;
pub mod stream;

pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
pub use stream::{encrypted_size, open_download, ArchiveCipher, HEADER_LEN};
