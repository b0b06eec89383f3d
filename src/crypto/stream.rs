//! Streaming encryption of remote copies
//!
//! Encrypted layout: 16-byte salt, 16-byte initial counter, then the
//! artifact bytes XORed with the AES-256-CTR keystream. Nothing is
//! authenticated; a wrong passphrase decrypts to garbage rather than failing.

use std::io::{self, Cursor, Read};

use aes::Aes256;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use ctr::cipher::{KeyIvInit, StreamCipher};

use super::key_derivation::{derive_key, KeyDerivationParams};
use super::secure_memory::SecureString;
use crate::error::{VaultError, VaultResult};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 16;
/// Bytes prepended to every encrypted copy
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// Leading bytes of an unencrypted zip container
const CONTAINER_MAGIC: &[u8] = b"PK";

/// Size of the encrypted copy of a `plain_size` artifact
pub fn encrypted_size(plain_size: u64) -> u64 {
    plain_size + HEADER_LEN as u64
}

/// Passphrase-keyed stream cipher for remote copies
#[derive(Debug, Clone)]
pub struct ArchiveCipher {
    passphrase: SecureString,
    params: KeyDerivationParams,
}

impl ArchiveCipher {
    pub fn new(passphrase: SecureString) -> Self {
        Self::with_params(passphrase, KeyDerivationParams::default())
    }

    pub fn with_params(passphrase: SecureString, params: KeyDerivationParams) -> Self {
        Self { passphrase, params }
    }

    fn keystream(&self, salt: &[u8], nonce: &[u8]) -> VaultResult<Aes256Ctr> {
        let key = derive_key(&self.passphrase, salt, &self.params)?;
        Aes256Ctr::new_from_slices(key.as_bytes(), nonce)
            .map_err(|e| VaultError::Encryption(format!("Failed to create cipher: {}", e)))
    }

    /// Wrap `inner` so that reading yields header plus ciphertext
    pub fn encrypting_reader<'a>(
        &self,
        inner: Box<dyn Read + 'a>,
    ) -> VaultResult<Box<dyn Read + 'a>> {
        let mut header = [0u8; HEADER_LEN];
        OsRng.fill_bytes(&mut header);
        let (salt, nonce) = header.split_at(SALT_LEN);
        let cipher = self.keystream(salt, nonce)?;

        Ok(Box::new(
            Cursor::new(header).chain(KeystreamReader { inner, cipher }),
        ))
    }

    /// Wrap ciphertext that follows an already consumed `header`
    pub fn decrypting_reader<'a>(
        &self,
        header: &[u8; HEADER_LEN],
        inner: Box<dyn Read + 'a>,
    ) -> VaultResult<Box<dyn Read + 'a>> {
        let (salt, nonce) = header.split_at(SALT_LEN);
        let cipher = self.keystream(salt, nonce)?;
        Ok(Box::new(KeystreamReader { inner, cipher }))
    }
}

struct KeystreamReader<R> {
    inner: R,
    cipher: Aes256Ctr,
}

impl<R: Read> Read for KeystreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.apply_keystream(&mut buf[..n]);
        Ok(n)
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read
fn read_up_to(source: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Plaintext view of a downloaded copy
///
/// Decrypts only when a cipher is configured, a full header could be read
/// and the data does not already start like a plain container. Anything
/// else is passed through unchanged, so plain copies stay readable after
/// encryption is switched on.
pub fn open_download<'a>(
    cipher: Option<&ArchiveCipher>,
    mut source: Box<dyn Read + 'a>,
) -> VaultResult<Box<dyn Read + 'a>> {
    let Some(cipher) = cipher else {
        return Ok(source);
    };

    let mut header = [0u8; HEADER_LEN];
    let filled = read_up_to(&mut source, &mut header)
        .map_err(|e| VaultError::Remote(format!("Failed to read download: {}", e)))?;

    if filled == HEADER_LEN && !header.starts_with(CONTAINER_MAGIC) {
        return cipher.decrypting_reader(&header, source);
    }

    let head = header[..filled].to_vec();
    Ok(Box::new(Cursor::new(head).chain(source)))
}
