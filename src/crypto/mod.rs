//! Password-based key derivation and per-chunk authenticated encryption.
//!
//! One key per file, derived with Argon2id from the password salted by the
//! file id. One AEAD invocation per chunk with a nonce deterministic in
//! `(file_id, chunk_index)`, so encode stays reproducible and parallel.

use crate::common::FileId;
use crate::tools::error::{Error, Result};
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use zeroize::Zeroizing;

/// AEAD nonce width in bytes.
pub const NONCE_BYTES: usize = 12;

/// AEAD authentication-tag width in bytes.
pub const TAG_BYTES: usize = 16;

/// Derived-key width in bytes.
pub const KEY_BYTES: usize = 32;

// Argon2id cost parameters, identical on encode and decode.
const ARGON2_MEM_KIB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_LANES: u32 = 4;

/// A derived AEAD key. Zeroed from memory on drop.
pub struct EncryptionKey(Zeroizing<[u8; KEY_BYTES]>);

impl EncryptionKey {
    /// Wrap an externally derived key.
    pub fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        EncryptionKey(Zeroizing::new(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "EncryptionKey {{  }}")
    }
}

/// Derive the 32-byte file key from a password, salted with the file id.
pub fn derive_key(password: &[u8], file_id: &FileId) -> Result<EncryptionKey> {
    let params = argon2::Params::new(
        ARGON2_MEM_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(KEY_BYTES),
    )
    .map_err(|e| Error::config(format!("argon2 parameters: {}", e)))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_BYTES]);
    argon2
        .hash_password_into(password, file_id.as_bytes(), key.as_mut())
        .map_err(|e| Error::config(format!("key derivation: {}", e)))?;

    Ok(EncryptionKey(key))
}

// Deterministic and injective in (file_id, chunk_index): the chunk index
// occupies its own lanes.
fn chunk_nonce(file_id: &FileId, chunk_index: u32) -> [u8; NONCE_BYTES] {
    let mut nonce = [0u8; NONCE_BYTES];
    nonce[..8].copy_from_slice(&file_id.as_bytes()[..8]);
    nonce[8..12].copy_from_slice(&chunk_index.to_le_bytes());
    nonce
}

fn chunk_aad(file_id: &FileId, chunk_index: u32) -> [u8; 20] {
    let mut aad = [0u8; 20];
    aad[..16].copy_from_slice(file_id.as_bytes());
    aad[16..].copy_from_slice(&chunk_index.to_le_bytes());
    aad
}

/// Encrypt one plaintext chunk.
///
/// Returns `nonce (12) ∥ ciphertext ∥ tag (16)`; the blob is what goes to
/// the erasure encoder.
pub fn encrypt_chunk(
    plain: &[u8],
    key: &EncryptionKey,
    file_id: &FileId,
    chunk_index: u32,
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::config(format!("aead key: {}", e)))?;
    let nonce = chunk_nonce(file_id, chunk_index);
    let aad = chunk_aad(file_id, chunk_index);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plain,
                aad: &aad,
            },
        )
        .map_err(|_| Error::config("aead encryption failed"))?;

    let mut blob = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt one chunk blob produced by [`encrypt_chunk`].
///
/// Fails with `AuthFailed` on tag mismatch, wrong key or a mangled blob.
pub fn decrypt_chunk(
    blob: &[u8],
    key: &EncryptionKey,
    file_id: &FileId,
    chunk_index: u32,
) -> Result<Vec<u8>> {
    if blob.len() < NONCE_BYTES + TAG_BYTES {
        log::debug!("chunk {} blob too short to be authentic", chunk_index);
        return Err(Error::AuthFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::config(format!("aead key: {}", e)))?;
    let (nonce, ciphertext) = blob.split_at(NONCE_BYTES);
    let aad = chunk_aad(file_id, chunk_index);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| Error::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::EncryptionKey;
    use crate::common::FileId;
    use crate::tools::error::Error;

    fn key() -> EncryptionKey {
        EncryptionKey::from_bytes([0x42u8; super::KEY_BYTES])
    }

    fn file_id() -> FileId {
        FileId::from_bytes([9u8; 16])
    }

    #[test]
    pub fn test_encrypt_decrypt_roundtrip() {
        crate::tests::init();

        let plain = b"attack at dawn";
        let blob = super::encrypt_chunk(plain, &key(), &file_id(), 3).unwrap();
        assert_eq!(blob.len(), plain.len() + super::NONCE_BYTES + super::TAG_BYTES);

        let decrypted = super::decrypt_chunk(&blob, &key(), &file_id(), 3).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    pub fn test_wrong_key_fails_authentication() {
        crate::tests::init();

        let blob = super::encrypt_chunk(b"secret", &key(), &file_id(), 0).unwrap();
        let wrong = EncryptionKey::from_bytes([0x43u8; super::KEY_BYTES]);
        assert!(matches!(
            super::decrypt_chunk(&blob, &wrong, &file_id(), 0),
            Err(Error::AuthFailed)
        ));
    }

    #[test]
    pub fn test_chunk_index_is_authenticated() {
        crate::tests::init();

        let blob = super::encrypt_chunk(b"secret", &key(), &file_id(), 1).unwrap();
        assert!(super::decrypt_chunk(&blob, &key(), &file_id(), 2).is_err());
    }

    #[test]
    pub fn test_tampered_blob_fails_authentication() {
        crate::tests::init();

        let mut blob = super::encrypt_chunk(b"secret", &key(), &file_id(), 1).unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0x01;
        assert!(matches!(
            super::decrypt_chunk(&blob, &key(), &file_id(), 1),
            Err(Error::AuthFailed)
        ));
    }

    #[test]
    pub fn test_nonces_are_unique_per_chunk() {
        crate::tests::init();

        let id = file_id();
        let mut seen = std::collections::HashSet::new();
        for chunk_index in 0..1000 {
            assert!(seen.insert(super::chunk_nonce(&id, chunk_index)));
        }
    }

    #[test]
    pub fn test_derive_key_is_deterministic() {
        crate::tests::init();

        let a = super::derive_key(b"hunter2", &file_id()).unwrap();
        let b = super::derive_key(b"hunter2", &file_id()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let c = super::derive_key(b"hunter3", &file_id()).unwrap();
        assert_ne!(a.as_bytes(), c.as_bytes());
    }
}
