//! Passphrase-based AES-256-CBC helper
//!
//! The key is the SHA-256 digest of the passphrase and the IV is sixteen zero
//! bytes. Reusing a zero IV means two plaintexts encrypted under the same
//! passphrase reveal whether their first blocks are equal; the scheme is kept
//! as-is for compatibility with existing fixtures and must not be used where
//! confidentiality matters.

use aes::Aes256;
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

const BLOCK_SIZE: usize = 16;
const ZERO_IV: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

#[derive(Debug, thiserror::Error)]
pub enum DecryptionError {
    #[error("ciphertext is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("ciphertext length {0} is not a multiple of the 16-byte block size")]
    BlockAlignment(usize),
    #[error("invalid PKCS#7 padding")]
    Padding,
}

/// Key and IV for one call, dropped when the call returns
struct CipherContext {
    key: sha2::digest::Output<Sha256>,
    iv: [u8; BLOCK_SIZE],
}

impl CipherContext {
    fn new(passphrase: &str) -> Self {
        Self {
            key: Sha256::digest(passphrase.as_bytes()),
            iv: ZERO_IV,
        }
    }

    fn decryptor(&self) -> Aes256CbcDec {
        Aes256CbcDec::new(&self.key, &self.iv.into())
    }

    fn encryptor(&self) -> Aes256CbcEnc {
        Aes256CbcEnc::new(&self.key, &self.iv.into())
    }
}

/// Decrypts base64 ciphertext into raw plaintext bytes
pub fn decrypt_bytes(passphrase: &str, ciphertext_base64: &str) -> Result<Vec<u8>, DecryptionError> {
    let ciphertext = STANDARD.decode(ciphertext_base64.trim())?;
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(DecryptionError::BlockAlignment(ciphertext.len()));
    }

    CipherContext::new(passphrase)
        .decryptor()
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| DecryptionError::Padding)
}

/// Decrypts base64 ciphertext into text.
///
/// Invalid UTF-8 in the plaintext is replaced rather than rejected.
///
/// # Examples
///
/// ```
/// let plaintext = capturesrv::decrypt("MySecretKey", "DNTXPKEjAadeLnKNveSP5Q==").unwrap();
/// assert_eq!(plaintext, "eazeazeza");
/// ```
pub fn decrypt(passphrase: &str, ciphertext_base64: &str) -> Result<String, DecryptionError> {
    let plaintext = decrypt_bytes(passphrase, ciphertext_base64)?;
    Ok(String::from_utf8_lossy(&plaintext).into_owned())
}

/// Encrypts `plaintext` and returns base64 ciphertext, the inverse of [`decrypt`]
pub fn encrypt(passphrase: &str, plaintext: &[u8]) -> String {
    let ciphertext = CipherContext::new(passphrase)
        .encryptor()
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    STANDARD.encode(ciphertext)
}
