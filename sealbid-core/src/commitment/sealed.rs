use crate::commitment::CommitmentScheme;
use crate::error::{GameError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bitcoin::secp256k1::{ecdh::SharedSecret, PublicKey, Secp256k1, SecretKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ChaCha20Poly1305 keyed by an ECDH secret with the manager's key
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

const KEY_DOMAIN: &[u8] = b"sealbid/sealed-number/v1";
const PUBKEY_SIZE: usize = 33;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const PLAINTEXT_SIZE: usize = 2;

/// A bid number encrypted to the manager's public key.
///
/// Layout: `ephemeral public key (33) || nonce (12) || ciphertext + tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SealedNumber(Vec<u8>);

/// Disclosed private key plus the number it is claimed to open to
#[derive(Debug, Clone)]
pub struct SealedOpening {
    pub private_key: Vec<u8>,
    pub number: u16,
}

impl SealedNumber {
    /// Encrypt `number` so only the holder of the matching private key can read it
    pub fn seal(manager_public_key: &[u8], number: u16) -> Result<Self> {
        let manager_key = PublicKey::from_slice(manager_public_key)
            .map_err(|e| GameError::crypto(format!("Invalid manager public key: {}", e)))?;

        let secp = Secp256k1::new();
        let ephemeral = random_secret_key()?;
        let ephemeral_public = PublicKey::from_secret_key(&secp, &ephemeral);

        let shared = SharedSecret::new(&manager_key, &ephemeral);
        let cipher = ChaCha20Poly1305::new(&derive_key(&shared));

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), &number.to_be_bytes()[..])
            .map_err(|e| GameError::crypto(format!("Encryption failed: {}", e)))?;

        let mut bytes = Vec::with_capacity(PUBKEY_SIZE + NONCE_SIZE + ciphertext.len());
        bytes.extend_from_slice(&ephemeral_public.serialize());
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&ciphertext);
        Ok(Self(bytes))
    }

    /// Wrap raw ciphertext bytes without checking them
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| GameError::malformed_commitment(format!("Invalid base64: {}", e)))?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Rejects empty and placeholder ciphertexts
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(GameError::malformed_commitment("Empty ciphertext"));
        }

        let expected = PUBKEY_SIZE + NONCE_SIZE + PLAINTEXT_SIZE + TAG_SIZE;
        if self.0.len() != expected {
            return Err(GameError::malformed_commitment(format!(
                "Ciphertext must be {} bytes, got {}",
                expected,
                self.0.len()
            )));
        }

        PublicKey::from_slice(&self.0[..PUBKEY_SIZE])
            .map_err(|e| GameError::malformed_commitment(format!("Invalid ephemeral key: {}", e)))?;

        Ok(())
    }

    /// Decrypt with the manager's disclosed private key
    pub fn open(&self, private_key: &[u8]) -> Result<u16> {
        self.validate()?;

        let secret = SecretKey::from_slice(private_key)
            .map_err(|e| GameError::crypto(format!("Invalid private key: {}", e)))?;
        let ephemeral_public = PublicKey::from_slice(&self.0[..PUBKEY_SIZE])
            .map_err(|e| GameError::crypto(format!("Invalid ephemeral key: {}", e)))?;

        let shared = SharedSecret::new(&ephemeral_public, &secret);
        let cipher = ChaCha20Poly1305::new(&derive_key(&shared));

        let nonce = Nonce::from_slice(&self.0[PUBKEY_SIZE..PUBKEY_SIZE + NONCE_SIZE]);
        let plaintext = cipher
            .decrypt(nonce, &self.0[PUBKEY_SIZE + NONCE_SIZE..])
            .map_err(|e| GameError::crypto(format!("Decryption failed: {}", e)))?;

        let number: [u8; PLAINTEXT_SIZE] = plaintext
            .try_into()
            .map_err(|_| GameError::crypto("Unexpected plaintext length"))?;
        Ok(u16::from_be_bytes(number))
    }
}

impl CommitmentScheme for SealedNumber {
    type Opening = SealedOpening;

    fn verify(&self, opening: &SealedOpening) -> bool {
        matches!(self.open(&opening.private_key), Ok(number) if number == opening.number)
    }
}

/// Compressed public key matching a private key
pub fn public_key_for(private_key: &[u8]) -> Result<Vec<u8>> {
    let secret = SecretKey::from_slice(private_key)
        .map_err(|e| GameError::crypto(format!("Invalid private key: {}", e)))?;
    let secp = Secp256k1::new();
    Ok(PublicKey::from_secret_key(&secp, &secret).serialize().to_vec())
}

fn random_secret_key() -> Result<SecretKey> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretKey::from_slice(&bytes)
        .map_err(|e| GameError::crypto(format!("Failed to draw ephemeral key: {}", e)))
}

fn derive_key(shared: &SharedSecret) -> Key {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN);
    hasher.update(shared.secret_bytes());
    *Key::from_slice(&hasher.finalize())
}
