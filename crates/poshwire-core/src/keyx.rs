//! Session-key exchange primitives and the AES crypto provider.
//!
//! Blob formats follow the CryptoAPI shapes MS-PSRP mandates: the client
//! advertises a PUBLICKEYBLOB, the server answers with a SIMPLEBLOB whose
//! RSA-wrapped payload is stored least-significant-byte first.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use cipher::block_padding::Pkcs7;
use cipher::{BlockModeDecrypt, BlockModeEncrypt, KeyIvInit};
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info};

use poshwire_psrp::ps_value::PsString;
use poshwire_psrp::{CryptoProvider, PsrpError};

use crate::PoolError;

const BLOB_MAGIC: [u8; 4] = [0x06, 0x02, 0x00, 0x00];
const CALG_RSA_KEYX: [u8; 4] = [0x00, 0xA4, 0x00, 0x00];
const RSA1: [u8; 4] = [0x52, 0x53, 0x41, 0x31];
const BITLEN_2048: [u8; 4] = [0x00, 0x08, 0x00, 0x00];
const MODULUS_LEN: usize = 256;

// SIMPLEBLOB header: bType=SIMPLEBLOB v2, aiKeyAlg=CALG_AES_256,
// exchange algorithm CALG_RSA_KEYX.
const SIMPLEBLOB_HEADER: [u8; 12] = [
    0x01, 0x02, 0x00, 0x00, 0x10, 0x66, 0x00, 0x00, 0x00, 0xA4, 0x00, 0x00,
];

pub const SESSION_KEY_LEN: usize = 32;

/// Client-side key-exchange state: the RSA keypair whose public half is
/// sent in PUBLIC_KEY.
#[derive(Debug)]
pub(crate) struct KeyExchange {
    private_key: RsaPrivateKey,
}

impl KeyExchange {
    pub fn generate() -> Result<Self, PoolError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048)
            .map_err(|e| PoolError::KeyExchange(format!("failed to generate RSA keypair: {e}")))?;
        Ok(Self { private_key })
    }

    /// The PUBLIC_KEY payload: base64 CryptoAPI PUBLICKEYBLOB.
    pub fn public_key_blob_base64(&self) -> Result<String, PoolError> {
        let public_key = self.private_key.to_public_key();

        let exponent_be = public_key.e().to_bytes_be();
        if exponent_be.is_empty() || exponent_be.len() > 4 {
            return Err(PoolError::KeyExchange(format!(
                "unexpected RSA exponent length: {} bytes",
                exponent_be.len()
            )));
        }
        let mut exponent = [0u8; 4];
        exponent[4 - exponent_be.len()..].copy_from_slice(&exponent_be);
        let exponent_le = u32::from_be_bytes(exponent).to_le_bytes();

        let mut modulus_be = public_key.n().to_bytes_be();
        if modulus_be.len() > MODULUS_LEN {
            return Err(PoolError::KeyExchange(format!(
                "RSA modulus too large: {} bytes",
                modulus_be.len()
            )));
        }
        if modulus_be.len() < MODULUS_LEN {
            let mut padded = vec![0u8; MODULUS_LEN - modulus_be.len()];
            padded.extend_from_slice(&modulus_be);
            modulus_be = padded;
        }
        let modulus_le: Vec<u8> = modulus_be.into_iter().rev().collect();

        let mut blob = Vec::with_capacity(20 + MODULUS_LEN);
        blob.extend_from_slice(&BLOB_MAGIC);
        blob.extend_from_slice(&CALG_RSA_KEYX);
        blob.extend_from_slice(&RSA1);
        blob.extend_from_slice(&BITLEN_2048);
        blob.extend_from_slice(&exponent_le);
        blob.extend_from_slice(&modulus_le);

        Ok(B64.encode(blob))
    }

    /// Unwraps ENCRYPTED_SESSION_KEY. Some stacks store the RSA payload
    /// reversed, so both orientations are attempted.
    pub fn unwrap_session_key(&self, blob_base64: &str) -> Result<Vec<u8>, PoolError> {
        let decoded = B64.decode(blob_base64).map_err(|e| {
            PoolError::KeyExchange(format!("invalid base64 EncryptedSessionKey: {e}"))
        })?;
        if decoded.len() < SIMPLEBLOB_HEADER.len() + MODULUS_LEN {
            return Err(PoolError::KeyExchange(format!(
                "EncryptedSessionKey blob too short: {} bytes",
                decoded.len()
            )));
        }

        let wrapped = &decoded[SIMPLEBLOB_HEADER.len()..SIMPLEBLOB_HEADER.len() + MODULUS_LEN];
        let key = self
            .private_key
            .decrypt(Pkcs1v15Encrypt, wrapped)
            .or_else(|e| {
                let mut reversed = wrapped.to_vec();
                reversed.reverse();
                self.private_key
                    .decrypt(Pkcs1v15Encrypt, &reversed)
                    .map_err(|_e2| e)
            })
            .map_err(|e| {
                PoolError::KeyExchange(format!("failed to decrypt EncryptedSessionKey: {e}"))
            })?;

        if key.len() != SESSION_KEY_LEN {
            return Err(PoolError::KeyExchange(format!(
                "unexpected session key length: {} bytes",
                key.len()
            )));
        }
        info!(target: "key_exchange", "session key unwrapped");
        Ok(key)
    }
}

/// Server side: reads the client's PUBLICKEYBLOB.
pub(crate) fn parse_public_key_blob(blob_base64: &str) -> Result<RsaPublicKey, PoolError> {
    let blob = B64
        .decode(blob_base64)
        .map_err(|e| PoolError::KeyExchange(format!("invalid base64 PublicKey: {e}")))?;
    if blob.len() != 20 + MODULUS_LEN {
        return Err(PoolError::KeyExchange(format!(
            "unexpected PublicKey blob length: {} bytes",
            blob.len()
        )));
    }
    if blob[8..12] != RSA1 {
        return Err(PoolError::KeyExchange("PublicKey blob is not RSA1".to_string()));
    }

    let exponent = u32::from_le_bytes([blob[16], blob[17], blob[18], blob[19]]);
    let modulus_be: Vec<u8> = blob[20..].iter().rev().copied().collect();

    RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus_be),
        BigUint::from(exponent),
    )
    .map_err(|e| PoolError::KeyExchange(format!("invalid RSA public key: {e}")))
}

/// Server side: a fresh 256-bit session key.
pub(crate) fn generate_session_key() -> [u8; SESSION_KEY_LEN] {
    let mut key = [0u8; SESSION_KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Server side: wraps the session key into the SIMPLEBLOB the client's
/// `unwrap_session_key` expects (RSA payload byte-reversed).
pub(crate) fn wrap_session_key(
    key: &[u8],
    client_key: &RsaPublicKey,
) -> Result<String, PoolError> {
    let mut rng = rand::thread_rng();
    let mut wrapped = client_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, key)
        .map_err(|e| PoolError::KeyExchange(format!("failed to wrap session key: {e}")))?;
    wrapped.reverse();

    let mut blob = Vec::with_capacity(SIMPLEBLOB_HEADER.len() + wrapped.len());
    blob.extend_from_slice(&SIMPLEBLOB_HEADER);
    blob.extend_from_slice(&wrapped);
    Ok(B64.encode(blob))
}

/// The pool's [`CryptoProvider`]: AES-256-CBC with PKCS#7 padding over
/// UTF-16LE plaintext, a fresh random IV per message prepended to the
/// ciphertext.
#[derive(Default)]
pub struct SessionKeyCrypto {
    key: Option<[u8; SESSION_KEY_LEN]>,
}

impl std::fmt::Debug for SessionKeyCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyCrypto")
            .field("key", &self.key.map(|_| "<redacted>"))
            .finish()
    }
}

impl SessionKeyCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }
}

impl CryptoProvider for SessionKeyCrypto {
    fn encrypt(&self, plaintext: &PsString) -> Result<String, PsrpError> {
        let key = self.key.as_ref().ok_or(PsrpError::CryptoUnavailable)?;

        let mut iv = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut iv);

        let plain_bytes: Vec<u8> = plaintext
            .units()
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect();

        let encryptor = cbc::Encryptor::<Aes256>::new_from_slices(key, &iv)
            .map_err(|e| PsrpError::Crypto(format!("failed to initialize AES encryptor: {e}")))?;

        let msg_len = plain_bytes.len();
        let mut buf = plain_bytes;
        buf.resize(msg_len + 16, 0);
        let ciphertext = encryptor
            .encrypt_padded::<Pkcs7>(&mut buf, msg_len)
            .map_err(|e| PsrpError::Crypto(format!("failed to encrypt secure string: {e}")))?;

        let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(ciphertext);

        debug!(
            target: "key_exchange",
            plaintext_len = msg_len,
            encrypted_len = out.len(),
            "encrypted secure string payload"
        );
        Ok(B64.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<PsString, PsrpError> {
        let key = self.key.as_ref().ok_or(PsrpError::CryptoUnavailable)?;

        let decoded = B64
            .decode(ciphertext)
            .map_err(|e| PsrpError::Crypto(format!("invalid base64 secure string: {e}")))?;
        if decoded.len() < 16 || (decoded.len() - 16) % 16 != 0 {
            return Err(PsrpError::Crypto(format!(
                "secure string payload has invalid length {}",
                decoded.len()
            )));
        }
        let (iv, body) = decoded.split_at(16);

        let decryptor = cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| PsrpError::Crypto(format!("failed to initialize AES decryptor: {e}")))?;

        let mut buf = body.to_vec();
        let plain = decryptor
            .decrypt_padded::<Pkcs7>(&mut buf)
            .map_err(|e| PsrpError::Crypto(format!("failed to decrypt secure string: {e}")))?;

        if plain.len() % 2 != 0 {
            return Err(PsrpError::Crypto(
                "secure string plaintext is not UTF-16LE".to_string(),
            ));
        }
        let units: Vec<u16> = plain
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(PsString::from_units(units))
    }

    fn register_session_key(&mut self, key: &[u8]) -> Result<(), PsrpError> {
        let key: [u8; SESSION_KEY_LEN] = key.try_into().map_err(|_| {
            PsrpError::Crypto(format!(
                "session key must be {SESSION_KEY_LEN} bytes, got {}",
                key.len()
            ))
        })?;
        self.key = Some(key);
        Ok(())
    }
}
