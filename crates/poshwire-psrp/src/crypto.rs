//! Cryptographic boundary for `<SS>` secure strings.
//!
//! The codec never touches key material: it hands the element text to a
//! [`CryptoProvider`] and embeds whatever comes back. Providers decide the
//! transformation the current protocol revision requires (today:
//! AES-256-CBC over UTF-16LE plaintext). The provider shipped with the
//! state-machine crate registers the key negotiated by the
//! PUBLIC_KEY / ENCRYPTED_SESSION_KEY exchange.

use crate::PsrpError;
use crate::ps_value::PsString;

pub trait CryptoProvider {
    /// Encrypts secure-string plaintext into the base64 `<SS>` payload.
    fn encrypt(&self, plaintext: &PsString) -> Result<String, PsrpError>;

    /// Decrypts a base64 `<SS>` payload back into plaintext.
    fn decrypt(&self, ciphertext: &str) -> Result<PsString, PsrpError>;

    /// Installs the negotiated session key.
    fn register_session_key(&mut self, key: &[u8]) -> Result<(), PsrpError>;
}

/// The default provider: no key, every operation fails with
/// [`PsrpError::CryptoUnavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCrypto;

impl CryptoProvider for NoCrypto {
    fn encrypt(&self, _plaintext: &PsString) -> Result<String, PsrpError> {
        Err(PsrpError::CryptoUnavailable)
    }

    fn decrypt(&self, _ciphertext: &str) -> Result<PsString, PsrpError> {
        Err(PsrpError::CryptoUnavailable)
    }

    fn register_session_key(&mut self, _key: &[u8]) -> Result<(), PsrpError> {
        Err(PsrpError::CryptoUnavailable)
    }
}
