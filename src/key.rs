//! RSA key pairs and private-key loading.

use crate::error::{CertError, Result};
use openssl::pkey::{PKey, Private};
use tracing::warn;

/// An RSA key pair known to be usable both for signing (CA/leaf issuance)
/// and as a leaf's reused public key.
#[derive(Clone)]
pub struct RsaKeyPair(PKey<Private>);

impl RsaKeyPair {
    pub fn from_pkey(pkey: PKey<Private>) -> Self {
        Self(pkey)
    }

    pub fn as_pkey(&self) -> &PKey<Private> {
        &self.0
    }

    /// The public half, suitable for `X509Builder::set_pubkey` when a leaf
    /// reuses the CA's key rather than generating its own.
    pub fn public_part(&self) -> Result<PKey<openssl::pkey::Public>> {
        let der = self.0.public_key_to_der()?;
        Ok(PKey::public_key_from_der(&der)?)
    }

    /// PKCS#1 traditional PEM encoding, unencrypted.
    pub fn private_key_pem(&self) -> Result<Vec<u8>> {
        let rsa = self.0.rsa()?;
        Ok(rsa.private_key_to_pem()?)
    }

    /// Whether two key pairs share the same public key, by comparing
    /// DER-encoded public keys. Used by `Store::add_cert_file`'s key-match
    /// rule.
    pub fn public_eq(&self, other: &RsaKeyPair) -> bool {
        match (self.0.public_key_to_der(), other.0.public_key_to_der()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Load a PEM-encoded private key, optionally decrypting with `password`.
///
/// Mirrors the original implementation's `load_pem_private_key` fallback:
/// if a password is supplied but doesn't decrypt the key, this silently
/// retries with no password at all before giving up. That fallback exists
/// because some on-disk keys in the wild are unencrypted despite an
/// operator habitually passing a passphrase flag.
pub fn load_pem_private_key(bytes: &[u8], password: Option<&[u8]>) -> Result<RsaKeyPair> {
    if let Some(pass) = password {
        if let Ok(key) = PKey::private_key_from_pem_passphrase(bytes, pass) {
            return Ok(RsaKeyPair(key));
        }
        warn!("private key did not decrypt with supplied passphrase, retrying unencrypted");
        if let Ok(key) = PKey::private_key_from_pem(bytes) {
            return Ok(RsaKeyPair(key));
        }
        return Err(CertError::BadPassphrase);
    }

    PKey::private_key_from_pem(bytes)
        .map(RsaKeyPair)
        .map_err(|_| CertError::BadPassphrase)
}
