//! Parsed-certificate wrapper and its derived accessors.

use crate::error::{CertError, Result};
use crate::general_name::GeneralNameList;
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::{X509NameRef, X509};
use time::{Duration, OffsetDateTime};

/// A parsed X.509 certificate plus every derived property this crate (and
/// its consumers) need, so call sites never touch the raw `openssl::x509`
/// API directly.
#[derive(Clone)]
pub struct Cert(X509);

impl Cert {
    pub fn from_x509(x509: X509) -> Self {
        Self(x509)
    }

    /// Parse the first certificate out of a PEM blob. A chain file with
    /// trailing certificates is handled by the caller (`add_cert_file`),
    /// not here.
    pub fn from_pem(bytes: &[u8]) -> Result<Self> {
        let x509 = X509::from_pem(bytes)
            .map_err(|_| CertError::Parse("no certificate found in PEM input".to_string()))?;
        Ok(Self(x509))
    }

    pub fn as_x509(&self) -> &X509 {
        &self.0
    }

    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.0.to_pem()?)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.0.to_der()?)
    }

    /// SHA-256 over the DER encoding. Used as the cert's identity for
    /// `PartialEq`/`Eq` and for the store's reverse alias index.
    pub fn fingerprint(&self) -> [u8; 32] {
        let der = self.0.to_der().unwrap_or_default();
        let digest = openssl::hash::hash(MessageDigest::sha256(), &der)
            .expect("sha256 is always available");
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    fn name_entries(name: &X509NameRef) -> Vec<(String, String)> {
        name.entries()
            .filter_map(|entry| {
                let key = entry.object().nid().short_name().ok()?.to_string();
                let value = entry.data().as_utf8().ok()?.to_string();
                Some((key, value))
            })
            .collect()
    }

    pub fn subject(&self) -> Vec<(String, String)> {
        Self::name_entries(self.0.subject_name())
    }

    pub fn issuer(&self) -> Vec<(String, String)> {
        Self::name_entries(self.0.issuer_name())
    }

    pub fn cn(&self) -> Option<String> {
        self.0
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|e| e.data().as_utf8().ok())
            .map(|s| s.to_string())
    }

    pub fn organization(&self) -> Option<String> {
        self.0
            .subject_name()
            .entries_by_nid(Nid::ORGANIZATIONNAME)
            .next()
            .and_then(|e| e.data().as_utf8().ok())
            .map(|s| s.to_string())
    }

    /// Decimal serial number.
    pub fn serial(&self) -> Result<String> {
        let bn = self.0.serial_number().to_bn()?;
        Ok(bn.to_dec_str()?.to_string())
    }

    /// Never fails: an absent SAN extension is an empty list, not an error.
    pub fn altnames(&self) -> GeneralNameList {
        match self.0.subject_alt_names() {
            Some(stack) => GeneralNameList::from_stack(&stack),
            None => GeneralNameList::default(),
        }
    }

    /// `("RSA" | "DSA" | "EC (<curve>)" | <other>, bits)`, `-1` bits if
    /// unknown for the key type.
    pub fn keyinfo(&self) -> (String, i32) {
        let pkey = match self.0.public_key() {
            Ok(k) => k,
            Err(_) => return ("unknown".to_string(), -1),
        };
        if let Ok(rsa) = pkey.rsa() {
            return ("RSA".to_string(), rsa.size() as i32 * 8);
        }
        if let Ok(dsa) = pkey.dsa() {
            return ("DSA".to_string(), dsa.size() as i32 * 8);
        }
        if let Ok(ec) = pkey.ec_key() {
            let curve = ec
                .group()
                .curve_name()
                .and_then(|nid| nid.short_name().ok())
                .unwrap_or("unknown curve");
            return (format!("EC ({curve})"), -1);
        }
        ("unknown".to_string(), -1)
    }

    /// Best-effort CA flag: OpenSSL's Rust binding exposes no parsed
    /// `BasicConstraints` accessor, so this scans the `-text` rendering for
    /// `CA:TRUE`, same workaround used elsewhere in this ecosystem. Absent
    /// extension (or unparsable text) means "not a CA".
    pub fn is_ca(&self) -> bool {
        self.0
            .to_text()
            .map(|text| {
                let text = String::from_utf8_lossy(&text);
                text.contains("CA:TRUE")
            })
            .unwrap_or(false)
    }

    fn asn1_to_offset(time: &Asn1TimeRef) -> Result<OffsetDateTime> {
        let epoch = Asn1Time::from_unix(0)?;
        let diff = epoch.diff(time)?;
        Ok(OffsetDateTime::UNIX_EPOCH
            + Duration::days(diff.days as i64)
            + Duration::seconds(diff.secs as i64))
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        Self::asn1_to_offset(self.0.not_before())
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        Self::asn1_to_offset(self.0.not_after())
    }

    pub fn has_expired(&self) -> bool {
        match self.not_after() {
            Ok(not_after) => OffsetDateTime::now_utc() > not_after,
            Err(_) => false,
        }
    }
}

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Cert {}

impl std::hash::Hash for Cert {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fingerprint().hash(state)
    }
}

impl std::fmt::Debug for Cert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cert")
            .field("subject", &self.subject())
            .field("fingerprint", &hex::encode(self.fingerprint()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::generate_ca;

    #[test]
    fn ca_roundtrips_through_pem() {
        let (_, cert) = generate_ca("Test Org", "Test CA", 2048).unwrap();
        let pem = cert.to_pem().unwrap();
        let reparsed = Cert::from_pem(&pem).unwrap();
        assert_eq!(cert, reparsed);
        assert_eq!(reparsed.cn().as_deref(), Some("Test CA"));
        assert_eq!(reparsed.organization().as_deref(), Some("Test Org"));
        assert!(reparsed.is_ca());
        assert!(!reparsed.has_expired());
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_certs() {
        let (_, a) = generate_ca("Org A", "CA A", 2048).unwrap();
        let (_, b) = generate_ca("Org B", "CA B", 2048).unwrap();
        assert_eq!(a.fingerprint(), a.fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn altnames_empty_when_extension_absent() {
        let (_, cert) = generate_ca("Test Org", "Test CA", 2048).unwrap();
        assert!(cert.altnames().is_empty());
    }
}
