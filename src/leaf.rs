//! On-the-fly leaf (server) certificate synthesis.

use crate::cert::Cert;
use crate::error::Result;
use crate::general_name::GeneralNameList;
use crate::key::RsaKeyPair;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::extension::{AuthorityKeyIdentifier, ExtendedKeyUsage};
use openssl::x509::{X509NameBuilder, X509};
use time::{Duration, OffsetDateTime};

const LEAF_EXPIRY_DAYS: i64 = 365;
const LEAF_BACKDATE_DAYS: i64 = 2;

/// X.520 limit on a CommonName's encoded length.
const MAX_CN_LEN: usize = 64;

fn offset_to_asn1(t: OffsetDateTime) -> Result<openssl::asn1::Asn1Time> {
    Ok(Asn1Time::from_unix(t.unix_timestamp())?)
}

/// Synthesize a server leaf certificate signed by `ca_key`/`ca_cert`.
///
/// The leaf reuses the CA's own keypair rather than generating a fresh one
/// per host -- this crate's store issues leaves fast enough to stay under
/// the handshake latency budget precisely because it skips RSA keygen on
/// every miss. No `SubjectKeyIdentifier` extension is added: giving every
/// leaf the CA's own public key would otherwise give it the CA's own SKI
/// too, and some TLS stacks (notably SChannel) get confused building a
/// chain when a leaf and its issuer carry the same key identifier.
pub fn generate_leaf(
    ca_key: &RsaKeyPair,
    ca_cert: &Cert,
    common_name: Option<&str>,
    sans: &GeneralNameList,
    organization: Option<&str>,
) -> Result<Cert> {
    let mut builder = X509::builder()?;
    builder.set_version(2)?;

    let mut name_builder = X509NameBuilder::new()?;
    let mut has_cn = false;
    if let Some(cn) = common_name {
        if !cn.is_empty() && cn.len() < MAX_CN_LEN {
            name_builder.append_entry_by_nid(Nid::COMMONNAME, cn)?;
            has_cn = true;
        }
    }
    if let Some(org) = organization {
        name_builder.append_entry_by_nid(Nid::ORGANIZATIONNAME, org)?;
    }
    let subject = name_builder.build();
    builder.set_subject_name(&subject)?;
    builder.set_issuer_name(ca_cert.as_x509().subject_name())?;

    builder.set_pubkey(&ca_key.public_part()?)?;

    let mut serial = BigNum::new()?;
    serial.rand(159, MsbOption::MAYBE_ZERO, false)?;
    builder.set_serial_number(&serial.to_asn1_integer()?)?;

    let now = OffsetDateTime::now_utc();
    builder.set_not_before(&offset_to_asn1(now - Duration::days(LEAF_BACKDATE_DAYS))?)?;
    builder.set_not_after(&offset_to_asn1(now + Duration::days(LEAF_EXPIRY_DAYS))?)?;

    builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;

    let ctx = builder.x509v3_context(Some(ca_cert.as_x509()), None);
    let critical_san = !has_cn;
    let san_ext = sans.to_extension(critical_san, &ctx)?;
    builder.append_extension(san_ext)?;

    let aki = AuthorityKeyIdentifier::new()
        .keyid(true)
        .issuer(false)
        .build(&builder.x509v3_context(Some(ca_cert.as_x509()), None))?;
    builder.append_extension(aki)?;

    builder.sign(ca_key.as_pkey(), MessageDigest::sha256())?;
    let cert = builder.build();

    Ok(Cert::from_x509(cert))
}
