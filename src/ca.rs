//! Root CA generation.

use crate::cert::Cert;
use crate::error::Result;
use crate::key::RsaKeyPair;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509NameBuilder, X509};
use time::{Duration, OffsetDateTime};
use tracing::info;

const CA_EXPIRY_DAYS: i64 = 10 * 365;
const CA_BACKDATE_DAYS: i64 = 2;

fn offset_to_asn1(t: OffsetDateTime) -> Result<openssl::asn1::Asn1Time> {
    Ok(Asn1Time::from_unix(t.unix_timestamp())?)
}

/// Generate a fresh self-signed root CA keypair and certificate.
///
/// Subject equals issuer (self-signed), serial is a random 159-bit value
/// per RFC 5280 §4.1.2.2, validity spans `now - 2 days` to `now + 10
/// years`, and the certificate carries the extension set a locally
/// trusted intercepting-proxy root needs: critical `BasicConstraints{ca}`
/// and `KeyUsage{keyCertSign, cRLSign}`, non-critical `ExtendedKeyUsage{serverAuth}`
/// and `SubjectKeyIdentifier`.
pub fn generate_ca(organization: &str, common_name: &str, key_size: u32) -> Result<(RsaKeyPair, Cert)> {
    let rsa = Rsa::generate(key_size)?;
    let pkey = PKey::from_rsa(rsa)?;

    let mut name_builder = X509NameBuilder::new()?;
    name_builder.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
    name_builder.append_entry_by_nid(Nid::ORGANIZATIONNAME, organization)?;
    let name = name_builder.build();

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&pkey)?;

    let mut serial = BigNum::new()?;
    serial.rand(159, MsbOption::MAYBE_ZERO, false)?;
    builder.set_serial_number(&serial.to_asn1_integer()?)?;

    let now = OffsetDateTime::now_utc();
    builder.set_not_before(&offset_to_asn1(now - Duration::days(CA_BACKDATE_DAYS))?)?;
    builder.set_not_after(&offset_to_asn1(now + Duration::days(CA_EXPIRY_DAYS))?)?;

    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;

    let ctx = builder.x509v3_context(None, None);
    let ski = SubjectKeyIdentifier::new().build(&ctx)?;
    builder.append_extension(ski)?;

    builder.sign(&pkey, MessageDigest::sha256())?;
    let cert = builder.build();

    info!(organization, common_name, key_size, "generated root CA");
    Ok((RsaKeyPair::from_pkey(pkey), Cert::from_x509(cert)))
}
