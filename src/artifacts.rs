//! On-disk CA artifact writer: PEM/P12/DH-param files with locked-down
//! permissions.

use crate::ca::generate_ca;
use crate::error::{CertError, Result};
use crate::umask::ScopedUmask;
use openssl::dh::Dh;
use openssl::pkcs12::Pkcs12;
use std::fs;
use std::path::Path;

/// 4096-bit DH parameters, generated once with `openssl dhparam` and
/// reproduced bit-for-bit. Regenerating this at every CA bootstrap would
/// be needlessly slow (this is the entire point of embedding it).
pub const DEFAULT_DHPARAM: &str = "-----BEGIN DH PARAMETERS-----
MIICCAKCAgEAyT6LzpwVFS3gryIo29J5icvgxCnCebcdSe/NHMkD8dKJf8suFCg3
O2+dguLakSVif/t6dhImxInJk230HmfC8q93hdcg/j8rLGJYDKu3ik6H//BAHKIv
j5O9yjU3rXCfmVJQic2Nne39sg3CreAepEts2TvYHhVv3TEAzEqCtOuTjgDv0ntJ
Gwpj+BJBRQGG9NvprX1YGJ7WOFBP/hWU7d6tgvE6Xa7T/u9QIKpYHMIkcN/l3ZFB
chZEqVlyrcngtSXCROTPcDOQ6Q8QzhaBJS+Z6rcsd7X+haiQqvoFcmaJ08Ks6LQC
ZIL2EtYJw8V8z7C0igVEBIADZBI6OTbuuhDwRw//zU1uq52Oc48CIZlGxTYG/Evq
o9EWAXUYVzWkDSTeBH1r4z/qLPE2cnhtMxbFxuvK53jGB0emy2y1Ei6IhKshJ5qX
IB/aE7SSHyQ3MDHHkCmQJCsOd4Mo26YX61NZ+n501XjqpCBQ2+DfZCBh8Va2wDyv
A2Ryg9SUz8j0AXViRNMJgJrr446yro/FuJZwnQcO3WQnXeqSBnURqKjmqkeFP+d8
6mk2tqJaY507lRNqtGlLnj7f5RNoBFJDCLBNurVgfvq9TCVWKDIFD4vZRjCrnl6I
rD693XKIHUCWOjMh1if6omGXKHH40QuME2gNa50+YPn1iYDl88uDbbMCAQI=
-----END DH PARAMETERS-----
";

/// Confirm a DH parameter blob (embedded default, or whatever an operator
/// dropped on disk in its place) actually parses, surfacing `DhParamError`
/// rather than letting a silently-corrupt file reach the TLS layer.
pub fn validate_dhparam(bytes: &[u8]) -> Result<()> {
    Dh::params_from_pem(bytes)
        .map(|_| ())
        .map_err(|e| CertError::DhParam(e.to_string()))
}

#[cfg(unix)]
fn lock_down(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn lock_down(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Write the full six-file CA artifact set into `dir`, generating a fresh
/// root CA. Private-key-bearing files (`<basename>-ca.pem`,
/// `<basename>-ca.p12`) are written under a widened umask and explicitly
/// chmod'd `0600`; the cert-only files get `0644`.
pub fn create_store(
    dir: &Path,
    basename: &str,
    key_size: u32,
    organization: Option<&str>,
    common_name: Option<&str>,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let organization = organization.unwrap_or(basename);
    let common_name = common_name.unwrap_or(basename);
    let (key, cert) = generate_ca(organization, common_name, key_size)?;

    let cert_pem = cert.to_pem()?;
    let key_pem = key.private_key_pem()?;

    {
        let _guard = ScopedUmask::new();

        let ca_pem_path = dir.join(format!("{basename}-ca.pem"));
        let mut combined = key_pem.clone();
        combined.extend_from_slice(&cert_pem);
        fs::write(&ca_pem_path, &combined)?;
        lock_down(&ca_pem_path, 0o600)?;

        let p12 = Pkcs12::builder()
            .name(common_name)
            .pkey(key.as_pkey())
            .cert(cert.as_x509())
            .build("")?;
        let p12_path = dir.join(format!("{basename}-ca.p12"));
        fs::write(&p12_path, p12.to_der()?)?;
        lock_down(&p12_path, 0o600)?;
    }

    let cert_pem_path = dir.join(format!("{basename}-ca-cert.pem"));
    fs::write(&cert_pem_path, &cert_pem)?;
    lock_down(&cert_pem_path, 0o644)?;

    let cer_path = dir.join(format!("{basename}-ca-cert.cer"));
    fs::write(&cer_path, &cert_pem)?;
    lock_down(&cer_path, 0o644)?;

    let cert_only_p12 = Pkcs12::builder()
        .name(common_name)
        .cert(cert.as_x509())
        .build("")?;
    let cert_p12_path = dir.join(format!("{basename}-ca-cert.p12"));
    fs::write(&cert_p12_path, cert_only_p12.to_der()?)?;
    lock_down(&cert_p12_path, 0o644)?;

    let dhparam_path = dir.join(format!("{basename}-dhparam.pem"));
    fs::write(&dhparam_path, DEFAULT_DHPARAM)?;
    lock_down(&dhparam_path, 0o644)?;

    Ok(())
}
