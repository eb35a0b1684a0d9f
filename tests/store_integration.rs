//! End-to-end scenarios against the on-disk artifact writer and the
//! in-memory cert store, exercising the paths a real embedding proxy would
//! hit: bootstrap, synthesis, wildcard reuse, eviction, and operator
//! mistakes.

use rust_lib_certauthority::general_name::{GeneralName, GeneralNameList};
use rust_lib_certauthority::store::{Store, StoreEntry, STORE_CAP};
use serial_test::serial;
use std::io::Write;

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// E1. Bootstrap: a fresh confdir produces all six artifact files with the
/// right permissions, and reloading from the same dir yields the same CA.
#[test]
#[serial]
fn e1_bootstrap_writes_artifacts_and_reloads_identically() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();

    let store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    for suffix in [
        "-ca.pem",
        "-ca.p12",
        "-ca-cert.pem",
        "-ca-cert.cer",
        "-ca-cert.p12",
        "-dhparam.pem",
    ] {
        let path = dir.path().join(format!("mitmproxy{suffix}"));
        assert!(path.exists(), "missing artifact {suffix}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(dir.path().join("mitmproxy-ca.pem")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    let reloaded = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();
    assert_eq!(store.default_ca().fingerprint(), reloaded.default_ca().fingerprint());
}

/// E2. A simple miss synthesizes a leaf whose subject/SAN match the request
/// exactly and whose SAN extension is non-critical (a CN was present).
#[test]
#[serial]
fn e2_simple_miss_produces_matching_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let sans = GeneralNameList::new(vec![GeneralName::DnsName("example.com".into())]);
    let entry = store.get_cert(Some("example.com"), sans.clone(), None);

    assert_eq!(entry.cert.cn().as_deref(), Some("example.com"));
    assert_eq!(entry.cert.altnames(), sans);

    let text = String::from_utf8_lossy(&entry.cert.as_x509().to_text().unwrap()).to_string();
    let san_line = text
        .lines()
        .find(|l| l.contains("Subject Alternative Name"))
        .unwrap();
    assert!(!san_line.contains("critical"));
}

/// E3. A CN of 80 characters is dropped from the subject and forces the SAN
/// extension critical, while the SAN itself still carries the DNS name.
#[test]
#[serial]
fn e3_long_cn_empties_subject_and_forces_san_critical() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let long_cn = "a".repeat(80);
    let sans = GeneralNameList::new(vec![GeneralName::DnsName("example.com".into())]);
    let entry = store.get_cert(Some(&long_cn), sans.clone(), None);

    assert!(entry.cert.cn().is_none());
    assert_eq!(entry.cert.altnames(), sans);

    let text = String::from_utf8_lossy(&entry.cert.as_x509().to_text().unwrap()).to_string();
    let san_line = text
        .lines()
        .find(|l| l.contains("Subject Alternative Name"))
        .unwrap();
    assert!(san_line.contains("critical"));
}

/// E4. A pre-registered wildcard cert wins over synthesizing a fresh leaf.
#[test]
#[serial]
fn e4_wildcard_registration_wins_over_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let wildcard_sans =
        GeneralNameList::new(vec![GeneralName::DnsName("*.example.com".into())]);
    let registered = rust_lib_certauthority::leaf::generate_leaf(
        store.default_key(),
        store.default_ca(),
        Some("*.example.com"),
        &wildcard_sans,
        None,
    )
    .unwrap();
    let entry = StoreEntry {
        cert: registered.clone(),
        key: store.default_key().clone(),
        chain_file: None,
        chain_certs: vec![store.default_ca().clone()],
    };
    store.add_cert(entry, &[]);

    let sans = GeneralNameList::new(vec![GeneralName::DnsName("api.example.com".into())]);
    let resolved = store.get_cert(Some("api.example.com"), sans, None);

    assert_eq!(resolved.cert, registered);
}

/// E5. With STORE_CAP = 100, 101 distinct misses evict the oldest entry but
/// keep a mid-queue entry reachable with its original serial.
#[test]
#[serial]
fn e5_capacity_eviction_drops_oldest_keeps_midqueue() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let host_sans = |h: &str| GeneralNameList::new(vec![GeneralName::DnsName(h.to_string())]);

    let host0 = "host0.test";
    let first_host0 = store.get_cert(Some(host0), host_sans(host0), None);

    let host50 = "host50.test";
    let first_host50 = store.get_cert(Some(host50), host_sans(host50), None);

    for i in 1..=STORE_CAP {
        if i == 50 {
            continue;
        }
        let host = format!("host{i}.test");
        store.get_cert(Some(&host), host_sans(&host), None);
    }

    // STORE_CAP + 1 distinct misses total now (host0, host50, and
    // 1..=STORE_CAP minus 50).
    let again_host0 = store.get_cert(Some(host0), host_sans(host0), None);
    assert_ne!(
        first_host0.cert.serial().unwrap(),
        again_host0.cert.serial().unwrap(),
        "host0 should have been evicted and re-synthesized with a new serial"
    );

    let again_host50 = store.get_cert(Some(host50), host_sans(host50), None);
    assert_eq!(
        first_host50.cert.serial().unwrap(),
        again_host50.cert.serial().unwrap(),
        "host50 should still be the original synthesized entry"
    );
}

/// E6. Operator file with mismatched cert/key is rejected and leaves the
/// store untouched.
#[test]
#[serial]
fn e6_mismatched_operator_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let (key_a, cert_a) =
        rust_lib_certauthority::ca::generate_ca("Org A", "CA A", 2048).unwrap();
    let (key_b, _cert_b) =
        rust_lib_certauthority::ca::generate_ca("Org B", "CA B", 2048).unwrap();
    assert!(!key_a.public_eq(&key_b));

    let mut combined = key_b.private_key_pem().unwrap();
    combined.extend_from_slice(&cert_a.to_pem().unwrap());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&combined).unwrap();

    let result = store.add_cert_file("mismatched.example.com", file.path(), None);
    assert!(matches!(
        result,
        Err(rust_lib_certauthority::CertError::KeyMismatch)
    ));

    let sans = GeneralNameList::new(vec![GeneralName::DnsName(
        "mismatched.example.com".into(),
    )]);
    // A lookup for the name the operator tried to register should still
    // fall through to synthesis -- nothing was actually registered.
    let entry = store.get_cert(Some("mismatched.example.com"), sans, None);
    assert_ne!(entry.cert.fingerprint(), cert_a.fingerprint());
}

/// add_cert_file reuses the store's default key when the file carries no
/// usable key of its own, as long as the public keys line up.
#[test]
#[serial]
fn add_cert_file_reuses_default_key_when_file_has_no_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::from_store(dir.path(), "mitmproxy", 2048, None, None, None).unwrap();

    let sans = GeneralNameList::new(vec![GeneralName::DnsName("custom.example.com".into())]);
    let leaf = rust_lib_certauthority::leaf::generate_leaf(
        store.default_key(),
        store.default_ca(),
        Some("custom.example.com"),
        &sans,
        None,
    )
    .unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&leaf.to_pem().unwrap()).unwrap(); // cert only, no key block

    store
        .add_cert_file("custom.example.com", file.path(), None)
        .unwrap();

    let resolved = store.get_cert(
        Some("custom.example.com"),
        GeneralNameList::default(),
        None,
    );
    assert_eq!(resolved.cert, leaf);
}
