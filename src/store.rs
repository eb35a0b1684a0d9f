//! The in-memory leaf-certificate cache: candidate-key resolution,
//! manual registration, and bounded FIFO eviction.

use crate::artifacts::create_store;
use crate::cert::Cert;
use crate::error::{CertError, Result};
use crate::general_name::{GeneralName, GeneralNameList};
use crate::key::{load_pem_private_key, RsaKeyPair};
use crate::leaf::generate_leaf;
use crate::legacy::{normalize_sans, LegacySans};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound on the number of leaf entries kept in memory at once.
pub const STORE_CAP: usize = 100;

/// A cached leaf certificate, its key, and (if it came from an
/// operator-supplied file) the chain it was loaded alongside.
#[derive(Clone)]
pub struct StoreEntry {
    pub cert: Cert,
    pub key: RsaKeyPair,
    pub chain_file: Option<PathBuf>,
    pub chain_certs: Vec<Cert>,
}

impl StoreEntry {
    pub fn leaf_pem(&self) -> Result<Vec<u8>> {
        self.cert.to_pem()
    }

    pub fn key_pem(&self) -> Result<Vec<u8>> {
        self.key.private_key_pem()
    }

    pub fn chain_pems(&self) -> Result<Vec<Vec<u8>>> {
        self.chain_certs.iter().map(Cert::to_pem).collect()
    }
}

impl PartialEq for StoreEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cert == other.cert
    }
}

/// Key an entry is registered under: either an operator-supplied explicit
/// name, or the `(CN, SANs)` pair a synthesized leaf was issued for.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum CertId {
    Custom(String),
    Generated(Option<String>, GeneralNameList),
}

/// The raw PEM bytes of the DH parameters this store was bootstrapped
/// with, exposed verbatim for a caller's TLS configuration.
#[derive(Clone)]
pub struct DhParams(pub Vec<u8>);

/// The certificate authority plus its in-memory leaf cache.
///
/// Every mutating method takes `&mut self` and does no internal locking:
/// per §5's concurrency model, an embedder sharing one `Store` across
/// connection handlers is expected to serialize access behind a single
/// exclusive lock (e.g. `Mutex<Store>`) rather than rely on this type to
/// synchronize itself.
pub struct Store {
    default_key: RsaKeyPair,
    default_ca: Cert,
    default_chain_file: Option<PathBuf>,
    default_chain_certs: Vec<Cert>,
    dh_params: DhParams,
    certs: HashMap<CertId, StoreEntry>,
    expire_queue: VecDeque<CertId>,
    aliases: HashMap<[u8; 32], HashSet<CertId>>,
}

impl Store {
    /// Bootstrap (creating on-disk artifacts if missing) and load a store
    /// rooted at `<dir>/<basename>-*`.
    pub fn from_store(
        dir: &Path,
        basename: &str,
        key_size: u32,
        organization: Option<&str>,
        common_name: Option<&str>,
        passphrase: Option<&[u8]>,
    ) -> Result<Store> {
        let ca_pem_path = dir.join(format!("{basename}-ca.pem"));
        if !ca_pem_path.exists() {
            info!(basename, ?dir, "no CA artifacts found, bootstrapping a new root");
            create_store(dir, basename, key_size, organization, common_name)?;
        }

        let bytes = std::fs::read(&ca_pem_path)?;
        let key = load_pem_private_key(&bytes, passphrase)?;
        let cert = Cert::from_pem(&bytes)?;

        let dhparam_path = dir.join(format!("{basename}-dhparam.pem"));
        let dh_bytes = if dhparam_path.exists() {
            std::fs::read(&dhparam_path)?
        } else {
            std::fs::write(&dhparam_path, crate::artifacts::DEFAULT_DHPARAM)?;
            crate::artifacts::DEFAULT_DHPARAM.as_bytes().to_vec()
        };
        crate::artifacts::validate_dhparam(&dh_bytes)?;

        // A CA file with more than one PEM certificate block carries its own
        // chain; remember the file so `add_cert_file`-free reloads keep
        // serving it. Otherwise the CA alone is the fallback chain of
        // length one (§3 invariant 4).
        let chain_certs = parse_chain(&bytes)?;
        let (default_chain_file, default_chain_certs) = if chain_certs.len() > 1 {
            (Some(ca_pem_path.clone()), chain_certs)
        } else {
            (None, vec![cert.clone()])
        };

        info!(basename, key_bits = key_size, "loaded root CA");

        Ok(Store {
            default_key: key,
            default_ca: cert,
            default_chain_file,
            default_chain_certs,
            dh_params: DhParams(dh_bytes),
            certs: HashMap::new(),
            expire_queue: VecDeque::new(),
            aliases: HashMap::new(),
        })
    }

    pub fn default_ca(&self) -> &Cert {
        &self.default_ca
    }

    pub fn default_key(&self) -> &RsaKeyPair {
        &self.default_key
    }

    pub fn dh_params(&self) -> &DhParams {
        &self.dh_params
    }

    pub fn default_chain_certs(&self) -> &[Cert] {
        &self.default_chain_certs
    }

    /// Load an operator-supplied certificate (+ key, + optional chain) file
    /// and register it in the store under `spec`, the way a hostname
    /// pattern the operator already has a real cert for bypasses leaf
    /// synthesis entirely.
    ///
    /// Mirrors the original implementation's six-step algorithm: parse the
    /// leading cert, then the key -- if the file carries no usable key,
    /// fall back to the store's own default key when (and only when) its
    /// public half matches the leaf's, and fail with `KeyMismatch`
    /// otherwise in either direction. Any trailing certs in the same file
    /// become the chain; a malformed trailing block is a warning, not a
    /// hard failure, and falls back to a leaf-only chain. Finally warn (but
    /// proceed) if the loaded cert is itself a CA -- a likely
    /// misconfiguration, not a fatal one.
    pub fn add_cert_file(
        &mut self,
        spec: &str,
        path: &Path,
        passphrase: Option<&[u8]>,
    ) -> Result<()> {
        let bytes = std::fs::read(path)?;

        let cert = Cert::from_pem(&bytes)?;

        let key = match load_pem_private_key(&bytes, passphrase) {
            Ok(parsed) => {
                if !parsed.public_eq_cert(&cert)? {
                    return Err(CertError::KeyMismatch);
                }
                parsed
            }
            Err(_) => {
                if self.default_key.public_eq_cert(&cert)? {
                    self.default_key.clone()
                } else {
                    return Err(CertError::KeyMismatch);
                }
            }
        };

        let chain_certs = match parse_chain(&bytes) {
            Ok(mut certs) => {
                if !certs.is_empty() {
                    certs.remove(0); // the leading cert is `cert` itself
                }
                certs
            }
            Err(e) => {
                warn!(spec, error = %e, "failed to parse certificate chain, treating file as leaf-only");
                Vec::new()
            }
        };

        if cert.is_ca() {
            warn!(spec, "operator-supplied cert is itself a CA certificate, not a leaf");
        }

        let entry = StoreEntry {
            cert,
            key,
            chain_file: Some(path.to_path_buf()),
            chain_certs,
        };
        self.add_cert(entry, &[spec]);

        Ok(())
    }

    /// Register `entry` under its CN, every SAN string form, and every
    /// explicit `names` entry. Later registrations under a shared key
    /// overwrite earlier ones silently (no eviction event).
    pub fn add_cert(&mut self, entry: StoreEntry, names: &[&str]) {
        let fingerprint = entry.cert.fingerprint();
        let mut keys: Vec<CertId> = Vec::new();

        if let Some(cn) = entry.cert.cn() {
            keys.push(CertId::Custom(cn));
        }
        for name in entry.cert.altnames().iter() {
            keys.push(CertId::Custom(name.as_str_form()));
        }
        for name in names {
            keys.push(CertId::Custom((*name).to_string()));
        }

        for key in keys {
            self.certs.insert(key.clone(), entry.clone());
            self.aliases.entry(fingerprint).or_default().insert(key);
        }
    }

    /// Generator for the asterisk forms of a single [`GeneralName`],
    /// re-exported at the store level to match the documented API shape
    /// (see `GeneralName::asterisk_forms` for the implementation).
    pub fn asterisk_forms(name: &GeneralName) -> Vec<String> {
        name.asterisk_forms()
    }

    /// Resolve (synthesizing on a full miss) the leaf certificate for a
    /// given identity. Never fails: a signing failure at this point is an
    /// invariant violation, not a recoverable error.
    pub fn get_cert(
        &mut self,
        common_name: Option<&str>,
        sans: impl Into<LegacySans>,
        organization: Option<&str>,
    ) -> StoreEntry {
        let sans = normalize_sans(sans.into());

        let mut candidates: Vec<String> = Vec::new();
        if let Some(cn) = common_name {
            candidates.extend(crate::general_name::asterisk_forms_str(cn));
        }
        for name in sans.iter() {
            candidates.extend(name.asterisk_forms());
        }
        candidates.push("*".to_string());

        for candidate in &candidates {
            if let Some(entry) = self.certs.get(&CertId::Custom(candidate.clone())) {
                debug!(candidate, "cert store hit");
                return entry.clone();
            }
        }

        let generated_id = CertId::Generated(common_name.map(str::to_string), sans.clone());
        if let Some(entry) = self.certs.get(&generated_id) {
            debug!(?common_name, "cert store hit (previously synthesized)");
            return entry.clone();
        }

        debug!(?common_name, "cert store miss, synthesizing leaf");
        let cert = generate_leaf(
            &self.default_key,
            &self.default_ca,
            common_name,
            &sans,
            organization,
        )
        .expect("leaf synthesis from a valid, already-loaded CA must not fail");

        let entry = StoreEntry {
            cert,
            key: self.default_key.clone(),
            chain_file: self.default_chain_file.clone(),
            chain_certs: self.default_chain_certs.clone(),
        };

        let id = generated_id;
        self.certs.insert(id.clone(), entry.clone());
        self.aliases
            .entry(entry.cert.fingerprint())
            .or_default()
            .insert(id.clone());
        self.expire(id);

        entry
    }

    /// FIFO-append `id` to the expiry queue, evicting the oldest entries
    /// (and every alias they were registered under) once the store is
    /// over `STORE_CAP`.
    fn expire(&mut self, id: CertId) {
        self.expire_queue.push_back(id);
        while self.expire_queue.len() > STORE_CAP {
            if let Some(oldest) = self.expire_queue.pop_front() {
                self.evict(&oldest);
            }
        }
    }

    fn evict(&mut self, id: &CertId) {
        let Some(entry) = self.certs.get(id) else {
            return;
        };
        let fingerprint = entry.cert.fingerprint();
        if let Some(keys) = self.aliases.remove(&fingerprint) {
            for key in keys {
                self.certs.remove(&key);
            }
        } else {
            self.certs.remove(id);
        }
    }
}

impl RsaKeyPair {
    fn public_eq_cert(&self, cert: &Cert) -> Result<bool> {
        let cert_pub = cert.as_x509().public_key()?.public_key_to_der()?;
        let key_pub = self.as_pkey().public_key_to_der()?;
        Ok(cert_pub == key_pub)
    }
}

/// Parse every certificate present in a (possibly multi-cert) PEM blob.
fn parse_chain(bytes: &[u8]) -> Result<Vec<Cert>> {
    let x509s = openssl::x509::X509::stack_from_pem(bytes)?;
    Ok(x509s.into_iter().map(Cert::from_x509).collect())
}
