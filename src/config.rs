//! Explicit store configuration.
//!
//! The original implementation threads a process-wide options object
//! (confdir, CA basename, key size, ...) implicitly through global state.
//! Per the redesign noted in `SPEC_FULL.md` §9, this crate takes all of
//! that as plain constructor parameters instead -- `StoreConfig` exists so
//! an embedding application has somewhere convenient to keep those
//! parameters together (and optionally load them from a TOML file), not
//! because this crate reads any configuration file itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default CA/leaf RSA key size in bits.
pub const DEFAULT_KEY_SIZE: u32 = 2048;

/// Default basename used for on-disk artifacts when none is given.
pub const DEFAULT_BASENAME: &str = "mitmproxy";

/// Parameters needed to bootstrap or load a [`crate::store::Store`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory the CA/leaf artifacts live in (or will be written to).
    pub confdir: PathBuf,

    /// Basename shared by every artifact file, e.g. `<basename>-ca.pem`.
    pub basename: String,

    /// RSA key size in bits for the root CA (and, by extension, every
    /// leaf, since leaves reuse the CA's key).
    pub key_size: u32,

    /// Organization name baked into the CA subject. Defaults to `basename`
    /// if absent.
    pub organization: Option<String>,

    /// Common name baked into the CA subject. Defaults to `basename` if
    /// absent.
    pub common_name: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            confdir: PathBuf::from("."),
            basename: DEFAULT_BASENAME.to_string(),
            key_size: DEFAULT_KEY_SIZE,
            organization: None,
            common_name: None,
        }
    }
}

impl StoreConfig {
    /// Load a [`StoreConfig`] from a TOML file. Purely a convenience for
    /// embedding applications; this crate never reads this file on its own.
    pub fn from_toml_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: StoreConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = StoreConfig::default();
        assert_eq!(config.basename, "mitmproxy");
        assert_eq!(config.key_size, 2048);
        assert!(config.organization.is_none());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = StoreConfig {
            confdir: PathBuf::from("/tmp/certs"),
            basename: "myproxy".to_string(),
            key_size: 4096,
            organization: Some("Acme".to_string()),
            common_name: Some("Acme Root".to_string()),
        };
        let rendered = toml::to_string(&config).unwrap();
        let parsed: StoreConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.basename, config.basename);
        assert_eq!(parsed.key_size, config.key_size);
        assert_eq!(parsed.organization, config.organization);
    }
}
