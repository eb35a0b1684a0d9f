//! # rust_lib_certauthority
//!
//! A self-signed TLS certificate authority and on-the-fly leaf-certificate
//! store for an intercepting HTTPS proxy. This crate generates a root CA
//! once, persists it (and a handful of companion artifacts) to disk, and
//! then synthesizes RFC 5280-compliant server leaves signed by that root
//! fast enough to sit on a TLS handshake's critical path.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  embedding TLS proxy                       │
//! ├───────────────────────────────────────────────────────────┤
//! │  Store (Mutex-guarded by the caller)                       │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────────────────┐  │
//! │  │ ca/leaf  │───│  store    │───│ legacy SAN shim      │  │
//! │  │ builders │   │ (cache)   │   │ (plain-string input)  │  │
//! │  └──────────┘   └───────────┘   └──────────────────────┘  │
//! │        │               │                                  │
//! │   src/ca.rs       src/store.rs                             │
//! │   src/leaf.rs     src/artifacts.rs (on-disk bootstrap)     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate has no async surface and never constructs a `rustls`
//! `ServerConfig` or equivalent -- it hands back raw PEM/DER bytes and
//! leaves TLS handshake machinery entirely to the caller.

pub mod artifacts;
pub mod ca;
pub mod cert;
pub mod config;
pub mod error;
pub mod general_name;
pub mod key;
pub mod leaf;
pub mod legacy;
pub mod store;
pub mod umask;

pub use cert::Cert;
pub use config::StoreConfig;
pub use error::{CertError, Result};
pub use general_name::{GeneralName, GeneralNameList};
pub use key::RsaKeyPair;
pub use store::{CertId, Store, StoreEntry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
