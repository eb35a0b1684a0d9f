//! Legacy plain-string SAN compatibility shim.
//!
//! Older callers pass a bare `Vec<String>` of names rather than a typed
//! [`GeneralNameList`]. This module is the single place that conversion
//! happens; `Store::get_cert` calls it once up front, not on every
//! candidate-key lookup.

use crate::general_name::{GeneralName, GeneralNameList};
use std::net::IpAddr;
use std::str::FromStr;
use tracing::warn;

/// Either form a caller might hand the store.
pub enum LegacySans {
    Typed(GeneralNameList),
    Strings(Vec<String>),
}

impl From<GeneralNameList> for LegacySans {
    fn from(list: GeneralNameList) -> Self {
        LegacySans::Typed(list)
    }
}

impl From<Vec<String>> for LegacySans {
    fn from(strings: Vec<String>) -> Self {
        LegacySans::Strings(strings)
    }
}

/// Normalize a [`LegacySans`] into a [`GeneralNameList`]. A plain-string
/// list is converted element-by-element: an IP-parseable string becomes
/// `GeneralName::IpAddress`, everything else is IDNA-encoded and becomes
/// `GeneralName::DnsName`. A single deprecation warning is emitted per
/// call (not per element) the first time the `Strings` form is seen.
pub fn normalize_sans(sans: LegacySans) -> GeneralNameList {
    match sans {
        LegacySans::Typed(list) => list,
        LegacySans::Strings(strings) => {
            warn!(
                count = strings.len(),
                "plain-string SAN list is deprecated; pass a typed GeneralNameList instead"
            );
            strings
                .into_iter()
                .map(|s| {
                    if let Ok(ip) = IpAddr::from_str(&s) {
                        GeneralName::IpAddress(ip)
                    } else {
                        match idna::domain_to_ascii(&s) {
                            Ok(ascii) => GeneralName::DnsName(ascii),
                            Err(_) => GeneralName::DnsName(s),
                        }
                    }
                })
                .collect()
        }
    }
}
