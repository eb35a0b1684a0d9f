//! Typed Subject Alternative Names.
//!
//! The original implementation's SAN list duck-types between a list of
//! plain strings (legacy) and a list of `cryptography` `GeneralName`
//! objects (current). Per `SPEC_FULL.md` §9 ("Duck-typed SAN list -> sum
//! type"), this crate collapses that to one tagged variant and keeps the
//! legacy string form as an explicit, one-way conversion (see
//! `crate::legacy`) rather than letting it leak into the type itself.

use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{GeneralName as OpenSslGeneralName, X509v3Context};
use std::net::IpAddr;

/// One entry of a Subject Alternative Name extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeneralName {
    DnsName(String),
    IpAddress(IpAddr),
    Uri(String),
    Email(String),
    /// Anything this crate doesn't special-case (e.g. a directory name).
    /// Carries the best string representation OpenSSL gave us.
    Other(String),
}

impl GeneralName {
    /// Sort-and-hash tag used to canonicalize a [`GeneralNameList`] before
    /// structural comparison -- see `SPEC_FULL.md` §9 "Cache key identity".
    fn tag(&self) -> u8 {
        match self {
            GeneralName::DnsName(_) => 0,
            GeneralName::IpAddress(_) => 1,
            GeneralName::Uri(_) => 2,
            GeneralName::Email(_) => 3,
            GeneralName::Other(_) => 4,
        }
    }

    /// The string form used both for cache-key registration and for the
    /// asterisk-form generator (non-DNS names collapse to this verbatim).
    pub fn as_str_form(&self) -> String {
        match self {
            GeneralName::DnsName(s) => s.clone(),
            GeneralName::IpAddress(ip) => ip.to_string(),
            GeneralName::Uri(s) => s.clone(),
            GeneralName::Email(s) => s.clone(),
            GeneralName::Other(s) => s.clone(),
        }
    }

    /// All asterisk forms for this name, most-specific first. Per
    /// `SPEC_FULL.md` §4.5 / spec.md §8 property 8: DNS names expand to
    /// every wildcard prefix (never the bare `"*"`); every other kind of
    /// name yields a single-element list of its string form.
    pub fn asterisk_forms(&self) -> Vec<String> {
        match self {
            GeneralName::DnsName(name) => asterisk_forms_str(name),
            other => vec![other.as_str_form()],
        }
    }
}

/// Asterisk-form generator for a plain DNS label sequence, e.g.
/// `"a.b.c"` -> `["a.b.c", "*.b.c", "*.c"]`.
pub fn asterisk_forms_str(dn: &str) -> Vec<String> {
    let parts: Vec<&str> = dn.split('.').collect();
    let mut forms = vec![dn.to_string()];
    for i in 1..parts.len() {
        forms.push(format!("*.{}", parts[i..].join(".")));
    }
    forms
}

/// An ordered Subject Alternative Name list with canonical structural
/// equality/hashing, independent of construction order.
#[derive(Debug, Clone, Default)]
pub struct GeneralNameList(pub Vec<GeneralName>);

impl GeneralNameList {
    pub fn new(names: Vec<GeneralName>) -> Self {
        Self(names)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneralName> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names sorted by `(tag, string form)` -- the canonical order used for
    /// equality and hashing, so two lists built in different orders
    /// collide to the same cache key.
    fn canonical(&self) -> Vec<(u8, String)> {
        let mut keyed: Vec<(u8, String)> = self
            .0
            .iter()
            .map(|n| (n.tag(), n.as_str_form()))
            .collect();
        keyed.sort();
        keyed
    }

    /// Build an OpenSSL `SubjectAlternativeName` extension from this list.
    pub fn to_extension(
        &self,
        critical: bool,
        ctx: &X509v3Context<'_>,
    ) -> Result<openssl::x509::X509Extension, openssl::error::ErrorStack> {
        let mut builder = SubjectAlternativeName::new();
        for name in &self.0 {
            match name {
                GeneralName::DnsName(s) => {
                    builder.dns(s);
                }
                GeneralName::IpAddress(ip) => {
                    builder.ip(&ip.to_string());
                }
                GeneralName::Uri(s) => {
                    builder.uri(s);
                }
                GeneralName::Email(s) => {
                    builder.email(s);
                }
                GeneralName::Other(s) => {
                    // OpenSSL's builder has no generic "other name" entry
                    // point; fall back to a DNS entry for round-tripping
                    // rather than silently dropping the SAN.
                    builder.dns(s);
                }
            }
        }
        if critical {
            builder.critical();
        }
        builder.build(ctx)
    }

    /// Read the SAN list out of a parsed certificate's extension, mapping
    /// each `openssl::x509::GeneralNameRef` to our sum type. Returns an
    /// empty list if the extension is absent -- this never fails, per
    /// spec.md §4.1.
    pub fn from_stack(stack: &openssl::stack::StackRef<OpenSslGeneralName>) -> Self {
        let mut out = Vec::with_capacity(stack.len());
        for entry in stack {
            if let Some(dns) = entry.dnsname() {
                out.push(GeneralName::DnsName(dns.to_string()));
            } else if let Some(email) = entry.email() {
                out.push(GeneralName::Email(email.to_string()));
            } else if let Some(uri) = entry.uri() {
                out.push(GeneralName::Uri(uri.to_string()));
            } else if let Some(ip) = entry.ipaddress() {
                match ip.len() {
                    4 => {
                        let octets: [u8; 4] = [ip[0], ip[1], ip[2], ip[3]];
                        out.push(GeneralName::IpAddress(IpAddr::from(octets)));
                    }
                    16 => {
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(ip);
                        out.push(GeneralName::IpAddress(IpAddr::from(octets)));
                    }
                    _ => out.push(GeneralName::Other(format!("{:?}", ip))),
                }
            } else {
                out.push(GeneralName::Other("unrecognized general name".to_string()));
            }
        }
        GeneralNameList(out)
    }
}

impl PartialEq for GeneralNameList {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for GeneralNameList {}

impl std::hash::Hash for GeneralNameList {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state)
    }
}

impl FromIterator<GeneralName> for GeneralNameList {
    fn from_iter<T: IntoIterator<Item = GeneralName>>(iter: T) -> Self {
        GeneralNameList(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asterisk_forms_never_yield_bare_star() {
        assert_eq!(
            asterisk_forms_str("a.b.c"),
            vec!["a.b.c", "*.b.c", "*.c"]
        );
        assert_eq!(asterisk_forms_str("a"), vec!["a"]);
        for form in asterisk_forms_str("a.b.c.d") {
            assert_ne!(form, "*");
        }
    }

    #[test]
    fn non_dns_names_yield_single_form() {
        let ip = GeneralName::IpAddress("127.0.0.1".parse().unwrap());
        assert_eq!(ip.asterisk_forms(), vec!["127.0.0.1".to_string()]);
    }

    #[test]
    fn equality_is_order_independent() {
        let a = GeneralNameList::new(vec![
            GeneralName::DnsName("a.com".into()),
            GeneralName::DnsName("b.com".into()),
        ]);
        let b = GeneralNameList::new(vec![
            GeneralName::DnsName("b.com".into()),
            GeneralName::DnsName("a.com".into()),
        ]);
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
