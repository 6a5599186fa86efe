// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Decomposition of URIs into subdomain, domain, and public suffix.
//!
//! A domain name such as `foo.bar.example.co.uk` is split according to
//! the [Public Suffix List] into
//!
//! * the public suffix (`co.uk`), under which anyone may register
//!   names;
//! * the domain (`example`), the single label registered under the
//!   suffix; and
//! * the subdomain (`foo.bar`), everything to the left.
//!
//! The domain and suffix together form the registered domain
//! (`example.co.uk`). The list itself is supplied by the [`psl`] crate.
//!
//! The [`registered_domain_extract`] and [`domain_extract`] functions
//! are registered as query functions under those same names. Both
//! return a single space (`" "`) when the input has no recognized public
//! suffix (for instance, `localhost` or an IP address). Downstream
//! queries match on that exact value.
//!
//! [Public Suffix List]: https://publicsuffix.org/

use psl::Type;

mod host;

pub use host::Host;

/// The result returned by the domain functions for inputs without a
/// recognized public suffix.
pub const NO_SUFFIX: &str = " ";

////////////////////////////////////////////////////////////////////////
// EXTRACTED PARTS                                                    //
////////////////////////////////////////////////////////////////////////

/// The parts of a host name, borrowed from the input. Parts that are
/// absent are empty. Case is preserved from the input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Extracted<'a> {
    pub subdomain: &'a str,
    pub domain: &'a str,
    pub suffix: &'a str,
}

impl Extracted<'_> {
    /// Returns the registered domain (`{domain}.{suffix}`), or an empty
    /// string if either part is missing.
    pub fn registered_domain(&self) -> String {
        if self.domain.is_empty() || self.suffix.is_empty() {
            String::new()
        } else {
            format!("{}.{}", self.domain, self.suffix)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// EXTRACTOR                                                          //
////////////////////////////////////////////////////////////////////////

/// Splits hosts according to the Public Suffix List.
///
/// The list has an ICANN section and a private section; the latter
/// holds suffixes such as `blogspot.com` that are operated by private
/// companies. By default only ICANN suffixes are recognized, so
/// `foo.blogspot.com` has the domain `blogspot`. Setting
/// `include_private_suffixes` makes `foo` the domain instead.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Extractor {
    pub include_private_suffixes: bool,
}

impl Extractor {
    /// Splits the host of `uri` into its parts.
    pub fn extract<'a>(&self, uri: &'a str) -> Extracted<'a> {
        let name = match host::parse(uri) {
            Host::Name(name) => name,
            Host::Ipv6(_) => return Extracted::default(),
        };

        // The list is all lowercase. ASCII lowercasing keeps byte
        // offsets, so lengths found in the lowercase copy apply to
        // `name` as well.
        let lowercase = name.to_ascii_lowercase();
        let suffix_len = match self.suffix_len(&lowercase) {
            Some(len) => len,
            None => return Extracted::default(),
        };

        let suffix = &name[name.len() - suffix_len..];
        let before = &name[..name.len() - suffix_len];
        let before = before.strip_suffix('.').unwrap_or(before);
        let (subdomain, domain) = match before.rfind('.') {
            Some(dot) => (&before[..dot], &before[dot + 1..]),
            None => ("", before),
        };
        Extracted {
            subdomain,
            domain,
            suffix,
        }
    }

    /// Returns the registered domain of `uri`, or [`NO_SUFFIX`] if it
    /// has no recognized public suffix.
    pub fn registered_domain_extract(&self, uri: &str) -> String {
        let extracted = self.extract(uri);
        if extracted.suffix.is_empty() {
            NO_SUFFIX.to_owned()
        } else {
            extracted.registered_domain()
        }
    }

    /// Returns the domain label of `uri` (without its suffix), or
    /// [`NO_SUFFIX`] if it has no recognized public suffix.
    pub fn domain_extract(&self, uri: &str) -> String {
        let extracted = self.extract(uri);
        if extracted.suffix.is_empty() {
            NO_SUFFIX.to_owned()
        } else {
            extracted.domain.to_owned()
        }
    }

    /// Finds the length of the public suffix of `name`, which must be
    /// lowercase.
    fn suffix_len(&self, name: &str) -> Option<usize> {
        let suffix = psl::suffix(name.as_bytes())?;
        if !suffix.is_known() {
            return None;
        } else if self.include_private_suffixes || suffix.typ() == Some(Type::Icann) {
            return Some(suffix.as_bytes().len());
        }

        // This is a private suffix. Look for the longest ICANN suffix
        // inside it.
        let mut tail = &name[name.len() - suffix.as_bytes().len()..];
        while let Some(dot) = tail.find('.') {
            tail = &tail[dot + 1..];
            if let Some(candidate) = psl::suffix(tail.as_bytes()) {
                if candidate.is_known()
                    && candidate.typ() == Some(Type::Icann)
                    && candidate.as_bytes().len() == tail.len()
                {
                    return Some(tail.len());
                }
            }
        }
        None
    }
}

////////////////////////////////////////////////////////////////////////
// QUERY FUNCTIONS                                                    //
////////////////////////////////////////////////////////////////////////

/// Returns the registered domain of `uri` using the default
/// [`Extractor`].
///
/// ```
/// use dnslab::registered_domain_extract;
///
/// assert_eq!(registered_domain_extract("http://foo.bar.example.co.uk/x"), "example.co.uk");
/// assert_eq!(registered_domain_extract("http://localhost/x"), " ");
/// ```
pub fn registered_domain_extract(uri: &str) -> String {
    Extractor::default().registered_domain_extract(uri)
}

/// Returns the domain label of `uri` using the default [`Extractor`].
///
/// ```
/// use dnslab::domain_extract;
///
/// assert_eq!(domain_extract("http://foo.bar.example.co.uk/x"), "example");
/// ```
pub fn domain_extract(uri: &str) -> String {
    Extractor::default().domain_extract(uri)
}
