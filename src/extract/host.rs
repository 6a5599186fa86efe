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

//! Lenient extraction of the host from URI-like strings.

/// The host part of a URI-like string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Host<'a> {
    /// A (possibly invalid) domain name or IPv4 address, without any
    /// trailing dots.
    Name(&'a str),

    /// The contents of a bracketed IPv6 literal.
    Ipv6(&'a str),
}

/// Finds the host in `uri`.
///
/// Inputs need not be well-formed URIs: DNS logs and threat feeds mix
/// bare names (`example.com`), names with paths (`example.com/x`), and
/// full URLs. The scheme (`http://`, or a bare `//`), path, query,
/// fragment, user information, and port are all stripped if present.
pub fn parse(uri: &str) -> Host<'_> {
    let rest = strip_scheme(uri.trim());
    let authority = match rest.find(|c| matches!(c, '/' | '?' | '#')) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let host_and_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    if let Some(bracketed) = host_and_port.strip_prefix('[') {
        let end = bracketed.find(']').unwrap_or(bracketed.len());
        return Host::Ipv6(&bracketed[..end]);
    }

    let host = match host_and_port.find(':') {
        Some(colon) => &host_and_port[..colon],
        None => host_and_port,
    };
    Host::Name(host.trim_end_matches('.'))
}

/// Strips a leading `scheme://` or `//` from `s`. Scheme characters are
/// ASCII letters, digits, `+`, `-`, and `.`.
fn strip_scheme(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix("//") {
        return rest;
    }
    if let Some(colon) = s.find("://") {
        let scheme = &s[..colon];
        if !scheme.is_empty()
            && scheme
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        {
            return &s[colon + 3..];
        }
    }
    s
}
