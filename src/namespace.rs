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

//! Derivation of per-user namespaces from identity strings.
//!
//! Every resource this crate provisions is scoped by a [`Namespace`],
//! a sanitized form of the user's [`Identity`]. The derivation is a
//! pure function: the same identity always yields the same namespace,
//! and hence the same scratch path, database name, and model name.

use std::fmt;
use std::str::FromStr;

////////////////////////////////////////////////////////////////////////
// IDENTITIES                                                         //
////////////////////////////////////////////////////////////////////////

/// The raw identifier of the user on whose behalf resources are
/// provisioned, usually an e-mail address.
///
/// An `Identity` is supplied explicitly by the caller when an
/// [`Environment`](crate::Environment) is created; it is never looked
/// up from ambient state. It is used verbatim only in the experiment
/// name. Everything else is scoped by the derived [`Namespace`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Identity(String);

impl Identity {
    /// Creates a new `Identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Returns the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the [`Namespace`] for this identity.
    pub fn namespace(&self) -> Namespace {
        Namespace(user_prefix(&self.0))
    }
}

impl FromStr for Identity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// NAMESPACES                                                         //
////////////////////////////////////////////////////////////////////////

/// A sanitized, per-user string used to scope storage paths, database
/// names, and model names.
///
/// A `Namespace` only ever contains ASCII letters, digits, and
/// underscores. It is obtained through [`Identity::namespace`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Namespace(String);

impl Namespace {
    /// Returns the namespace string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the scratch path for this namespace. See
    /// [`default_path`].
    pub fn default_path(&self) -> String {
        default_path(self.as_str())
    }

    /// Returns the scratch database name for this namespace. See
    /// [`default_database`].
    pub fn default_database(&self) -> String {
        default_database(self.as_str())
    }

    /// Returns the name under which this namespace's DGA model is
    /// registered. See [`registered_model_name`].
    pub fn registered_model_name(&self) -> String {
        registered_model_name(self.as_str())
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// DERIVATION FUNCTIONS                                               //
////////////////////////////////////////////////////////////////////////

/// Computes the namespace string for an identity string.
///
/// Anything from the first `@` onward is stripped, and then every
/// character outside `[A-Za-z0-9_]` is replaced by `_`. An identity that
/// begins with `@` has no local part to keep, so it is sanitized whole.
/// So is an identity with a line break after its `@`, unless that line
/// break is the last character, in which case it is kept after the
/// local part. The result is empty only if `identity` is empty.
///
/// ```
/// use dnslab::namespace::user_prefix;
///
/// assert_eq!(user_prefix("alice@example.com"), "alice");
/// assert_eq!(user_prefix("a.b+c@x.com"), "a_b_c");
/// assert_eq!(user_prefix("a@b\nc"), "a_b_c");
/// ```
pub fn user_prefix(identity: &str) -> String {
    match identity.find('@') {
        Some(0) | None => sanitize(identity.chars()),
        Some(at) => {
            let (domain, trailing) = match identity[at..].strip_suffix('\n') {
                Some(domain) => (domain, "\n"),
                None => (&identity[at..], ""),
            };
            if domain.contains('\n') {
                sanitize(identity.chars())
            } else {
                sanitize(identity[..at].chars().chain(trailing.chars()))
            }
        }
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` by `_`.
fn sanitize(chars: impl Iterator<Item = char>) -> String {
    chars
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Returns the scratch path, `/tmp/{namespace}/dns_analytics`.
pub fn default_path(namespace: &str) -> String {
    format!("/tmp/{}/dns_analytics", namespace)
}

/// Returns the scratch database name, `{namespace}_dns`.
pub fn default_database(namespace: &str) -> String {
    format!("{}_dns", namespace)
}

/// Returns the registered model name, `{namespace}_dns_dga`.
pub fn registered_model_name(namespace: &str) -> String {
    format!("{}_dns_dga", namespace)
}

/// Returns the experiment name, `/Users/{identity}/dns_analytics_experiment`.
/// Note that this uses the raw identity, not the namespace.
pub fn experiment_name(identity: &Identity) -> String {
    format!("/Users/{}/dns_analytics_experiment", identity.as_str())
}
