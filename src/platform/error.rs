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

//! Implementation of the [`Error`] type for platform operations.

use std::fmt;
use std::io;

////////////////////////////////////////////////////////////////////////
// ERROR STRUCTURE                                                    //
////////////////////////////////////////////////////////////////////////

/// Represents a failed call into a platform capability.
///
/// Each error carries the target of the call (a path, database name,
/// model name, and so on) and an [`ErrorKind`] that classifies the
/// failure. Callers that need to tell "not found" apart from other
/// failures should use [`Error::is_not_found`].
#[derive(Debug)]
pub struct Error {
    target: Box<str>,
    kind: ErrorKind,
}

impl Error {
    /// Creates a new `Error`.
    pub fn new(target: impl Into<Box<str>>, kind: ErrorKind) -> Self {
        Self {
            target: target.into(),
            kind,
        }
    }

    /// Creates a new [`ErrorKind::NotFound`] error.
    pub fn not_found(target: impl Into<Box<str>>) -> Self {
        Self::new(target, ErrorKind::NotFound)
    }

    /// Creates a new [`ErrorKind::Backend`] error.
    pub fn backend(target: impl Into<Box<str>>, message: impl Into<String>) -> Self {
        Self::new(target, ErrorKind::Backend(message.into()))
    }

    /// Converts an [`io::Error`] into an `Error`, classifying it by its
    /// [`io::ErrorKind`].
    pub fn from_io(target: impl Into<Box<str>>, io_err: io::Error) -> Self {
        let kind = match io_err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::Io(io_err),
        };
        Self::new(target, kind)
    }

    /// Returns the target of the failed call.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns whether this error means that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::NotFound => write!(f, "{} does not exist", self.target),
            ErrorKind::PermissionDenied => write!(f, "permission denied for {}", self.target),
            ErrorKind::InvalidPath => write!(f, "{} is not a valid path", self.target),
            ErrorKind::InvalidModel(reason) => {
                write!(f, "invalid model at {}: {}", self.target, reason)
            }
            ErrorKind::Io(io_err) => write!(f, "I/O error on {}: {}", self.target, io_err),
            ErrorKind::Backend(message) => write!(f, "{}: {}", self.target, message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(io_err) => Some(io_err),
            _ => None,
        }
    }
}

/// A result type for platform operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// ERROR KINDS                                                        //
////////////////////////////////////////////////////////////////////////

/// Kinds of platform errors.
#[derive(Debug)]
pub enum ErrorKind {
    /// The target does not exist.
    NotFound,

    /// The caller is not allowed to access the target.
    PermissionDenied,

    /// The target path is malformed or escapes its storage root.
    InvalidPath,

    /// A model was found but could not be deserialized.
    InvalidModel(String),

    /// Any other I/O error.
    Io(io::Error),

    /// A failure reported by the backing service.
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_io_classifies_kinds() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(Error::from_io("/a", not_found).is_not_found());

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(
            Error::from_io("/a", denied).kind(),
            ErrorKind::PermissionDenied
        ));

        let other = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let error = Error::from_io("/a", other);
        assert!(!error.is_not_found());
        assert!(matches!(error.kind(), ErrorKind::Io(_)));
    }

    #[test]
    fn display_names_target() {
        assert_eq!(Error::not_found("/x/y").to_string(), "/x/y does not exist");
        assert_eq!(
            Error::backend("alice_dns", "catalog offline").to_string(),
            "alice_dns: catalog offline",
        );
    }
}
