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

//! Implementation of the crate-level [`Error`] type.

use std::fmt;

use crate::platform;
use crate::policy::Operation;

/// An error reported by an [`Environment`](crate::Environment)
/// operation. It records which [`Operation`] failed and the underlying
/// [`platform::Error`], which is also available through
/// [`source`](std::error::Error::source).
#[derive(Debug)]
pub struct Error {
    operation: Operation,
    source: platform::Error,
}

impl Error {
    /// Creates a new `Error`.
    pub fn new(operation: Operation, source: platform::Error) -> Self {
        Self { operation, source }
    }

    /// Returns the operation that failed.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the platform error that caused the failure.
    pub fn platform_error(&self) -> &platform::Error {
        &self.source
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to {}", self.operation)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A result type for [`Environment`](crate::Environment) operations.
pub type Result<T> = std::result::Result<T, Error>;
