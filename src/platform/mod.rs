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

//! Capability traits for the services an environment is built on.
//!
//! An analytics workspace is assembled from several external services:
//!
//! * a workspace file system ([`Storage`]) and a way to ship files to
//!   every worker of the compute cluster ([`Cluster`]);
//! * a SQL engine session that executes [`Statement`]s
//!   ([`SqlSession`]) and keeps a catalog of query functions
//!   ([`FunctionCatalog`]);
//! * a model store that loads trained models ([`ModelStore`]) and a
//!   model registry ([`ModelRegistry`]); and
//! * an experiment tracking service ([`Tracking`]).
//!
//! None of them are implemented by this crate, except for testing and
//! local use (see the [`local`] module). The [`Platform`] trait bundles
//! one implementation of each so that an
//! [`Environment`](crate::Environment) can be generic over a single type
//! parameter. A type may implement several capabilities and return
//! itself from more than one [`Platform`] accessor.
//!
//! ## Paths
//!
//! Storage paths are strings. Paths prefixed with `dbfs:`, or with no
//! prefix at all, refer to the shared workspace file system. Paths
//! prefixed with `file:` refer to the local disk of the driver. See
//! [`Scheme::split`].

use std::fmt;
use std::sync::Arc;

mod error;
#[cfg(feature = "local")]
pub mod local;

pub use error::{Error, ErrorKind, Result};

////////////////////////////////////////////////////////////////////////
// FILE SYSTEM                                                        //
////////////////////////////////////////////////////////////////////////

/// The file systems that a storage path may address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scheme {
    /// The shared workspace file system.
    Dbfs,

    /// The driver's local disk.
    File,
}

impl Scheme {
    /// Splits a storage path into its [`Scheme`] and the remaining
    /// path. A path without a recognized prefix is a [`Scheme::Dbfs`]
    /// path.
    ///
    /// ```
    /// use dnslab::platform::Scheme;
    ///
    /// assert_eq!(Scheme::split("dbfs:/a/b"), (Scheme::Dbfs, "/a/b"));
    /// assert_eq!(Scheme::split("/a/b"), (Scheme::Dbfs, "/a/b"));
    /// assert_eq!(Scheme::split("file:/tmp/x"), (Scheme::File, "/tmp/x"));
    /// ```
    pub fn split(path: &str) -> (Self, &str) {
        if let Some(rest) = path.strip_prefix("dbfs:") {
            (Self::Dbfs, rest)
        } else if let Some(rest) = path.strip_prefix("file:") {
            (Self::File, rest)
        } else {
            (Self::Dbfs, path)
        }
    }
}

/// Operations on the workspace file system.
pub trait Storage {
    /// Creates the directory at `path` along with any missing parents.
    /// Succeeds if the directory already exists.
    fn mkdirs(&self, path: &str) -> Result<()>;

    /// Returns whether anything exists at `path`. Only a definite
    /// "not found" yields `Ok(false)`; every other failure (permissions,
    /// connectivity, and so on) is an error.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Copies the file at `from` to `to`, creating parent directories of
    /// `to` as needed and replacing any existing file.
    fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Removes `path` and, if it is a directory, everything below it.
    /// Returns whether anything was removed.
    fn remove_all(&self, path: &str) -> Result<bool>;
}

/// Operations on the compute cluster.
pub trait Cluster {
    /// Distributes the file at `path` to every worker, so that it is
    /// available locally to tasks.
    fn add_file(&self, path: &str) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////
// SQL ENGINE                                                         //
////////////////////////////////////////////////////////////////////////

/// The statements that an environment issues against a SQL engine.
///
/// The [`Display`](fmt::Display) implementation renders the statement
/// as SQL text.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Statement {
    /// Create a database if it does not exist yet.
    CreateDatabase(String),

    /// Make a database the session's current database.
    UseDatabase(String),

    /// Drop a database and everything in it, if it exists.
    DropDatabase(String),

    /// Set a session configuration option.
    SetConf { key: String, value: String },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CreateDatabase(name) => write!(f, "create database if not exists {}", name),
            Self::UseDatabase(name) => write!(f, "use {}", name),
            Self::DropDatabase(name) => write!(f, "drop database if exists {} cascade", name),
            Self::SetConf { key, value } => write!(f, "set {}={}", key, value),
        }
    }
}

/// A SQL engine session.
pub trait SqlSession {
    /// Executes `statement`.
    fn execute(&self, statement: &Statement) -> Result<()>;

    /// Returns whether the database `name` exists.
    fn database_exists(&self, name: &str) -> Result<bool>;
}

/// A function callable from queries. Query functions map a string to a
/// string.
pub type UserFunction = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The SQL engine's catalog of query functions.
pub trait FunctionCatalog {
    /// Makes `function` callable from queries under `name`, replacing
    /// any function already registered under that name.
    fn register(&self, name: &str, function: UserFunction) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////
// MODELS AND TRACKING                                                //
////////////////////////////////////////////////////////////////////////

/// A loaded classification model.
pub trait Model {
    /// Classifies `input`, returning its label.
    fn predict(&self, input: &str) -> String;
}

/// Loads models from storage.
pub trait ModelStore {
    /// The type of model this store loads.
    type Model: Model + Send + Sync + 'static;

    /// Loads the model stored at `path`.
    fn load_model(&self, path: &str) -> Result<Self::Model>;
}

/// A registry of named models.
pub trait ModelRegistry {
    /// Deletes the model registered as `name`. Fails with
    /// [`ErrorKind::NotFound`] if there is no such model.
    fn delete_registered_model(&self, name: &str) -> Result<()>;
}

/// An experiment tracking service.
pub trait Tracking {
    /// Makes `name` the active experiment, creating it if needed.
    fn set_experiment(&self, name: &str) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////
// PLATFORM BUNDLE                                                    //
////////////////////////////////////////////////////////////////////////

/// A bundle of one implementation of each capability.
pub trait Platform {
    type Storage: Storage;
    type Cluster: Cluster;
    type Session: SqlSession;
    type Functions: FunctionCatalog;
    type Models: ModelStore;
    type Registry: ModelRegistry;
    type Tracking: Tracking;

    fn storage(&self) -> &Self::Storage;
    fn cluster(&self) -> &Self::Cluster;
    fn session(&self) -> &Self::Session;
    fn functions(&self) -> &Self::Functions;
    fn models(&self) -> &Self::Models;
    fn registry(&self) -> &Self::Registry;
    fn tracking(&self) -> &Self::Tracking;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_render_as_sql() {
        assert_eq!(
            Statement::CreateDatabase("alice_dns".into()).to_string(),
            "create database if not exists alice_dns",
        );
        assert_eq!(
            Statement::UseDatabase("alice_dns".into()).to_string(),
            "use alice_dns",
        );
        assert_eq!(
            Statement::DropDatabase("alice_dns".into()).to_string(),
            "drop database if exists alice_dns cascade",
        );
        assert_eq!(
            Statement::SetConf {
                key: "a.b".into(),
                value: "true".into()
            }
            .to_string(),
            "set a.b=true",
        );
    }

    #[test]
    fn scheme_split_only_strips_known_prefixes() {
        assert_eq!(Scheme::split("s3:/bucket"), (Scheme::Dbfs, "s3:/bucket"));
        assert_eq!(Scheme::split("file:relative"), (Scheme::File, "relative"));
    }
}
