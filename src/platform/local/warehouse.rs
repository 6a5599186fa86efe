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

//! The [`LocalWarehouse`] structure.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::platform::{Error, Result, SqlSession, Statement};

/// A [`SqlSession`] over a directory of databases.
///
/// Each database is a directory named `{name}.db` in the warehouse
/// root, so databases (and their contents) persist across sessions,
/// while the current database and configuration options belong to the
/// session. As in most SQL engines, database names are
/// case-insensitive.
#[derive(Debug)]
pub struct LocalWarehouse {
    root: PathBuf,
    session: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    current: Option<String>,
    conf: HashMap<String, String>,
}

impl LocalWarehouse {
    /// Creates a new `LocalWarehouse` session over the databases in
    /// `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            session: Mutex::new(SessionState::default()),
        }
    }

    /// Returns the session's current database, if one has been
    /// selected.
    pub fn current_database(&self) -> Option<String> {
        self.state().current.clone()
    }

    /// Returns the value of the session configuration option `key`.
    pub fn conf(&self, key: &str) -> Option<String> {
        self.state().conf.get(key).cloned()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the directory for database `name`, or [`None`] if `name`
    /// is not a valid identifier.
    fn database_dir(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            None
        } else {
            Some(self.root.join(format!("{}.db", name.to_ascii_lowercase())))
        }
    }

    fn checked_database_dir(&self, name: &str) -> Result<PathBuf> {
        self.database_dir(name)
            .ok_or_else(|| Error::backend(name, "invalid database name"))
    }
}

impl SqlSession for LocalWarehouse {
    fn execute(&self, statement: &Statement) -> Result<()> {
        debug!("Executing \"{}\".", statement);
        match statement {
            Statement::CreateDatabase(name) => {
                let dir = self.checked_database_dir(name)?;
                fs::create_dir_all(dir).map_err(|e| Error::from_io(name.as_str(), e))
            }
            Statement::UseDatabase(name) => {
                let dir = self.checked_database_dir(name)?;
                if !dir.is_dir() {
                    return Err(Error::not_found(name.as_str()));
                }
                self.state().current = Some(name.to_ascii_lowercase());
                Ok(())
            }
            Statement::DropDatabase(name) => {
                let dir = self.checked_database_dir(name)?;
                match fs::remove_dir_all(dir) {
                    Ok(()) => (),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => (),
                    Err(e) => return Err(Error::from_io(name.as_str(), e)),
                }
                let mut state = self.state();
                if state.current.as_deref() == Some(name.to_ascii_lowercase().as_str()) {
                    state.current = None;
                }
                Ok(())
            }
            Statement::SetConf { key, value } => {
                self.state().conf.insert(key.clone(), value.clone());
                Ok(())
            }
        }
    }

    fn database_exists(&self, name: &str) -> Result<bool> {
        Ok(self.checked_database_dir(name)?.is_dir())
    }
}
