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

//! The [`LocalTracking`] structure.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use log::debug;

use super::confine;
use crate::platform::{Error, ErrorKind, Result, Tracking};

/// A [`Tracking`] implementation that keeps one directory per
/// experiment. Experiment names are path-like
/// (`/Users/{identity}/{experiment}`) and map to nested directories.
#[derive(Debug)]
pub struct LocalTracking {
    root: PathBuf,
    active: Mutex<Option<String>>,
}

impl LocalTracking {
    /// Creates a new `LocalTracking` over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: Mutex::new(None),
        }
    }

    /// Returns the name of the active experiment, if one has been set.
    pub fn active_experiment(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the directory of the experiment `name`.
    pub fn experiment_dir(&self, name: &str) -> Result<PathBuf> {
        if !name.starts_with('/') {
            return Err(Error::new(name, ErrorKind::InvalidPath));
        }
        confine(&self.root, name).ok_or_else(|| Error::new(name, ErrorKind::InvalidPath))
    }
}

impl Tracking for LocalTracking {
    fn set_experiment(&self, name: &str) -> Result<()> {
        let dir = self.experiment_dir(name)?;
        if !dir.is_dir() {
            debug!("Creating experiment {}.", name);
            fs::create_dir_all(&dir).map_err(|e| Error::from_io(name, e))?;
        }
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_owned());
        Ok(())
    }
}
