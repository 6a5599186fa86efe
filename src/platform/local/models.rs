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

//! The [`LocalModelStore`] and [`LocalModelRegistry`] structures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{confine, LocalStorage};
use crate::dga::DgaModel;
use crate::platform::{Error, ErrorKind, ModelRegistry, ModelStore, Result};

/// The file within a model directory that holds the model.
pub const MODEL_FILE: &str = "model.toml";

/// A [`ModelStore`] that loads [`DgaModel`]s from model directories in
/// a [`LocalStorage`].
#[derive(Clone, Debug)]
pub struct LocalModelStore {
    storage: LocalStorage,
}

impl LocalModelStore {
    /// Creates a new `LocalModelStore` that reads through `storage`.
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }
}

impl ModelStore for LocalModelStore {
    type Model = DgaModel;

    fn load_model(&self, path: &str) -> Result<DgaModel> {
        let file = self.storage.resolve(path)?.join(MODEL_FILE);
        let bytes = fs::read(&file).map_err(|e| Error::from_io(path, e))?;
        DgaModel::from_toml(&bytes)
            .map_err(|e| Error::new(path, ErrorKind::InvalidModel(e.to_string())))
    }
}

/// A [`ModelRegistry`] over a local directory.
///
/// Each registered model is a directory named after the model, holding
/// one numbered subdirectory per version.
#[derive(Clone, Debug)]
pub struct LocalModelRegistry {
    root: PathBuf,
}

impl LocalModelRegistry {
    /// Creates a new `LocalModelRegistry` over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registers a new version of the model `name` by copying the model
    /// file from the model directory `source`. Returns the new version
    /// number, starting from 1.
    pub fn register_model(&self, name: &str, source: &Path) -> Result<u32> {
        let model_dir = self.model_dir(name)?;
        let version = self
            .versions(name)?
            .last()
            .map_or(1, |latest| latest + 1);
        let version_dir = model_dir.join(version.to_string());
        fs::create_dir_all(&version_dir).map_err(|e| Error::from_io(name, e))?;
        fs::copy(source.join(MODEL_FILE), version_dir.join(MODEL_FILE))
            .map_err(|e| Error::from_io(source.display().to_string(), e))?;
        info!("Registered version {} of model {}.", version, name);
        Ok(version)
    }

    /// Returns the registered versions of the model `name` in ascending
    /// order. A model that is not registered has no versions.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(self.model_dir(name)?) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::from_io(name, e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::from_io(name, e))?;
            if let Some(version) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn model_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.starts_with('.') || name.contains('/') {
            return Err(Error::new(name, ErrorKind::InvalidPath));
        }
        confine(&self.root, name).ok_or_else(|| Error::new(name, ErrorKind::InvalidPath))
    }
}

impl ModelRegistry for LocalModelRegistry {
    fn delete_registered_model(&self, name: &str) -> Result<()> {
        let model_dir = self.model_dir(name)?;
        debug!("Deleting registered model {}.", name);
        fs::remove_dir_all(model_dir).map_err(|e| Error::from_io(name, e))
    }
}
