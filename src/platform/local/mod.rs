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

//! A [`Platform`] implemented over the local file system.
//!
//! [`LocalPlatform`] stands in for the managed services of a real
//! workspace, which makes it useful for development, for demos on a
//! single machine, and for testing. Each capability keeps its state in
//! its own directory, configured by a [`LocalConfig`]:
//!
//! | Capability          | Implementation           | State                      |
//! |---------------------|--------------------------|----------------------------|
//! | [`Storage`]         | [`LocalStorage`]         | `dbfs_root`, `file_root`   |
//! | [`Cluster`]         | [`LocalCluster`]         | `worker_root`              |
//! | [`SqlSession`]      | [`LocalWarehouse`]       | `warehouse_root`           |
//! | [`FunctionCatalog`] | [`MemoryCatalog`]        | in memory                  |
//! | [`ModelStore`]      | [`LocalModelStore`]      | read through `LocalStorage`|
//! | [`ModelRegistry`]   | [`LocalModelRegistry`]   | `registry_root`            |
//! | [`Tracking`]        | [`LocalTracking`]        | `tracking_root`            |
//!
//! [`Storage`]: crate::platform::Storage
//! [`Cluster`]: crate::platform::Cluster
//! [`SqlSession`]: crate::platform::SqlSession
//! [`FunctionCatalog`]: crate::platform::FunctionCatalog
//! [`ModelStore`]: crate::platform::ModelStore
//! [`ModelRegistry`]: crate::platform::ModelRegistry
//! [`Tracking`]: crate::platform::Tracking

use std::path::{Component, Path, PathBuf};

use super::Platform;

mod catalog;
mod models;
mod storage;
mod tracking;
mod warehouse;

pub use catalog::MemoryCatalog;
pub use models::{LocalModelRegistry, LocalModelStore, MODEL_FILE};
pub use storage::{LocalCluster, LocalStorage};
pub use tracking::LocalTracking;
pub use warehouse::LocalWarehouse;

/// The directories used by a [`LocalPlatform`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalConfig {
    pub dbfs_root: PathBuf,
    pub file_root: PathBuf,
    pub warehouse_root: PathBuf,
    pub worker_root: PathBuf,
    pub tracking_root: PathBuf,
    pub registry_root: PathBuf,
}

impl LocalConfig {
    /// Returns a configuration that keeps everything in subdirectories
    /// of `root`. Note that `file:` paths are also confined to `root`
    /// rather than addressing the real local disk.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            dbfs_root: root.join("dbfs"),
            file_root: root.join("local"),
            warehouse_root: root.join("warehouse"),
            worker_root: root.join("workers"),
            tracking_root: root.join("tracking"),
            registry_root: root.join("registry"),
        }
    }
}

/// A [`Platform`] whose capabilities are all implemented locally. See
/// the [module-level documentation](self).
#[derive(Debug)]
pub struct LocalPlatform {
    storage: LocalStorage,
    cluster: LocalCluster,
    warehouse: LocalWarehouse,
    catalog: MemoryCatalog,
    models: LocalModelStore,
    registry: LocalModelRegistry,
    tracking: LocalTracking,
}

impl LocalPlatform {
    /// Creates a new `LocalPlatform` with the given configuration. No
    /// directories are created until they are needed.
    pub fn new(config: &LocalConfig) -> Self {
        let storage = LocalStorage::new(&config.dbfs_root, &config.file_root);
        Self {
            cluster: LocalCluster::new(storage.clone(), &config.worker_root),
            warehouse: LocalWarehouse::new(&config.warehouse_root),
            catalog: MemoryCatalog::new(),
            models: LocalModelStore::new(storage.clone()),
            registry: LocalModelRegistry::new(&config.registry_root),
            tracking: LocalTracking::new(&config.tracking_root),
            storage,
        }
    }
}

impl Platform for LocalPlatform {
    type Storage = LocalStorage;
    type Cluster = LocalCluster;
    type Session = LocalWarehouse;
    type Functions = MemoryCatalog;
    type Models = LocalModelStore;
    type Registry = LocalModelRegistry;
    type Tracking = LocalTracking;

    fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    fn cluster(&self) -> &LocalCluster {
        &self.cluster
    }

    fn session(&self) -> &LocalWarehouse {
        &self.warehouse
    }

    fn functions(&self) -> &MemoryCatalog {
        &self.catalog
    }

    fn models(&self) -> &LocalModelStore {
        &self.models
    }

    fn registry(&self) -> &LocalModelRegistry {
        &self.registry
    }

    fn tracking(&self) -> &LocalTracking {
        &self.tracking
    }
}

/// Joins `path` onto `root`, ignoring root and `.` components. Returns
/// [`None`] if `path` has `..` or prefix components, which could
/// escape `root`.
fn confine(root: &Path, path: &str) -> Option<PathBuf> {
    let mut local = root.to_path_buf();
    for component in Path::new(path).components() {
        match component {
            Component::RootDir | Component::CurDir => (),
            Component::Normal(part) => local.push(part),
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    Some(local)
}
