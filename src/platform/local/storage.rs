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

//! The [`LocalStorage`] and [`LocalCluster`] structures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::confine;
use crate::platform::{Cluster, Error, ErrorKind, Result, Scheme, Storage};

/// A [`Storage`] implementation over two local directories: one stands
/// in for the workspace file system (`dbfs:` paths) and one for the
/// driver's local disk (`file:` paths).
#[derive(Clone, Debug)]
pub struct LocalStorage {
    dbfs_root: PathBuf,
    file_root: PathBuf,
}

impl LocalStorage {
    /// Creates a new `LocalStorage`.
    pub fn new(dbfs_root: impl Into<PathBuf>, file_root: impl Into<PathBuf>) -> Self {
        Self {
            dbfs_root: dbfs_root.into(),
            file_root: file_root.into(),
        }
    }

    /// Maps a storage path to a local path. Storage paths must be
    /// absolute and must not contain `..` components.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let (scheme, rest) = Scheme::split(path);
        if !rest.starts_with('/') {
            return Err(Error::new(path, ErrorKind::InvalidPath));
        }
        let root = match scheme {
            Scheme::Dbfs => &self.dbfs_root,
            Scheme::File => &self.file_root,
        };
        confine(root, rest).ok_or_else(|| Error::new(path, ErrorKind::InvalidPath))
    }
}

impl Storage for LocalStorage {
    fn mkdirs(&self, path: &str) -> Result<()> {
        let local = self.resolve(path)?;
        fs::create_dir_all(&local).map_err(|e| Error::from_io(path, e))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let local = self.resolve(path)?;
        match fs::symlink_metadata(&local) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::from_io(path, e)),
        }
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let local_from = self.resolve(from)?;
        let local_to = self.resolve(to)?;
        if let Some(parent) = local_to.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::from_io(to, e))?;
        }
        debug!("Copying {} to {}.", from, to);
        fs::copy(&local_from, &local_to)
            .map(|_| ())
            .map_err(|e| Error::from_io(from, e))
    }

    fn remove_all(&self, path: &str) -> Result<bool> {
        let local = self.resolve(path)?;
        let metadata = match fs::symlink_metadata(&local) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::from_io(path, e)),
        };
        let result = if metadata.is_dir() {
            fs::remove_dir_all(&local)
        } else {
            fs::remove_file(&local)
        };
        result.map(|_| true).map_err(|e| Error::from_io(path, e))
    }
}

/// A [`Cluster`] implementation that "distributes" files by copying
/// them into a single worker directory, keyed by file name.
#[derive(Clone, Debug)]
pub struct LocalCluster {
    storage: LocalStorage,
    worker_root: PathBuf,
}

impl LocalCluster {
    /// Creates a new `LocalCluster` that reads files through `storage`.
    pub fn new(storage: LocalStorage, worker_root: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            worker_root: worker_root.into(),
        }
    }

    /// Returns the local path at which workers find a distributed file
    /// with the given name.
    pub fn worker_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.worker_root.join(file_name)
    }
}

impl Cluster for LocalCluster {
    fn add_file(&self, path: &str) -> Result<()> {
        let local = self.storage.resolve(path)?;
        let file_name = local
            .file_name()
            .ok_or_else(|| Error::new(path, ErrorKind::InvalidPath))?;
        fs::create_dir_all(&self.worker_root)
            .map_err(|e| Error::from_io(self.worker_root.display().to_string(), e))?;
        fs::copy(&local, self.worker_root.join(file_name))
            .map(|_| ())
            .map_err(|e| Error::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir.join("dbfs"), dir.join("local"))
    }

    #[test]
    fn resolve_maps_schemes_to_roots() {
        let storage = LocalStorage::new("/d", "/f");
        assert_eq!(storage.resolve("dbfs:/a/b").unwrap(), Path::new("/d/a/b"));
        assert_eq!(storage.resolve("/a/b").unwrap(), Path::new("/d/a/b"));
        assert_eq!(storage.resolve("file:/tmp/x").unwrap(), Path::new("/f/tmp/x"));
    }

    #[test]
    fn resolve_rejects_escapes_and_relative_paths() {
        let storage = LocalStorage::new("/d", "/f");
        for path in ["/a/../../etc", "relative", "file:relative", "dbfs:"] {
            let error = storage.resolve(path).unwrap_err();
            assert!(matches!(error.kind(), ErrorKind::InvalidPath), "{}", path);
        }
    }

    #[test]
    fn mkdirs_exists_and_remove_all_work() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        assert!(!storage.exists("/tmp/a/b").unwrap());
        storage.mkdirs("/tmp/a/b").unwrap();
        storage.mkdirs("/tmp/a/b").unwrap();
        assert!(storage.exists("/tmp/a/b").unwrap());
        assert!(storage.exists("dbfs:/tmp/a").unwrap());
        assert!(!storage.exists("file:/tmp/a").unwrap());

        assert!(storage.remove_all("/tmp/a").unwrap());
        assert!(!storage.exists("/tmp/a/b").unwrap());
        assert!(!storage.remove_all("/tmp/a").unwrap());
    }

    #[test]
    fn copy_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        storage.mkdirs("/src").unwrap();
        fs::write(storage.resolve("/src/f.bin").unwrap(), b"one").unwrap();

        storage.copy("/src/f.bin", "/dst/deep/g.bin").unwrap();
        assert_eq!(fs::read(storage.resolve("/dst/deep/g.bin").unwrap()).unwrap(), b"one");

        fs::write(storage.resolve("/src/f.bin").unwrap(), b"two").unwrap();
        storage.copy("/src/f.bin", "/dst/deep/g.bin").unwrap();
        assert_eq!(fs::read(storage.resolve("/dst/deep/g.bin").unwrap()).unwrap(), b"two");
    }

    #[test]
    fn copy_of_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let error = storage.copy("/nope", "/dst").unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(error.target(), "/nope");
    }

    #[test]
    fn add_file_copies_into_worker_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        storage.mkdirs("/data").unwrap();
        fs::write(storage.resolve("/data/geo.mmdb").unwrap(), b"geo").unwrap();

        let cluster = LocalCluster::new(storage, dir.path().join("workers"));
        cluster.add_file("dbfs:/data/geo.mmdb").unwrap();
        assert_eq!(fs::read(cluster.worker_path("geo.mmdb")).unwrap(), b"geo");
        assert!(cluster.add_file("/data/missing.mmdb").unwrap_err().is_not_found());
    }
}
