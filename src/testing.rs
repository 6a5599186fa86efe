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

//! An in-memory [`Platform`] that records every call made to it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::platform::{
    self, Cluster, FunctionCatalog, Model, ModelRegistry, ModelStore, Platform, Scheme,
    SqlSession, Statement, Storage, Tracking, UserFunction,
};

/// A call made to a [`Recorder`]. Statements are recorded as SQL text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    Mkdirs(String),
    Exists(String),
    Copy(String, String),
    RemoveAll(String),
    AddFile(String),
    Execute(String),
    DatabaseExists(String),
    Register(String),
    LoadModel(String),
    DeleteModel(String),
    SetExperiment(String),
}

/// A failure to inject into a [`Recorder`] method.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Failure {
    NotFound,
    Denied,
    Backend,
}

/// The observable resources of a [`Recorder`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct State {
    pub paths: BTreeSet<String>,
    pub databases: BTreeSet<String>,
    pub current_database: Option<String>,
    pub models: BTreeSet<String>,
    pub experiment: Option<String>,
}

/// A model that labels its input with the path it was loaded from.
#[derive(Debug)]
pub(crate) struct RecordedModel(String);

impl Model for RecordedModel {
    fn predict(&self, input: &str) -> String {
        format!("{}({})", self.0, input)
    }
}

#[derive(Default)]
pub(crate) struct Recorder {
    calls: Mutex<Vec<Call>>,
    state: Mutex<State>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    functions: Mutex<HashMap<String, UserFunction>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `path` exist.
    pub fn touch(&self, path: &str) {
        lock(&self.state).paths.insert(normalize(path));
    }

    /// Returns whether `path` exists, without recording a call.
    pub fn exists_now(&self, path: &str) -> bool {
        lock(&self.state).paths.contains(&normalize(path))
    }

    /// Makes `name` a registered model.
    pub fn register_model(&self, name: &str) {
        lock(&self.state).models.insert(name.to_owned());
    }

    /// Makes every later call to `method` fail.
    pub fn fail(&self, method: &'static str, failure: Failure) {
        lock(&self.failures).insert(method, failure);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn state(&self) -> State {
        lock(&self.state).clone()
    }

    /// Calls the function registered as `name`.
    pub fn invoke(&self, name: &str, input: &str) -> Option<String> {
        let function = lock(&self.functions).get(name).cloned()?;
        Some(function(input))
    }

    fn record(&self, method: &'static str, call: Call, target: &str) -> platform::Result<()> {
        lock(&self.calls).push(call);
        match lock(&self.failures).get(method) {
            None => Ok(()),
            Some(Failure::NotFound) => Err(platform::Error::not_found(target)),
            Some(Failure::Denied) => Err(platform::Error::new(
                target,
                platform::ErrorKind::PermissionDenied,
            )),
            Some(Failure::Backend) => Err(platform::Error::backend(target, "injected failure")),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Maps `dbfs:/x` and `/x` to the same key.
fn normalize(path: &str) -> String {
    match Scheme::split(path) {
        (Scheme::Dbfs, rest) => rest.to_owned(),
        (Scheme::File, rest) => format!("file:{}", rest),
    }
}

impl Storage for Recorder {
    fn mkdirs(&self, path: &str) -> platform::Result<()> {
        self.record("mkdirs", Call::Mkdirs(path.into()), path)?;
        lock(&self.state).paths.insert(normalize(path));
        Ok(())
    }

    fn exists(&self, path: &str) -> platform::Result<bool> {
        self.record("exists", Call::Exists(path.into()), path)?;
        Ok(self.exists_now(path))
    }

    fn copy(&self, from: &str, to: &str) -> platform::Result<()> {
        self.record("copy", Call::Copy(from.into(), to.into()), from)?;
        if !self.exists_now(from) {
            return Err(platform::Error::not_found(from));
        }
        lock(&self.state).paths.insert(normalize(to));
        Ok(())
    }

    fn remove_all(&self, path: &str) -> platform::Result<bool> {
        self.record("remove_all", Call::RemoveAll(path.into()), path)?;
        let key = normalize(path);
        let prefix = format!("{}/", key);
        let mut state = lock(&self.state);
        let before = state.paths.len();
        state
            .paths
            .retain(|p| *p != key && !p.starts_with(&prefix));
        Ok(state.paths.len() != before)
    }
}

impl Cluster for Recorder {
    fn add_file(&self, path: &str) -> platform::Result<()> {
        self.record("add_file", Call::AddFile(path.into()), path)?;
        if self.exists_now(path) {
            Ok(())
        } else {
            Err(platform::Error::not_found(path))
        }
    }
}

impl SqlSession for Recorder {
    fn execute(&self, statement: &Statement) -> platform::Result<()> {
        let sql = statement.to_string();
        self.record("execute", Call::Execute(sql.clone()), &sql)?;
        let mut state = lock(&self.state);
        match statement {
            Statement::CreateDatabase(name) => {
                state.databases.insert(name.to_lowercase());
            }
            Statement::UseDatabase(name) => {
                let name = name.to_lowercase();
                if !state.databases.contains(&name) {
                    return Err(platform::Error::not_found(name));
                }
                state.current_database = Some(name);
            }
            Statement::DropDatabase(name) => {
                let name = name.to_lowercase();
                state.databases.remove(&name);
                if state.current_database.as_ref() == Some(&name) {
                    state.current_database = None;
                }
            }
            Statement::SetConf { .. } => (),
        }
        Ok(())
    }

    fn database_exists(&self, name: &str) -> platform::Result<bool> {
        self.record("database_exists", Call::DatabaseExists(name.into()), name)?;
        Ok(lock(&self.state).databases.contains(&name.to_lowercase()))
    }
}

impl FunctionCatalog for Recorder {
    fn register(&self, name: &str, function: UserFunction) -> platform::Result<()> {
        self.record("register", Call::Register(name.into()), name)?;
        lock(&self.functions).insert(name.to_owned(), function);
        Ok(())
    }
}

impl ModelStore for Recorder {
    type Model = RecordedModel;

    fn load_model(&self, path: &str) -> platform::Result<RecordedModel> {
        self.record("load_model", Call::LoadModel(path.into()), path)?;
        if self.exists_now(path) {
            Ok(RecordedModel(path.to_owned()))
        } else {
            Err(platform::Error::not_found(path))
        }
    }
}

impl ModelRegistry for Recorder {
    fn delete_registered_model(&self, name: &str) -> platform::Result<()> {
        self.record("delete_registered_model", Call::DeleteModel(name.into()), name)?;
        if lock(&self.state).models.remove(name) {
            Ok(())
        } else {
            Err(platform::Error::not_found(name))
        }
    }
}

impl Tracking for Recorder {
    fn set_experiment(&self, name: &str) -> platform::Result<()> {
        self.record("set_experiment", Call::SetExperiment(name.into()), name)?;
        lock(&self.state).experiment = Some(name.to_owned());
        Ok(())
    }
}

impl Platform for Recorder {
    type Storage = Self;
    type Cluster = Self;
    type Session = Self;
    type Functions = Self;
    type Models = Self;
    type Registry = Self;
    type Tracking = Self;

    fn storage(&self) -> &Self {
        self
    }

    fn cluster(&self) -> &Self {
        self
    }

    fn session(&self) -> &Self {
        self
    }

    fn functions(&self) -> &Self {
        self
    }

    fn models(&self) -> &Self {
        self
    }

    fn registry(&self) -> &Self {
        self
    }

    fn tracking(&self) -> &Self {
        self
    }
}
