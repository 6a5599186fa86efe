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

//! The [`MemoryCatalog`] structure.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use log::debug;

use crate::platform::{FunctionCatalog, Result, UserFunction};

/// An in-memory [`FunctionCatalog`].
///
/// Function names are case-insensitive. Registered functions can be
/// called through [`MemoryCatalog::invoke`], which makes this catalog
/// usable as a minimal query surface on its own.
#[derive(Default)]
pub struct MemoryCatalog {
    functions: RwLock<HashMap<String, UserFunction>>,
}

impl MemoryCatalog {
    /// Creates a new, initially empty `MemoryCatalog`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls the function registered as `name` on `input`. Returns
    /// [`None`] if no such function is registered.
    pub fn invoke(&self, name: &str, input: &str) -> Option<String> {
        let function = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_ascii_lowercase())
            .cloned()?;
        Some(function(input))
    }

    /// Returns the names of all registered functions, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl FunctionCatalog for MemoryCatalog {
    fn register(&self, name: &str, function: UserFunction) -> Result<()> {
        debug!("Registering query function {}.", name);
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase(), function);
        Ok(())
    }
}

impl fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn register_and_invoke_work() {
        let catalog = MemoryCatalog::new();
        assert_eq!(catalog.invoke("shout", "hi"), None);

        catalog
            .register("shout", Arc::new(|s: &str| s.to_uppercase()))
            .unwrap();
        assert_eq!(catalog.invoke("shout", "hi").as_deref(), Some("HI"));
        assert_eq!(catalog.invoke("SHOUT", "hi").as_deref(), Some("HI"));
        assert_eq!(catalog.names(), ["shout"]);
    }

    #[test]
    fn registration_overwrites() {
        let catalog = MemoryCatalog::new();
        catalog.register("f", Arc::new(|_: &str| String::from("one"))).unwrap();
        catalog.register("F", Arc::new(|_: &str| String::from("two"))).unwrap();
        assert_eq!(catalog.invoke("f", "").as_deref(), Some("two"));
        assert_eq!(catalog.names().len(), 1);
    }
}
