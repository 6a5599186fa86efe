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

//! Bootstrapping and teardown for a per-user DNS analytics workspace.
//!
//! A DNS analytics session needs a handful of resources before any
//! query runs: a scratch directory and a scratch database named after
//! the user, a staged copy of the GeoIP database, two domain-parsing
//! functions and a DGA (domain generation algorithm) classifier exposed
//! as query functions, and an experiment to log runs against. This
//! crate provisions those resources and tears them down again.
//!
//! The services that actually hold the resources (workspace file
//! system, SQL engine, model store and registry, experiment tracking)
//! are not implemented here. They are abstracted by the capability
//! traits of the [`platform`] module and bundled by the
//! [`Platform`](platform::Platform) trait. With the `local` feature,
//! [`platform::local`] provides a file system–backed implementation of
//! all of them.
//!
//! The entry point is [`Environment`], which derives every name from an
//! explicit [`Identity`] and applies an explicit per-operation
//! [`Policies`] table to decide which failures are fatal.

pub mod bootstrap;
#[cfg(feature = "local")]
pub mod dga;
mod error;
pub mod extract;
pub mod layout;
pub mod namespace;
pub mod platform;
pub mod policy;

#[cfg(test)]
mod testing;

pub use bootstrap::{Bootstrap, CleanupReport, Environment, GeodataStaging};
pub use error::{Error, Result};
pub use extract::{domain_extract, registered_domain_extract, Extracted, Extractor};
pub use layout::Layout;
pub use namespace::{Identity, Namespace};
pub use policy::{ErrorPolicy, Operation, Policies};
