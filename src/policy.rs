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

//! Per-operation error policies.
//!
//! Some operations are best-effort: a failure is logged and the
//! operation is treated as having done nothing. Others fail fast and
//! report the failure to the caller. Which is which is recorded in a
//! [`Policies`] table rather than at each call site. The defaults
//! ([`Policies::default`]) are:
//!
//! | Operation                     | Default                       |
//! |-------------------------------|-------------------------------|
//! | [`Operation::ScratchPath`]    | [`ErrorPolicy::BestEffort`]   |
//! | [`Operation::Probe`]          | [`ErrorPolicy::BestEffort`]   |
//! | [`Operation::Database`]       | [`ErrorPolicy::FailFast`]     |
//! | [`Operation::Geodata`]        | [`ErrorPolicy::FailFast`]     |
//! | [`Operation::Experiment`]     | [`ErrorPolicy::FailFast`]     |
//! | [`Operation::Cleanup`]        | [`ErrorPolicy::BestEffort`]   |
//! | [`Operation::Functions`]      | always [`ErrorPolicy::FailFast`] |
//! | [`Operation::ModelLoad`]      | always [`ErrorPolicy::FailFast`] |

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::platform;

////////////////////////////////////////////////////////////////////////
// OPERATIONS AND POLICIES                                            //
////////////////////////////////////////////////////////////////////////

/// The categories of operation that an [`ErrorPolicy`] applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Creating the scratch directory.
    ScratchPath,

    /// Probing for the existence of a path. Only failures other than
    /// "not found" are subject to the policy; "not found" is simply a
    /// negative answer.
    Probe,

    /// Creating and selecting the scratch database, and setting session
    /// options.
    Database,

    /// Copying the GeoIP database and distributing it to workers.
    Geodata,

    /// Registering query functions.
    Functions,

    /// Selecting the active experiment.
    Experiment,

    /// Loading the DGA model.
    ModelLoad,

    /// Each step of cleanup.
    Cleanup,
}

impl Operation {
    /// All operations, in the order that their policies are listed.
    pub const ALL: [Operation; 8] = [
        Self::ScratchPath,
        Self::Probe,
        Self::Database,
        Self::Geodata,
        Self::Functions,
        Self::Experiment,
        Self::ModelLoad,
        Self::Cleanup,
    ];

    /// Returns the short name of this operation, as used in
    /// configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::ScratchPath => "scratch_path",
            Self::Probe => "probe",
            Self::Database => "database",
            Self::Geodata => "geodata",
            Self::Functions => "functions",
            Self::Experiment => "experiment",
            Self::ModelLoad => "model_load",
            Self::Cleanup => "cleanup",
        }
    }

    /// Returns whether the policy for this operation may be changed.
    pub fn is_configurable(self) -> bool {
        !matches!(self, Self::Functions | Self::ModelLoad)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::ScratchPath => "create the scratch path",
            Self::Probe => "probe a path",
            Self::Database => "provision the scratch database",
            Self::Geodata => "stage the GeoIP database",
            Self::Functions => "register query functions",
            Self::Experiment => "set the experiment",
            Self::ModelLoad => "load the DGA model",
            Self::Cleanup => "clean up",
        })
    }
}

/// What to do when an operation fails.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorPolicy {
    /// Log the failure and carry on as if the operation did nothing.
    BestEffort,

    /// Report the failure to the caller.
    FailFast,
}

impl FromStr for ErrorPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(Self::BestEffort),
            "fail-fast" => Ok(Self::FailFast),
            _ => Err("expected \"best-effort\" or \"fail-fast\""),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::BestEffort => "best-effort",
            Self::FailFast => "fail-fast",
        })
    }
}

////////////////////////////////////////////////////////////////////////
// POLICY TABLE                                                       //
////////////////////////////////////////////////////////////////////////

/// The [`ErrorPolicy`] for each [`Operation`]. See the
/// [module-level documentation](self) for the defaults.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policies {
    scratch_path: ErrorPolicy,
    probe: ErrorPolicy,
    database: ErrorPolicy,
    geodata: ErrorPolicy,
    experiment: ErrorPolicy,
    cleanup: ErrorPolicy,
}

impl Policies {
    /// Returns the policy for `operation`.
    pub fn get(&self, operation: Operation) -> ErrorPolicy {
        match operation {
            Operation::ScratchPath => self.scratch_path,
            Operation::Probe => self.probe,
            Operation::Database => self.database,
            Operation::Geodata => self.geodata,
            Operation::Experiment => self.experiment,
            Operation::Cleanup => self.cleanup,
            Operation::Functions | Operation::ModelLoad => ErrorPolicy::FailFast,
        }
    }

    /// Sets the policy for `operation`. This fails if the operation is
    /// not [configurable](Operation::is_configurable).
    pub fn set(
        &mut self,
        operation: Operation,
        policy: ErrorPolicy,
    ) -> Result<(), NotConfigurable> {
        let slot = match operation {
            Operation::ScratchPath => &mut self.scratch_path,
            Operation::Probe => &mut self.probe,
            Operation::Database => &mut self.database,
            Operation::Geodata => &mut self.geodata,
            Operation::Experiment => &mut self.experiment,
            Operation::Cleanup => &mut self.cleanup,
            Operation::Functions | Operation::ModelLoad => return Err(NotConfigurable(operation)),
        };
        *slot = policy;
        Ok(())
    }

    /// Applies the policy for `operation` to the outcome of a platform
    /// call. Successful results pass through as `Some`. Failures are
    /// logged and become `None` under [`ErrorPolicy::BestEffort`], and
    /// are returned as errors under [`ErrorPolicy::FailFast`].
    pub(crate) fn absorb<T>(
        &self,
        operation: Operation,
        result: Result<T, platform::Error>,
    ) -> crate::Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.get(operation) {
                ErrorPolicy::BestEffort => {
                    warn!("Failed to {} (ignored): {}", operation, e);
                    Ok(None)
                }
                ErrorPolicy::FailFast => Err(crate::Error::new(operation, e)),
            },
        }
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            scratch_path: ErrorPolicy::BestEffort,
            probe: ErrorPolicy::BestEffort,
            database: ErrorPolicy::FailFast,
            geodata: ErrorPolicy::FailFast,
            experiment: ErrorPolicy::FailFast,
            cleanup: ErrorPolicy::BestEffort,
        }
    }
}

/// The error returned by [`Policies::set`] for operations whose policy
/// is fixed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NotConfigurable(pub Operation);

impl fmt::Display for NotConfigurable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "the policy for \"{}\" cannot be changed", self.0.name())
    }
}

impl std::error::Error for NotConfigurable {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let policies = Policies::default();
        assert_eq!(policies.get(Operation::ScratchPath), ErrorPolicy::BestEffort);
        assert_eq!(policies.get(Operation::Probe), ErrorPolicy::BestEffort);
        assert_eq!(policies.get(Operation::Database), ErrorPolicy::FailFast);
        assert_eq!(policies.get(Operation::Geodata), ErrorPolicy::FailFast);
        assert_eq!(policies.get(Operation::Functions), ErrorPolicy::FailFast);
        assert_eq!(policies.get(Operation::Experiment), ErrorPolicy::FailFast);
        assert_eq!(policies.get(Operation::ModelLoad), ErrorPolicy::FailFast);
        assert_eq!(policies.get(Operation::Cleanup), ErrorPolicy::BestEffort);
    }

    #[test]
    fn set_rejects_fixed_operations() {
        let mut policies = Policies::default();
        assert_eq!(
            policies.set(Operation::ModelLoad, ErrorPolicy::BestEffort),
            Err(NotConfigurable(Operation::ModelLoad)),
        );
        assert_eq!(
            policies.set(Operation::Functions, ErrorPolicy::BestEffort),
            Err(NotConfigurable(Operation::Functions)),
        );
        assert!(policies.set(Operation::Database, ErrorPolicy::BestEffort).is_ok());
        assert_eq!(policies.get(Operation::Database), ErrorPolicy::BestEffort);
    }

    #[test]
    fn configurability_is_consistent_with_set() {
        for operation in Operation::ALL {
            let mut policies = Policies::default();
            assert_eq!(
                policies.set(operation, ErrorPolicy::FailFast).is_ok(),
                operation.is_configurable(),
            );
        }
    }

    #[test]
    fn absorb_follows_policy() {
        let mut policies = Policies::default();
        let swallowed = policies.absorb::<()>(
            Operation::Cleanup,
            Err(platform::Error::backend("x", "boom")),
        );
        assert!(matches!(swallowed, Ok(None)));

        policies.set(Operation::Cleanup, ErrorPolicy::FailFast).unwrap();
        let reported = policies.absorb::<()>(
            Operation::Cleanup,
            Err(platform::Error::backend("x", "boom")),
        );
        assert!(matches!(reported, Err(e) if e.operation() == Operation::Cleanup));

        assert!(matches!(policies.absorb(Operation::Cleanup, Ok(7)), Ok(Some(7))));
    }

    #[test]
    fn error_policy_parses() {
        assert_eq!("best-effort".parse(), Ok(ErrorPolicy::BestEffort));
        assert_eq!("fail-fast".parse(), Ok(ErrorPolicy::FailFast));
        assert!("sometimes".parse::<ErrorPolicy>().is_err());
    }
}
