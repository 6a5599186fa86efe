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

//! Teardown of a provisioned environment.

use std::fmt;

use log::{info, warn};

use super::Environment;
use crate::error::{Error, Result};
use crate::layout::SHARED_DATASETS_DIR;
use crate::platform::{self, ModelRegistry, Platform, SqlSession, Statement, Storage};
use crate::policy::{ErrorPolicy, Operation};

/// A step of [`Environment::cleanup`], in the order performed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CleanupStep {
    /// Recursively delete the scratch path.
    ScratchPath,

    /// Drop the scratch database and everything in it.
    Database,

    /// Delete the registered DGA model.
    RegisteredModel,

    /// Recursively delete the shared notebook datasets directory.
    SharedDatasets,
}

impl CleanupStep {
    pub const ALL: [Self; 4] = [
        Self::ScratchPath,
        Self::Database,
        Self::RegisteredModel,
        Self::SharedDatasets,
    ];
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::ScratchPath => "scratch path",
            Self::Database => "database",
            Self::RegisteredModel => "registered model",
            Self::SharedDatasets => "shared datasets",
        })
    }
}

/// The outcome of one [`CleanupStep`].
#[derive(Debug)]
pub enum StepOutcome {
    /// The resource was removed.
    Done,

    /// There was nothing to remove.
    Absent,

    /// Removal failed, and the failure was ignored.
    Failed(platform::Error),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// What [`Environment::cleanup`] did, step by step.
#[derive(Debug, Default)]
pub struct CleanupReport {
    steps: Vec<(CleanupStep, StepOutcome)>,
}

impl CleanupReport {
    /// Returns the outcome of every step that ran, in order.
    pub fn steps(&self) -> &[(CleanupStep, StepOutcome)] {
        &self.steps
    }

    /// Returns the outcome of `step`, if it ran.
    pub fn outcome(&self, step: CleanupStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }

    /// Returns whether every step succeeded or found nothing to remove.
    pub fn is_clean(&self) -> bool {
        !self.steps.iter().any(|(_, outcome)| outcome.is_failed())
    }
}

impl<P> Environment<P>
where
    P: Platform,
{
    /// Removes everything [`Environment::bootstrap`] and model training
    /// may have created: the scratch path, the scratch database, the
    /// registered DGA model, and the shared datasets directory.
    ///
    /// Resources that are already gone are not errors. Other failures
    /// are handled according to the [`Operation::Cleanup`] policy: under
    /// [`ErrorPolicy::BestEffort`] they are logged and the remaining
    /// steps still run, while under [`ErrorPolicy::FailFast`] the first
    /// failure stops the cleanup and is returned.
    pub fn cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        for step in CleanupStep::ALL {
            let outcome = match self.run_cleanup_step(step) {
                Ok(true) => StepOutcome::Done,
                Ok(false) => StepOutcome::Absent,
                Err(e) if e.is_not_found() => StepOutcome::Absent,
                Err(e) => match self.policies.get(Operation::Cleanup) {
                    ErrorPolicy::BestEffort => {
                        warn!("Failed to clean up the {} (ignored): {}", step, e);
                        StepOutcome::Failed(e)
                    }
                    ErrorPolicy::FailFast => return Err(Error::new(Operation::Cleanup, e)),
                },
            };
            if let StepOutcome::Done = outcome {
                info!("Removed the {}.", step);
            }
            report.steps.push((step, outcome));
        }
        Ok(report)
    }

    fn run_cleanup_step(&self, step: CleanupStep) -> platform::Result<bool> {
        let layout = &self.layout;
        match step {
            CleanupStep::ScratchPath => self.platform.storage().remove_all(&layout.scratch_path),
            CleanupStep::Database => {
                let session = self.platform.session();
                let existed = session.database_exists(&layout.database)?;
                session.execute(&Statement::DropDatabase(layout.database.clone()))?;
                Ok(existed)
            }
            CleanupStep::RegisteredModel => self
                .platform
                .registry()
                .delete_registered_model(&layout.registered_model)
                .map(|()| true),
            CleanupStep::SharedDatasets => self.platform.storage().remove_all(SHARED_DATASETS_DIR),
        }
    }
}
