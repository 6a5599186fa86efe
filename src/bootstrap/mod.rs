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

//! Provisioning of a user's analytics environment.
//!
//! An [`Environment`] ties an [`Identity`] to a [`Platform`]. It knows
//! the [`Layout`] of the user's resources and provisions them:
//!
//! 1. the scratch directory ([`Environment::ensure_scratch_path`]);
//! 2. the staged GeoIP database ([`Environment::stage_geodata`]);
//! 3. the scratch database ([`Environment::ensure_database`]) and
//!    session options ([`Environment::configure_session`]);
//! 4. the two domain functions
//!    ([`Environment::register_domain_functions`]); and
//! 5. the active experiment ([`Environment::set_experiment`]).
//!
//! [`Environment::bootstrap`] performs all of the above in that order.
//! Loading the DGA model and exposing it as the `ioc_detect` function
//! is a separate step
//! ([`Environment::load_and_register_ioc_detect_model`]), since the
//! model may not have been trained yet. [`Environment::cleanup`] removes
//! what was provisioned.
//!
//! Which failures are fatal is governed by the environment's
//! [`Policies`].

use std::sync::Arc;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::layout::{
    Layout, ARROW_CONF_KEY, DOMAIN_EXTRACT, GEOIP_SOURCE, IOC_DETECT, REGISTERED_DOMAIN_EXTRACT,
};
use crate::namespace::{Identity, Namespace};
use crate::platform::{
    Cluster, FunctionCatalog, Model, ModelStore, Platform, SqlSession, Statement, Storage,
    Tracking,
};
use crate::policy::{Operation, Policies};

mod cleanup;

pub use cleanup::{CleanupReport, CleanupStep, StepOutcome};

/// A model loaded by the [`ModelStore`] of platform `P`.
pub type LoadedModel<P> = <<P as Platform>::Models as ModelStore>::Model;

////////////////////////////////////////////////////////////////////////
// ENVIRONMENT                                                        //
////////////////////////////////////////////////////////////////////////

/// A user's analytics environment on a [`Platform`]. See the
/// [module-level documentation](self).
#[derive(Debug)]
pub struct Environment<P> {
    platform: P,
    identity: Identity,
    layout: Layout,
    policies: Policies,
    extractor: Extractor,
}

/// What [`Environment::stage_geodata`] did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GeodataStaging {
    /// Whether the shared GeoIP database was copied into the scratch
    /// path.
    pub copied: bool,

    /// Whether the staged copy was distributed to the cluster's
    /// workers.
    pub distributed: bool,
}

/// A summary of [`Environment::bootstrap`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bootstrap {
    pub namespace: Namespace,
    pub scratch_path: String,
    pub database: String,
    pub geodata: GeodataStaging,
}

impl<P> Environment<P> {
    /// Creates a new `Environment` for `identity` with the default
    /// [`Policies`] and [`Extractor`]. Nothing is provisioned yet.
    pub fn new(platform: P, identity: Identity) -> Self {
        Self {
            platform,
            layout: Layout::for_identity(&identity),
            identity,
            policies: Policies::default(),
            extractor: Extractor::default(),
        }
    }

    /// Replaces the environment's [`Policies`].
    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Replaces the [`Extractor`] used by the domain functions.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Returns the platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns the user's identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the user's namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.layout.namespace
    }

    /// Returns the layout of the user's resources.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the environment's policies.
    pub fn policies(&self) -> &Policies {
        &self.policies
    }
}

impl<P> Environment<P>
where
    P: Platform,
{
    /// Provisions the environment: everything except the DGA model.
    /// See the [module-level documentation](self) for the order.
    pub fn bootstrap(&self) -> Result<Bootstrap> {
        self.ensure_scratch_path()?;
        let geodata = self.stage_geodata()?;
        self.ensure_database()?;
        info!("Default database: {}", self.layout.database);
        info!("Files are stored in {}", self.layout.scratch_path);
        self.configure_session()?;
        self.register_domain_functions()?;
        self.set_experiment()?;
        Ok(Bootstrap {
            namespace: self.layout.namespace.clone(),
            scratch_path: self.layout.scratch_path.clone(),
            database: self.layout.database.clone(),
            geodata,
        })
    }

    /// Creates the scratch directory if it does not exist.
    pub fn ensure_scratch_path(&self) -> Result<()> {
        let result = self.platform.storage().mkdirs(&self.layout.scratch_path);
        self.policies.absorb(Operation::ScratchPath, result)?;
        Ok(())
    }

    /// Returns whether `path` exists. A failed probe is reported or
    /// treated as absence according to the [`Operation::Probe`] policy.
    pub fn path_exists(&self, path: &str) -> Result<bool> {
        let result = self.platform.storage().exists(path);
        Ok(self.policies.absorb(Operation::Probe, result)?.unwrap_or(false))
    }

    /// Creates the scratch database if it does not exist and makes it
    /// the session's current database.
    pub fn ensure_database(&self) -> Result<()> {
        let name = &self.layout.database;
        for statement in [
            Statement::CreateDatabase(name.clone()),
            Statement::UseDatabase(name.clone()),
        ] {
            let result = self.platform.session().execute(&statement);
            self.policies.absorb(Operation::Database, result)?;
        }
        Ok(())
    }

    /// Enables Arrow-based columnar transfers for the session.
    pub fn configure_session(&self) -> Result<()> {
        let statement = Statement::SetConf {
            key: ARROW_CONF_KEY.to_owned(),
            value: "true".to_owned(),
        };
        let result = self.platform.session().execute(&statement);
        self.policies.absorb(Operation::Database, result)?;
        Ok(())
    }

    /// Stages the shared GeoIP database into the scratch path and
    /// distributes the staged copy to the cluster's workers.
    ///
    /// The copy is made only if the shared database exists and there is
    /// no staged copy yet; an existing staged copy is never
    /// overwritten. Independently, if a staged copy exists afterward, it
    /// is distributed.
    pub fn stage_geodata(&self) -> Result<GeodataStaging> {
        let staged = &self.layout.geoip_staged;
        let mut staging = GeodataStaging::default();

        if self.path_exists(GEOIP_SOURCE)? && !self.path_exists(staged)? {
            info!("Staging the GeoIP database at {}.", staged);
            let result = self.platform.storage().copy(GEOIP_SOURCE, staged);
            staging.copied = self.policies.absorb(Operation::Geodata, result)?.is_some();
        }

        if self.path_exists(staged)? {
            let result = self.platform.cluster().add_file(staged);
            staging.distributed = self.policies.absorb(Operation::Geodata, result)?.is_some();
        } else {
            debug!("No staged GeoIP database to distribute.");
        }

        Ok(staging)
    }

    /// Registers the `registered_domain_extract` and `domain_extract`
    /// query functions.
    pub fn register_domain_functions(&self) -> Result<()> {
        let extractor = self.extractor;
        self.platform
            .functions()
            .register(
                REGISTERED_DOMAIN_EXTRACT,
                Arc::new(move |uri: &str| extractor.registered_domain_extract(uri)),
            )
            .map_err(|e| Error::new(Operation::Functions, e))?;
        self.platform
            .functions()
            .register(
                DOMAIN_EXTRACT,
                Arc::new(move |uri: &str| extractor.domain_extract(uri)),
            )
            .map_err(|e| Error::new(Operation::Functions, e))
    }

    /// Makes the user's experiment the active one.
    pub fn set_experiment(&self) -> Result<()> {
        let result = self.platform.tracking().set_experiment(&self.layout.experiment);
        self.policies.absorb(Operation::Experiment, result)?;
        Ok(())
    }

    /// Loads the DGA model and registers its prediction function as the
    /// `ioc_detect` query function, replacing any earlier registration.
    ///
    /// The model is loaded from `{scratch_path}/new_model/dga_model` if
    /// that exists, and from `{scratch_path}/model` otherwise. A failure
    /// to load is always reported. The loaded model is also returned for
    /// direct use.
    pub fn load_and_register_ioc_detect_model(&self) -> Result<Arc<LoadedModel<P>>> {
        let path = if self.path_exists(&self.layout.model_path)? {
            &self.layout.model_path
        } else {
            &self.layout.legacy_model_path
        };
        info!("Loading model from {}", path);
        let model = self
            .platform
            .models()
            .load_model(path)
            .map_err(|e| Error::new(Operation::ModelLoad, e))?;

        let model = Arc::new(model);
        let predictor = Arc::clone(&model);
        self.platform
            .functions()
            .register(
                IOC_DETECT,
                Arc::new(move |input: &str| predictor.predict(input)),
            )
            .map_err(|e| Error::new(Operation::Functions, e))?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ErrorKind;
    use crate::policy::ErrorPolicy;
    use crate::testing::{Call, Failure, Recorder};

    const STAGED: &str = "dbfs:/tmp/alice/dns_analytics/datasets/GeoLite2_City.mmdb";

    fn environment() -> Environment<Recorder> {
        Environment::new(Recorder::new(), Identity::new("alice@example.com"))
    }

    #[test]
    fn bootstrap_issues_calls_in_order() {
        let env = environment();
        env.platform().touch(GEOIP_SOURCE);
        let summary = env.bootstrap().unwrap();

        assert_eq!(summary.namespace.as_str(), "alice");
        assert_eq!(summary.scratch_path, "/tmp/alice/dns_analytics");
        assert_eq!(summary.database, "alice_dns");
        assert_eq!(
            summary.geodata,
            GeodataStaging {
                copied: true,
                distributed: true,
            },
        );
        assert_eq!(
            env.platform().calls(),
            [
                Call::Mkdirs("/tmp/alice/dns_analytics".into()),
                Call::Exists(GEOIP_SOURCE.into()),
                Call::Exists(STAGED.into()),
                Call::Copy(GEOIP_SOURCE.into(), STAGED.into()),
                Call::Exists(STAGED.into()),
                Call::AddFile(STAGED.into()),
                Call::Execute("create database if not exists alice_dns".into()),
                Call::Execute("use alice_dns".into()),
                Call::Execute("set spark.sql.execution.arrow.pyspark.enabled=true".into()),
                Call::Register("registered_domain_extract".into()),
                Call::Register("domain_extract".into()),
                Call::SetExperiment("/Users/alice@example.com/dns_analytics_experiment".into()),
            ],
        );
    }

    #[test]
    fn registered_functions_extract_domains() {
        let env = environment();
        env.register_domain_functions().unwrap();
        let uri = "http://foo.bar.example.co.uk/x";
        assert_eq!(
            env.platform().invoke("registered_domain_extract", uri).as_deref(),
            Some("example.co.uk"),
        );
        assert_eq!(env.platform().invoke("domain_extract", uri).as_deref(), Some("example"));
        assert_eq!(
            env.platform().invoke("domain_extract", "http://localhost/x").as_deref(),
            Some(" "),
        );
    }

    #[test]
    fn extractor_is_passed_to_functions() {
        let env = environment().with_extractor(Extractor {
            include_private_suffixes: true,
        });
        env.register_domain_functions().unwrap();
        assert_eq!(
            env.platform().invoke("domain_extract", "foo.blogspot.com").as_deref(),
            Some("foo"),
        );
    }

    #[test]
    fn provisioning_twice_is_idempotent() {
        let env = environment();
        env.ensure_scratch_path().unwrap();
        env.ensure_database().unwrap();
        let state = env.platform().state();
        env.ensure_scratch_path().unwrap();
        env.ensure_database().unwrap();
        assert_eq!(env.platform().state(), state);
    }

    #[test]
    fn scratch_path_failure_is_ignored_by_default() {
        let env = environment();
        env.platform().fail("mkdirs", Failure::Denied);
        assert!(env.ensure_scratch_path().is_ok());

        let mut policies = Policies::default();
        policies.set(Operation::ScratchPath, ErrorPolicy::FailFast).unwrap();
        let env = env.with_policies(policies);
        let error = env.ensure_scratch_path().unwrap_err();
        assert_eq!(error.operation(), Operation::ScratchPath);
    }

    #[test]
    fn database_failure_is_reported_by_default() {
        let env = environment();
        env.platform().fail("execute", Failure::Backend);
        let error = env.ensure_database().unwrap_err();
        assert_eq!(error.operation(), Operation::Database);
        assert!(matches!(error.platform_error().kind(), ErrorKind::Backend(_)));
    }

    #[test]
    fn experiment_failure_is_reported_by_default() {
        let env = environment();
        env.platform().fail("set_experiment", Failure::NotFound);
        let error = env.bootstrap().unwrap_err();
        assert_eq!(error.operation(), Operation::Experiment);
        assert_eq!(error.to_string(), "failed to set the experiment");
    }

    #[test]
    fn geodata_is_skipped_without_source() {
        let env = environment();
        assert_eq!(env.stage_geodata().unwrap(), GeodataStaging::default());
        assert!(!env.platform().calls().iter().any(|c| matches!(c, Call::Copy(..))));
    }

    #[test]
    fn geodata_never_overwrites_staged_copy() {
        let env = environment();
        env.platform().touch(GEOIP_SOURCE);
        env.platform().touch(STAGED);
        assert_eq!(
            env.stage_geodata().unwrap(),
            GeodataStaging {
                copied: false,
                distributed: true,
            },
        );
        assert!(!env.platform().calls().iter().any(|c| matches!(c, Call::Copy(..))));
    }

    #[test]
    fn geodata_is_distributed_even_without_source() {
        let env = environment();
        env.platform().touch(STAGED);
        let staging = env.stage_geodata().unwrap();
        assert!(!staging.copied);
        assert!(staging.distributed);
    }

    #[test]
    fn probe_failures_follow_policy() {
        let env = environment();
        env.platform().fail("exists", Failure::Denied);
        assert!(!env.path_exists(GEOIP_SOURCE).unwrap());

        let mut policies = Policies::default();
        policies.set(Operation::Probe, ErrorPolicy::FailFast).unwrap();
        let env = env.with_policies(policies);
        let error = env.path_exists(GEOIP_SOURCE).unwrap_err();
        assert_eq!(error.operation(), Operation::Probe);
        assert!(matches!(
            error.platform_error().kind(),
            ErrorKind::PermissionDenied
        ));
    }

    #[test]
    fn model_prefers_new_path() {
        let env = environment();
        let new_path = "dbfs:/tmp/alice/dns_analytics/new_model/dga_model";
        env.platform().touch(new_path);
        env.platform().touch("dbfs:/tmp/alice/dns_analytics/model");

        let model = env.load_and_register_ioc_detect_model().unwrap();
        assert_eq!(model.predict("x"), format!("{}(x)", new_path));
        assert_eq!(
            env.platform().invoke("ioc_detect", "y"),
            Some(format!("{}(y)", new_path)),
        );
    }

    #[test]
    fn model_falls_back_to_legacy_path() {
        let env = environment();
        let legacy_path = "dbfs:/tmp/alice/dns_analytics/model";
        env.platform().touch(legacy_path);

        let model = env.load_and_register_ioc_detect_model().unwrap();
        assert_eq!(model.predict("x"), format!("{}(x)", legacy_path));
        assert!(env
            .platform()
            .calls()
            .contains(&Call::LoadModel(legacy_path.into())));
    }

    #[test]
    fn missing_model_is_reported_and_not_registered() {
        let env = environment();
        let error = env.load_and_register_ioc_detect_model().unwrap_err();
        assert_eq!(error.operation(), Operation::ModelLoad);
        assert!(error.platform_error().is_not_found());
        assert_eq!(env.platform().invoke("ioc_detect", "x"), None);
    }

    #[test]
    fn model_registration_overwrites() {
        let env = environment();
        env.platform().touch("dbfs:/tmp/alice/dns_analytics/model");
        env.load_and_register_ioc_detect_model().unwrap();
        env.platform().touch("dbfs:/tmp/alice/dns_analytics/new_model/dga_model");
        env.load_and_register_ioc_detect_model().unwrap();
        assert_eq!(
            env.platform().invoke("ioc_detect", "z").as_deref(),
            Some("dbfs:/tmp/alice/dns_analytics/new_model/dga_model(z)"),
        );
    }
}
