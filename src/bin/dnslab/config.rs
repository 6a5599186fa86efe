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

//! Implements the configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use dnslab::platform::local::LocalConfig;
use dnslab::{ErrorPolicy, Extractor, Identity, Operation, Policies};

use crate::args::EnvArgs;

/// The root directory of the local platform when none is configured.
/// Relative to the configuration file's directory, or to the working
/// directory when configured from the command line.
const DEFAULT_ROOT: &str = ".dnslab";

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Everything a command needs to build its
/// [`Environment`](dnslab::Environment).
#[derive(Debug)]
pub struct Settings {
    pub identity: Identity,
    pub local: LocalConfig,
    pub policies: Policies,
    pub extractor: Extractor,
}

/// Loads the settings from the configuration file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let dir = match path.as_ref().parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    let config: Config =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;
    let settings = config.into_settings(dir)?;
    log_config_summary(&settings);
    Ok(settings)
}

/// Loads the settings from the parsed command line arguments given by
/// `args`. Policies and extraction use their defaults.
pub fn load_from_args(args: &EnvArgs) -> Result<Settings> {
    let identity = match args.identity {
        Some(ref identity) => Identity::new(identity.as_str()),
        None => return Err(anyhow!("no identity was given")),
    };
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

    let settings = Settings {
        identity,
        local: LocalConfig::under(root),
        policies: Policies::default(),
        extractor: Extractor::default(),
    };
    log_config_summary(&settings);
    Ok(settings)
}

/// Summarizes the settings in the log, if the debug log level is
/// enabled.
fn log_config_summary(settings: &Settings) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    let mut message = format!(
        "Configuration loaded:\n\
         Identity:  {}\n\
         Namespace: {}\n\
         Storage:   {} (dbfs:), {} (file:)\n\
         Warehouse: {}\n\
         Private suffixes: {}\n\
         Policies:",
        settings.identity,
        settings.identity.namespace(),
        settings.local.dbfs_root.display(),
        settings.local.file_root.display(),
        settings.local.warehouse_root.display(),
        if settings.extractor.include_private_suffixes {
            "included"
        } else {
            "excluded"
        },
    );
    for operation in Operation::ALL {
        write!(
            message,
            "\n  {}: {}",
            operation.name(),
            settings.policies.get(operation),
        )
        .unwrap();
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub identity: String,
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub extract: ExtractSection,
}

impl Config {
    /// Converts the file's contents into [`Settings`], resolving
    /// relative paths against `dir`.
    fn into_settings(self, dir: &Path) -> Result<Settings> {
        Ok(Settings {
            identity: Identity::new(self.identity),
            local: self.local.resolve(dir),
            policies: self.policy.into_policies()?,
            extractor: Extractor {
                include_private_suffixes: self.extract.include_private_suffixes,
            },
        })
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: LOCAL PLATFORM                              //
////////////////////////////////////////////////////////////////////////

/// The directories of the local platform. Each directory defaults to a
/// subdirectory of `root`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalSection {
    pub root: Option<PathBuf>,
    pub dbfs_root: Option<PathBuf>,
    pub file_root: Option<PathBuf>,
    pub warehouse_root: Option<PathBuf>,
    pub worker_root: Option<PathBuf>,
    pub tracking_root: Option<PathBuf>,
    pub registry_root: Option<PathBuf>,
}

impl LocalSection {
    fn resolve(self, dir: &Path) -> LocalConfig {
        let root = self.root.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));
        let mut config = LocalConfig::under(dir.join(root));
        let overrides = [
            (self.dbfs_root, &mut config.dbfs_root),
            (self.file_root, &mut config.file_root),
            (self.warehouse_root, &mut config.warehouse_root),
            (self.worker_root, &mut config.worker_root),
            (self.tracking_root, &mut config.tracking_root),
            (self.registry_root, &mut config.registry_root),
        ];
        for (configured, slot) in overrides {
            if let Some(path) = configured {
                // Absolute paths replace dir entirely.
                *slot = dir.join(path);
            }
        }
        config
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: POLICIES                                    //
////////////////////////////////////////////////////////////////////////

/// Overrides of the default error policies, one key per configurable
/// operation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    pub scratch_path: Option<ConfigErrorPolicy>,
    pub probe: Option<ConfigErrorPolicy>,
    pub database: Option<ConfigErrorPolicy>,
    pub geodata: Option<ConfigErrorPolicy>,
    pub experiment: Option<ConfigErrorPolicy>,
    pub cleanup: Option<ConfigErrorPolicy>,
}

impl PolicySection {
    fn into_policies(self) -> Result<Policies> {
        let mut policies = Policies::default();
        let overrides = [
            (Operation::ScratchPath, self.scratch_path),
            (Operation::Probe, self.probe),
            (Operation::Database, self.database),
            (Operation::Geodata, self.geodata),
            (Operation::Experiment, self.experiment),
            (Operation::Cleanup, self.cleanup),
        ];
        for (operation, policy) in overrides {
            if let Some(policy) = policy {
                policies.set(operation, policy.0)?;
            }
        }
        Ok(policies)
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: EXTRACTION                                  //
////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractSection {
    #[serde(default)]
    pub include_private_suffixes: bool,
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER DNSLAB TYPES FOR SERDE                               //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`dnslab`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`dnslab`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigErrorPolicy, ErrorPolicy, "error policy");
