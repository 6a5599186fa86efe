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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Bootstrap and tear down a per-user DNS analytics environment
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the environment
    Bootstrap {
        #[clap(flatten)]
        env: EnvArgs,

        /// Also load the DGA model and register it as `ioc_detect`
        #[clap(long)]
        with_model: bool,
    },

    /// Remove everything the environment provisioned
    Cleanup(EnvArgs),

    /// Print the names derived for the user
    Names(EnvArgs),

    /// Extract domains from URIs (read from standard input if none are
    /// given)
    Extract {
        #[clap(flatten)]
        env: EnvArgs,

        /// Print registered domains instead of bare domain labels
        #[clap(long)]
        registered: bool,

        #[clap(value_name = "URI")]
        uris: Vec<String>,
    },

    /// Classify domains with the DGA model (read from standard input if
    /// none are given)
    Detect {
        #[clap(flatten)]
        env: EnvArgs,

        #[clap(value_name = "DOMAIN")]
        domains: Vec<String>,
    },
}

/// Selects the environment a command operates on.
#[derive(Debug, Parser)]
#[clap(group(ArgGroup::new("source").required(true).args(["config", "identity"])))]
pub struct EnvArgs {
    /// Set the configuration file to use
    #[clap(long, conflicts_with_all = ["identity", "root"], value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Set the user identity, usually an email address
    #[clap(long, value_name = "ID")]
    pub identity: Option<String>,

    /// Set the root directory of the local platform
    #[clap(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}
